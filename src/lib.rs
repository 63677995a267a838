//! Daily sync of Wildberries seller-analytics search-report products into a
//! raw JSON table, keyed by report date, filters and product id.

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod model;
pub mod sync;
pub mod wb;
