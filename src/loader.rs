use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::db::model::parse_nm_id;
use crate::db::{RawItemRow, RawItemStore};
use crate::model::ReportQuery;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Turns pages of product JSON into committed upsert batches.
pub struct Loader<S> {
    store: S,
    batch_size: usize,
}

impl<S: RawItemStore> Loader<S> {
    pub fn new(store: S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persist `products` for `query` and return how many rows were attempted.
    ///
    /// Records without a usable `nmId` are skipped and not counted. Every batch
    /// is committed before the next one starts.
    #[instrument(skip_all, fields(report_date = %query.report_date, products = products.len()))]
    pub async fn load(&self, query: &ReportQuery, products: &[Value]) -> Result<usize> {
        let rows = build_rows(query, products);
        for (idx, chunk) in rows.chunks(self.batch_size).enumerate() {
            self.store
                .upsert_raw_items(chunk)
                .await
                .with_context(|| format!("failed to upsert batch {} for {}", idx, query.report_date))?;
        }
        Ok(rows.len())
    }
}

/// Rows for every product carrying an integer `nmId`, payload kept verbatim.
pub fn build_rows(query: &ReportQuery, products: &[Value]) -> Vec<RawItemRow> {
    products
        .iter()
        .filter_map(|product| match product.get("nmId") {
            None | Some(Value::Null) => {
                debug!("skipping product without nmId");
                None
            }
            Some(raw) => match parse_nm_id(raw) {
                Some(nm_id) => Some(RawItemRow::new(query, nm_id, product.clone())),
                None => {
                    warn!(nm_id = %raw, "skipping product with non-integer nmId");
                    None
                }
            },
        })
        .collect()
}
