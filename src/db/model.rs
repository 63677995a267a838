//! Persisted row shape for `wb_search_products_daily_raw`.
//!
//! A row is identified by the 7-column natural key; `raw_item` is the product
//! JSON exactly as returned upstream.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

use crate::model::ReportQuery;

#[derive(Debug, Clone, PartialEq)]
pub struct RawItemRow {
    pub report_date: NaiveDate,
    pub position_cluster: String,
    pub include_substituted_skus: bool,
    pub include_search_texts: bool,
    pub order_field: String,
    pub order_mode: String,
    pub nm_id: i64,
    pub raw_item: Value,
}

pub type RawItemKey<'a> = (NaiveDate, &'a str, bool, bool, &'a str, &'a str, i64);

impl RawItemRow {
    pub fn new(query: &ReportQuery, nm_id: i64, raw_item: Value) -> Self {
        let f = &query.filters;
        Self {
            report_date: query.report_date,
            position_cluster: f.position_cluster.clone(),
            include_substituted_skus: f.include_substituted_skus,
            include_search_texts: f.include_search_texts,
            order_field: f.order_field.clone(),
            order_mode: f.order_mode.as_str().to_string(),
            nm_id,
            raw_item,
        }
    }

    pub fn key(&self) -> RawItemKey<'_> {
        (
            self.report_date,
            self.position_cluster.as_str(),
            self.include_substituted_skus,
            self.include_search_texts,
            self.order_field.as_str(),
            self.order_mode.as_str(),
            self.nm_id,
        )
    }
}

/// Interpret an `nmId` value: JSON integers, or strings holding an integer.
pub fn parse_nm_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Collapse rows sharing a key, keeping the last occurrence of each.
///
/// A single upsert statement must not touch the same row twice.
pub fn dedupe_last_wins(rows: &[RawItemRow]) -> Vec<&RawItemRow> {
    let mut last: HashMap<RawItemKey<'_>, usize> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        last.insert(row.key(), idx);
    }
    rows.iter()
        .enumerate()
        .filter(|(idx, row)| last.get(&row.key()) == Some(idx))
        .map(|(_, row)| row)
        .collect()
}
