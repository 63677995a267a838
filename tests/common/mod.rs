#![allow(dead_code)]

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use wb_search_sync::db::{RawItemRow, RawItemStore};
use wb_search_sync::error::FetchError;
use wb_search_sync::model::ReportQuery;
use wb_search_sync::wb::SearchReportApi;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn product(nm_id: i64) -> Value {
    json!({ "nmId": nm_id, "name": format!("item-{nm_id}"), "orders": { "current": nm_id % 7 } })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub report_date: NaiveDate,
    pub offset: u32,
    pub limit: u32,
}

/// Upstream stand-in: serves scripted responses first, then pages out of a
/// fixed catalog per date (empty when no catalog is set).
#[derive(Clone, Default)]
pub struct ScriptedApi {
    script: Arc<Mutex<VecDeque<Result<Vec<Value>, FetchError>>>>,
    catalog: Arc<HashMap<NaiveDate, usize>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedApi {
    pub fn with_script(responses: Vec<Result<Vec<Value>, FetchError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    pub fn with_catalog(sizes: &[(NaiveDate, usize)]) -> Self {
        Self {
            catalog: Arc::new(sizes.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn then_catalog(mut self, sizes: &[(NaiveDate, usize)]) -> Self {
        self.catalog = Arc::new(sizes.iter().copied().collect());
        self
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    fn page_from_catalog(&self, date: NaiveDate, offset: u32, limit: u32) -> Vec<Value> {
        let total = self.catalog.get(&date).copied().unwrap_or(0);
        let start = (offset as usize).min(total);
        let end = (start + limit as usize).min(total);
        (start..end).map(|i| product(i as i64 + 1)).collect()
    }
}

#[async_trait::async_trait]
impl SearchReportApi for ScriptedApi {
    async fn fetch_page(
        &self,
        query: &ReportQuery,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Value>, FetchError> {
        self.calls.lock().await.push(Call {
            report_date: query.report_date,
            offset,
            limit,
        });
        if let Some(next) = self.script.lock().await.pop_front() {
            return next;
        }
        Ok(self.page_from_catalog(query.report_date, offset, limit))
    }
}

type Key = (NaiveDate, String, bool, bool, String, String, i64);

/// In-memory upsert target keyed exactly like the real table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<Key, Value>>>,
    batches: Arc<Mutex<usize>>,
    fail_on_batch: Option<usize>,
}

impl MemoryStore {
    /// Reject the `n`th batch (1-based) as a failed commit, writing nothing.
    pub fn failing_on_batch(n: usize) -> Self {
        Self {
            fail_on_batch: Some(n),
            ..Default::default()
        }
    }

    pub async fn snapshot(&self) -> HashMap<Key, Value> {
        self.rows.lock().await.clone()
    }

    pub async fn batches(&self) -> usize {
        *self.batches.lock().await
    }
}

#[async_trait::async_trait]
impl RawItemStore for MemoryStore {
    async fn upsert_raw_items(&self, rows: &[RawItemRow]) -> Result<()> {
        let mut batches = self.batches.lock().await;
        if self.fail_on_batch == Some(*batches + 1) {
            bail!("commit of upsert batch failed: connection closed");
        }
        let mut guard = self.rows.lock().await;
        for row in rows {
            guard.insert(
                (
                    row.report_date,
                    row.position_cluster.clone(),
                    row.include_substituted_skus,
                    row.include_search_texts,
                    row.order_field.clone(),
                    row.order_mode.clone(),
                    row.nm_id,
                ),
                row.raw_item.clone(),
            );
        }
        *batches += 1;
        Ok(())
    }
}
