use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::model::ReportQuery;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct OrderBy<'a> {
    pub field: &'a str,
    pub mode: &'a str,
}

/// Body of `POST /api/v2/search-report/table/details`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchReportRequest<'a> {
    pub current_period: Period,
    pub past_period: Period,
    pub order_by: OrderBy<'a>,
    pub position_cluster: &'a str,
    #[serde(rename = "includeSubstitutedSKUs")]
    pub include_substituted_skus: bool,
    pub include_search_texts: bool,
    pub limit: u32,
    pub offset: u32,
}

impl<'a> SearchReportRequest<'a> {
    pub fn new(query: &'a ReportQuery, offset: u32, limit: u32) -> Self {
        let f = &query.filters;
        Self {
            current_period: Period::single_day(query.report_date),
            past_period: Period::single_day(query.past_date()),
            order_by: OrderBy {
                field: &f.order_field,
                mode: f.order_mode.as_str(),
            },
            position_cluster: &f.position_cluster,
            include_substituted_skus: f.include_substituted_skus,
            include_search_texts: f.include_search_texts,
            limit,
            offset,
        }
    }
}

/// Walk `path` through nested objects. Any missing key or non-object hop yields `None`.
pub fn lookup<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter()
        .try_fold(value, |cur, key| cur.as_object()?.get(*key))
}

/// Product list at `data.products`, or empty when absent or not an array.
pub fn products_from_response(body: &Value) -> Vec<Value> {
    lookup(body, &["data", "products"])
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
