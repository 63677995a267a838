use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    Asc,
    #[default]
    Desc,
}

impl OrderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMode::Asc => "asc",
            OrderMode::Desc => "desc",
        }
    }

    pub fn parse_mode(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(OrderMode::Asc),
            "desc" => Some(OrderMode::Desc),
            _ => None,
        }
    }
}

/// Filter and sort parameters shared by every date of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportFilters {
    pub position_cluster: String,
    pub include_substituted_skus: bool,
    pub include_search_texts: bool,
    pub order_field: String,
    pub order_mode: OrderMode,
}

impl Default for ReportFilters {
    fn default() -> Self {
        Self {
            position_cluster: "all".into(),
            include_substituted_skus: true,
            include_search_texts: true,
            order_field: "orders".into(),
            order_mode: OrderMode::Desc,
        }
    }
}

/// One logical report request: a target date plus the run's filters.
///
/// Queries that differ only in `report_date` are independent fetch sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub report_date: NaiveDate,
    pub filters: ReportFilters,
}

impl ReportQuery {
    pub fn new(report_date: NaiveDate, filters: ReportFilters) -> Self {
        Self {
            report_date,
            filters,
        }
    }

    /// Comparison day sent as the past period: one day before `report_date`.
    pub fn past_date(&self) -> NaiveDate {
        self.report_date
            .checked_sub_days(Days::new(1))
            .unwrap_or(self.report_date)
    }
}
