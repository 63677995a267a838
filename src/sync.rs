//! Drives pagination per report date and hands each page to the loader.
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::db::RawItemStore;
use crate::fetcher::{is_last_page, PageFetcher};
use crate::loader::Loader;
use crate::model::{ReportFilters, ReportQuery};
use crate::wb::SearchReportApi;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub limit: u32,
    /// Pause after each loaded page that is not the last one.
    pub page_delay: Duration,
    pub stop_on_short_page: bool,
    /// Keep going with later dates after a fatal date error.
    pub continue_on_error: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            page_delay: Duration::from_secs(21),
            stop_on_short_page: true,
            continue_on_error: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSummary {
    pub report_date: NaiveDate,
    pub pages: usize,
    pub upserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dates: Vec<DateSummary>,
    pub failed: Vec<NaiveDate>,
}

impl RunSummary {
    pub fn total_upserted(&self) -> usize {
        self.dates.iter().map(|d| d.upserted).sum()
    }
}

/// Page through one date until an empty (or short) page, loading each page.
#[instrument(skip_all, fields(report_date = %query.report_date))]
pub async fn sync_date<A, S>(
    fetcher: &PageFetcher<A>,
    loader: &Loader<S>,
    query: &ReportQuery,
    opts: &SyncOptions,
) -> Result<DateSummary>
where
    A: SearchReportApi,
    S: RawItemStore,
{
    let limit = opts.limit.max(1);
    let mut offset: u32 = 0;
    let mut pages = 0;
    let mut upserted = 0;

    loop {
        info!(offset, limit, "fetching page");
        let products = fetcher
            .fetch(query, offset, limit)
            .await
            .with_context(|| format!("fetch failed for {} at offset {}", query.report_date, offset))?;
        if products.is_empty() {
            break;
        }

        let n = loader.load(query, &products).await?;
        pages += 1;
        upserted += n;
        info!(offset, received = products.len(), upserted = n, "page loaded");

        if is_last_page(products.len(), limit, opts.stop_on_short_page) {
            break;
        }
        offset = offset
            .checked_add(limit)
            .ok_or_else(|| anyhow!("offset overflow for {}", query.report_date))?;
        tokio::time::sleep(opts.page_delay).await;
    }

    info!(pages, upserted, "report date done");
    Ok(DateSummary {
        report_date: query.report_date,
        pages,
        upserted,
    })
}

/// Sync every date in order. The first failure aborts the run unless
/// `continue_on_error` is set, in which case failures are collected and
/// reported together at the end.
pub async fn run<A, S>(
    fetcher: &PageFetcher<A>,
    loader: &Loader<S>,
    filters: &ReportFilters,
    dates: &[NaiveDate],
    opts: &SyncOptions,
) -> Result<RunSummary>
where
    A: SearchReportApi,
    S: RawItemStore,
{
    let mut summary = RunSummary::default();
    for &report_date in dates {
        let query = ReportQuery::new(report_date, filters.clone());
        match sync_date(fetcher, loader, &query, opts).await {
            Ok(done) => summary.dates.push(done),
            Err(err) if opts.continue_on_error => {
                let reason = format!("{err:#}");
                error!(%report_date, error = %reason, "report date failed; continuing");
                summary.failed.push(report_date);
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        dates = summary.dates.len(),
        total_upserted = summary.total_upserted(),
        "run finished"
    );

    if !summary.failed.is_empty() {
        let failed: Vec<String> = summary.failed.iter().map(|d| d.to_string()).collect();
        return Err(anyhow!("report dates failed: {}", failed.join(", ")));
    }
    Ok(summary)
}
