use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wb_search_sync::config;
use wb_search_sync::dates;
use wb_search_sync::db::Storage;
use wb_search_sync::fetcher::PageFetcher;
use wb_search_sync::loader::Loader;
use wb_search_sync::sync;
use wb_search_sync::wb::WbClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reload recent Wildberries search-report products into the raw table and exit"
)]
struct Args {
    /// Optional YAML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reload this many days back from yesterday (overrides DAYS_BACK)
    #[arg(long)]
    days_back: Option<u32>,

    /// Reload exactly these dates (YYYY-MM-DD) instead of the lookback window
    #[arg(long = "date", value_name = "YYYY-MM-DD")]
    dates: Vec<NaiveDate>,

    /// Process remaining dates after a date fails; still exits non-zero
    #[arg(long)]
    continue_on_error: bool,

    /// Create the target table if it does not exist
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(days_back) = args.days_back {
        cfg.report.days_back = days_back;
        config::validate(&cfg)?;
    }

    let zone = cfg.timezone()?;
    let today = dates::today_in(Utc::now(), zone);
    let report_dates = if args.dates.is_empty() {
        dates::lookback_dates(today, cfg.report.days_back)
    } else {
        args.dates.clone()
    };
    info!(%today, zone = zone.name(), dates = ?report_dates, "reload window");

    let endpoint = Url::parse(&cfg.api.url).context("invalid WB_API_URL")?;
    let api = WbClient::with_endpoint(
        cfg.api.token.expose().to_string(),
        endpoint,
        cfg.request_timeout(),
    )?;
    let fetcher = PageFetcher::new(api, cfg.retry_policy());

    let storage = Storage::connect(cfg.database.dsn.expose()).await?;
    let loader = Loader::new(storage, cfg.database.batch_size);
    let filters = cfg.filters();
    let opts = cfg.sync_options(args.continue_on_error);

    let result = async {
        if args.migrate {
            loader.store().run_migrations().await?;
        }
        sync::run(&fetcher, &loader, &filters, &report_dates, &opts).await
    }
    .await;
    loader.into_store().close().await;

    let summary = result?;
    for date in &summary.dates {
        info!(
            report_date = %date.report_date,
            pages = date.pages,
            upserted = date.upserted,
            "done"
        );
    }
    info!(total_upserted = summary.total_upserted(), "sync complete");
    Ok(())
}
