use super::model::{dedupe_last_wins, RawItemRow};
use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Sqlite};
use std::str::FromStr;
use tracing::instrument;

const INSERT_COLUMNS: &str = "(report_date, position_cluster, include_substituted_skus, include_search_texts, order_field, order_mode, nm_id, raw_item) ";
const CONFLICT_KEY: &str = "(report_date, position_cluster, include_substituted_skus, include_search_texts, order_field, order_mode, nm_id)";

pub const PG_TABLE: &str = "public.wb_search_products_daily_raw";
pub const SQLITE_TABLE: &str = "wb_search_products_daily_raw";

/// Open a single long-lived Postgres connection.
pub async fn init_pg_pool(dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(dsn)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

pub async fn init_sqlite_pool(database_url: &str) -> Result<SqlitePool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid SQLite URL {normalized}"))?
        .create_if_missing(true);
    // One connection: in-memory databases are per connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to open SQLite database")?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed SQLite URL and ensure the parent
/// directory exists. In-memory URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_pg_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations/postgres").run(pool).await?;
    Ok(())
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    Ok(())
}

/// Bound parameters per row in the upsert statement.
const BINDS_PER_ROW: usize = 8;
/// Postgres caps a statement at 65535 bind parameters.
pub const PG_MAX_BINDS: usize = 65_535;
/// SQLite's `SQLITE_MAX_VARIABLE_NUMBER` default since 3.32.
pub const SQLITE_MAX_BINDS: usize = 32_766;

/// Rows that fit in one statement without exceeding `max_binds`.
pub fn rows_per_statement(max_binds: usize) -> usize {
    (max_binds / BINDS_PER_ROW).max(1)
}

/// Upsert one batch inside its own transaction and commit it.
///
/// Batches larger than the bind limit are split into several statements
/// within the same transaction.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn upsert_raw_items_pg(pool: &PgPool, rows: &[RawItemRow]) -> Result<()> {
    let rows = dedupe_last_wins(rows);
    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for chunk in rows.chunks(rows_per_statement(PG_MAX_BINDS)) {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {PG_TABLE} {INSERT_COLUMNS}"));
        qb.push_values(chunk.iter(), |mut b, row| {
            b.push_bind(row.report_date)
                .push_bind(row.position_cluster.as_str())
                .push_bind(row.include_substituted_skus)
                .push_bind(row.include_search_texts)
                .push_bind(row.order_field.as_str())
                .push_bind(row.order_mode.as_str())
                .push_bind(row.nm_id)
                .push_bind(Json(&row.raw_item));
        });
        qb.push(format!(
            " ON CONFLICT {CONFLICT_KEY} DO UPDATE SET load_dttm = now(), raw_item = excluded.raw_item"
        ));
        qb.build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("upsert into wb_search_products_daily_raw failed")?;
    }
    tx.commit().await.context("commit of upsert batch failed")?;
    Ok(())
}

#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn upsert_raw_items_sqlite(pool: &SqlitePool, rows: &[RawItemRow]) -> Result<()> {
    let rows = dedupe_last_wins(rows);
    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for chunk in rows.chunks(rows_per_statement(SQLITE_MAX_BINDS)) {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {SQLITE_TABLE} {INSERT_COLUMNS}"));
        qb.push_values(chunk.iter(), |mut b, row| {
            b.push_bind(row.report_date)
                .push_bind(row.position_cluster.as_str())
                .push_bind(row.include_substituted_skus)
                .push_bind(row.include_search_texts)
                .push_bind(row.order_field.as_str())
                .push_bind(row.order_mode.as_str())
                .push_bind(row.nm_id)
                .push_bind(Json(&row.raw_item));
        });
        qb.push(format!(
            " ON CONFLICT {CONFLICT_KEY} DO UPDATE SET load_dttm = strftime('%Y-%m-%d %H:%M:%f', 'now'), raw_item = excluded.raw_item"
        ));
        qb.build()
            .execute(&mut *tx)
            .await
            .context("upsert into wb_search_products_daily_raw failed")?;
    }
    tx.commit().await.context("commit of upsert batch failed")?;
    Ok(())
}
