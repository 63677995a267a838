//! Storage for raw search-report rows.
//!
//! - `model`: the persisted row and key helpers.
//! - `repo`: SQL for the Postgres and SQLite backends.
//!
//! `Storage` is the handle the loader writes through. It is opened once per
//! run and must be closed with [`Storage::close`] on every exit path.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{PgPool, SqlitePool};
use tracing::info;

pub mod model;
pub mod repo;

pub use model::RawItemRow;

/// Sink for upsert batches. Each call is one committed transaction.
#[async_trait]
pub trait RawItemStore: Send + Sync {
    async fn upsert_raw_items(&self, rows: &[RawItemRow]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum Storage {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Storage {
    /// Open storage for `dsn`; the scheme picks the backend.
    ///
    /// SQLite databases get their schema on open. The Postgres table is owned
    /// externally, so its migrations only run through [`Storage::run_migrations`].
    pub async fn connect(dsn: &str) -> Result<Self> {
        if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
            let pool = repo::init_pg_pool(dsn).await?;
            info!(backend = "postgres", "storage connected");
            Ok(Storage::Postgres(pool))
        } else if dsn.starts_with("sqlite:") {
            let pool = repo::init_sqlite_pool(dsn).await?;
            repo::run_sqlite_migrations(&pool).await?;
            info!(backend = "sqlite", "storage connected");
            Ok(Storage::Sqlite(pool))
        } else {
            Err(anyhow!(
                "unsupported storage DSN scheme; expected postgres://, postgresql:// or sqlite:"
            ))
        }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        match self {
            Storage::Postgres(pool) => repo::run_pg_migrations(pool).await,
            Storage::Sqlite(pool) => repo::run_sqlite_migrations(pool).await,
        }
    }

    /// Waits for in-flight statements and closes the connection.
    pub async fn close(self) {
        match self {
            Storage::Postgres(pool) => pool.close().await,
            Storage::Sqlite(pool) => pool.close().await,
        }
    }
}

#[async_trait]
impl RawItemStore for Storage {
    async fn upsert_raw_items(&self, rows: &[RawItemRow]) -> Result<()> {
        match self {
            Storage::Postgres(pool) => repo::upsert_raw_items_pg(pool, rows).await,
            Storage::Sqlite(pool) => repo::upsert_raw_items_sqlite(pool, rows).await,
        }
    }
}
