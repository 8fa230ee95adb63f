//! Relational store access
//!
//! The pool is opened once by the binary; every other function takes a
//! `&mut SqliteConnection` so it can run inside the scheduler's transaction.

pub mod scan;
pub mod schema;

use crate::error::SyncResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the store at `db_path` and ensure its schema
pub async fn open_pool(db_path: &Path) -> SyncResult<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(spydify_common::Error::from)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    let mut conn = pool.acquire().await?;
    schema::ensure_schema(&mut conn).await?;

    Ok(pool)
}
