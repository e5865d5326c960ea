//! SQLite persistence for item status and analysis results

pub mod analysis_results;
pub mod audio_files;
pub mod store;

use echotag_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub use store::{ResultStore, SqliteResultStore, StoreError};

/// Open (creating if needed) the service database and ensure its tables exist
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!(url = %db_url, "Connecting to database");

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the `audio_files` and `analysis_results` tables if missing
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audio_files (
            file_path TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            error TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_results (
            file_path TEXT PRIMARY KEY,
            device_id TEXT NOT NULL,
            date TEXT NOT NULL,
            time_block TEXT NOT NULL,
            mode TEXT NOT NULL,
            events TEXT NOT NULL,
            summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_analysis_results_block
            ON analysis_results (device_id, date, time_block)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (audio_files, analysis_results)");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // One connection: every connection to sqlite::memory: is a separate database
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}
