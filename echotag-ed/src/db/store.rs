//! Result store seam used by the batch orchestrator

use async_trait::async_trait;
use echotag_common::ItemStatus;
use sqlx::SqlitePool;
use thiserror::Error;

use super::analysis_results::{self, AnalysisRecord};
use super::audio_files::{self, FileStatusRecord};
use crate::models::{FilePathInfo, ItemResult};
use crate::utils::retry_on_lock;

/// Result store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database or serialization failure
    #[error("Result store error: {0}")]
    Backend(#[from] echotag_common::Error),

    /// Store cannot be reached at all
    #[error("Result store unavailable: {0}")]
    Unavailable(String),
}

/// External state the orchestrator writes to
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Record an item status transition
    async fn update_status(
        &self,
        file_path: &str,
        status: ItemStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Durably record an item's result, replacing any previous one
    async fn persist(&self, file_path: &str, result: &ItemResult) -> Result<(), StoreError>;

    /// Cheap liveness probe for health output
    async fn ping(&self) -> bool;
}

/// [`ResultStore`] over the service SQLite database
#[derive(Clone)]
pub struct SqliteResultStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteResultStore {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn load_status(&self, file_path: &str) -> Result<Option<FileStatusRecord>, StoreError> {
        Ok(audio_files::load_status(&self.pool, file_path).await?)
    }

    pub async fn load_result(&self, file_path: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(analysis_results::load_result(&self.pool, file_path).await?)
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn update_status(
        &self,
        file_path: &str,
        status: ItemStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        retry_on_lock("update item status", self.max_lock_wait_ms, || {
            audio_files::upsert_status(&self.pool, file_path, status, error)
        })
        .await?;
        Ok(())
    }

    async fn persist(&self, file_path: &str, result: &ItemResult) -> Result<(), StoreError> {
        let info = FilePathInfo::parse(file_path);
        retry_on_lock("persist analysis result", self.max_lock_wait_ms, || {
            analysis_results::upsert_result(&self.pool, file_path, &info, result)
        })
        .await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::Prediction;

    #[tokio::test]
    async fn test_status_and_result_written() {
        let store = SqliteResultStore::new(memory_pool().await, 1000);
        let path = "files/dev/2025-01-01/09-00/audio.wav";

        store
            .update_status(path, ItemStatus::Processing, None)
            .await
            .unwrap();
        store
            .persist(path, &ItemResult::Predictions(vec![Prediction::new("Speech", 0.9)]))
            .await
            .unwrap();
        store
            .update_status(path, ItemStatus::Completed, None)
            .await
            .unwrap();

        let status = store.load_status(path).await.unwrap().unwrap();
        assert_eq!(status.status, ItemStatus::Completed);

        let result = store.load_result(path).await.unwrap().unwrap();
        assert_eq!(result.date, "2025-01-01");
        assert!(store.ping().await);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_errors() {
        let pool = memory_pool().await;
        let store = SqliteResultStore::new(pool.clone(), 10);
        pool.close().await;

        assert!(!store.ping().await);
        assert!(store
            .update_status("x", ItemStatus::Processing, None)
            .await
            .is_err());
    }
}
