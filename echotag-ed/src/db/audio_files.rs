//! Per-file processing status

use chrono::{DateTime, Utc};
use echotag_common::{Error, ItemStatus, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Last recorded status of one path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStatusRecord {
    pub file_path: String,
    pub status: ItemStatus,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Insert or overwrite the status row for `file_path`
pub async fn upsert_status(
    pool: &SqlitePool,
    file_path: &str,
    status: ItemStatus,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audio_files (file_path, status, error, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(file_path) DO UPDATE SET
            status = excluded.status,
            error = excluded.error,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(file_path)
    .bind(status.as_str())
    .bind(error)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the status row for `file_path`
pub async fn load_status(pool: &SqlitePool, file_path: &str) -> Result<Option<FileStatusRecord>> {
    let row = sqlx::query(
        r#"
        SELECT file_path, status, error, updated_at
        FROM audio_files
        WHERE file_path = ?
        "#,
    )
    .bind(file_path)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let status_str: String = row.get("status");
    let status = ItemStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Unknown status in database: {}", status_str)))?;

    let updated_at_str: String = row.get("updated_at");
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map_err(|e| Error::Internal(format!("Bad updated_at timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Some(FileStatusRecord {
        file_path: row.get("file_path"),
        status,
        error: row.get("error"),
        updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_status_upsert_overwrites() {
        let pool = memory_pool().await;
        let path = "files/dev/2025-01-01/10-00/audio.wav";

        upsert_status(&pool, path, ItemStatus::Processing, None).await.unwrap();
        upsert_status(&pool, path, ItemStatus::Failed, Some("decode failed"))
            .await
            .unwrap();

        let record = load_status(&pool, path).await.unwrap().unwrap();
        assert_eq!(record.status, ItemStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("decode failed"));

        upsert_status(&pool, path, ItemStatus::Completed, None).await.unwrap();
        let record = load_status(&pool, path).await.unwrap().unwrap();
        assert_eq!(record.status, ItemStatus::Completed);
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let pool = memory_pool().await;
        assert!(load_status(&pool, "missing").await.unwrap().is_none());
    }
}
