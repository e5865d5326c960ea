//! Persisted analysis results
//!
//! One row per file path; a re-run overwrites the previous row (last write
//! wins) while keeping its `created_at`.

use chrono::{DateTime, Utc};
use echotag_common::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::models::{FilePathInfo, ItemResult};

/// Stored result row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub file_path: String,
    pub device_id: String,
    pub date: String,
    pub time_block: String,
    /// `timeline` or `whole_file`
    pub mode: String,
    /// Timeline entries or ranked predictions
    pub events: Value,
    /// Timeline summary; absent for whole-file results
    pub summary: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert or overwrite the result for `file_path`
pub async fn upsert_result(
    pool: &SqlitePool,
    file_path: &str,
    info: &FilePathInfo,
    result: &ItemResult,
) -> Result<()> {
    let (events, summary) = match result {
        ItemResult::Timeline(analysis) => (
            serde_json::to_string(&analysis.timeline)?,
            Some(serde_json::to_string(&analysis.summary)?),
        ),
        ItemResult::Predictions(predictions) => (serde_json::to_string(predictions)?, None),
    };
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO analysis_results
            (file_path, device_id, date, time_block, mode, events, summary, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(file_path) DO UPDATE SET
            device_id = excluded.device_id,
            date = excluded.date,
            time_block = excluded.time_block,
            mode = excluded.mode,
            events = excluded.events,
            summary = excluded.summary,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(file_path)
    .bind(&info.device_id)
    .bind(&info.date)
    .bind(&info.time_block)
    .bind(result.mode())
    .bind(events)
    .bind(summary)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Bad timestamp {:?}: {}", value, e)))
}

/// Load the stored result for `file_path`
pub async fn load_result(pool: &SqlitePool, file_path: &str) -> Result<Option<AnalysisRecord>> {
    let row = sqlx::query(
        r#"
        SELECT file_path, device_id, date, time_block, mode, events, summary, created_at, updated_at
        FROM analysis_results
        WHERE file_path = ?
        "#,
    )
    .bind(file_path)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let events: String = row.get("events");
    let summary: Option<String> = row.get("summary");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Some(AnalysisRecord {
        file_path: row.get("file_path"),
        device_id: row.get("device_id"),
        date: row.get("date"),
        time_block: row.get("time_block"),
        mode: row.get("mode"),
        events: serde_json::from_str(&events)?,
        summary: summary
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    }))
}
