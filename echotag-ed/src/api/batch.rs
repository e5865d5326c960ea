//! POST /fetch-and-process-paths
//!
//! Runs a batch over stored audio files. The batch runs in its own task so
//! that a client disconnect only cancels the remaining items: the request
//! future holds a drop guard on the batch's cancellation token, and the
//! in-flight item finishes in the detached task.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::analysis::round_to;
use crate::models::{BatchOptions, BatchReport, FailedItem};
use crate::AppState;

/// Batch request body
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub file_paths: Vec<String>,
    #[serde(flatten)]
    pub options: BatchOptions,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Batch response body
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub batch_id: Uuid,
    /// "success" when no item failed, otherwise "partial"
    pub status: &'static str,
    pub summary: BatchSummary,
    pub processed_files: Vec<String>,
    pub processed_time_blocks: Vec<String>,
    /// `null` when every item succeeded
    pub error_files: Option<Vec<FailedItem>>,
    pub execution_time_seconds: f64,
    pub message: String,
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        let status = if report.is_success() { "success" } else { "partial" };
        let summary = BatchSummary {
            total_files: report.total_files,
            processed: report.processed(),
            errors: report.errors(),
        };
        let message = report.message();
        let execution_time_seconds = round_to(report.execution_time_seconds, 1);

        Self {
            batch_id: report.batch_id,
            status,
            summary,
            processed_files: report.processed_files,
            processed_time_blocks: report.processed_time_blocks,
            error_files: if report.failed.is_empty() {
                None
            } else {
                Some(report.failed)
            },
            execution_time_seconds,
            message,
        }
    }
}

/// POST /fetch-and-process-paths
pub async fn fetch_and_process_paths(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    let orchestrator = state.orchestrator()?;
    request.options.validate()?;

    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    tracing::info!(
        total_files = request.file_paths.len(),
        "Batch request received"
    );

    let task = tokio::spawn(async move {
        orchestrator
            .process_batch(&request.file_paths, &request.options, &cancel)
            .await
    });

    let report = task
        .await
        .map_err(|e| ApiError::Internal(format!("Batch task failed: {}", e)))??;

    Ok(Json(BatchResponse::from(report)))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new().route("/fetch-and-process-paths", post(fetch_and_process_paths))
}
