//! Read-back of recorded item status and persisted results

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::analysis_results::{self, AnalysisRecord};
use crate::db::audio_files::{self, FileStatusRecord};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub file_path: String,
}

/// GET /files/status?file_path=
pub async fn file_status(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<FileStatusRecord>> {
    audio_files::load_status(&state.db, &query.file_path)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No status recorded for {}", query.file_path)))
}

/// GET /files/result?file_path=
pub async fn file_result(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<AnalysisRecord>> {
    analysis_results::load_result(&state.db, &query.file_path)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No result stored for {}", query.file_path)))
}

/// Build status read-back routes
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/files/status", get(file_status))
        .route("/files/result", get(file_result))
}
