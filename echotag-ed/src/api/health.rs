//! Service banner and health check

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::AppState;

/// GET / response
#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: String,
    pub model: String,
    pub version: String,
    /// "ready" or "not ready"
    pub status: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" when a model is loaded, otherwise "unhealthy"
    pub status: String,
    pub model_loaded: bool,
    pub database_connected: bool,
    pub storage_connected: bool,
    /// Module name ("echotag-ed")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
}

/// GET /
pub async fn banner(State(state): State<AppState>) -> Json<BannerResponse> {
    let endpoints = BTreeMap::from([
        ("/analyze_sound", "Whole-file audio event detection"),
        ("/analyze_timeline", "Time-series audio event detection"),
        ("/fetch-and-process-paths", "Analyze stored audio files by path"),
        ("/files/status", "Last recorded status of one file"),
        ("/files/result", "Last persisted result of one file"),
        ("/events", "Batch progress (SSE)"),
        ("/health", "Health check"),
    ]);

    let status = if state.classifier.is_some() {
        "ready"
    } else {
        "not ready"
    };

    Json(BannerResponse {
        message: "Audio Event Detection API".to_string(),
        model: state.model_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: status.to_string(),
        endpoints,
    })
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;
    let model_loaded = state.classifier.is_some();

    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" }.to_string(),
        model_loaded,
        database_connected: state.store.ping().await,
        storage_connected: state.source.is_available(),
        module: "echotag-ed".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
    })
}

/// Build banner and health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
}
