//! echotag-ed library interface
//!
//! Exposes the analysis core, the batch pipeline and the HTTP router for the
//! `echotag-ed` binary and for integration tests.

pub mod api;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use echotag_common::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::classifier::Classifier;
use crate::db::{ResultStore, SqliteResultStore};
use crate::services::{BatchOrchestrator, StageTimeouts};
use crate::storage::AudioSource;

/// Default upload limit when none is configured
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Default bound on "database is locked" retries
const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Loaded classifier; `None` means "model not loaded"
    pub classifier: Option<Arc<dyn Classifier>>,
    /// Where batch paths are fetched from
    pub source: Arc<dyn AudioSource>,
    /// Where batch status and results are written
    pub store: Arc<dyn ResultStore>,
    pub timeouts: StageTimeouts,
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with no classifier, default timeouts and a SQLite result store on `db`
    pub fn new(db: SqlitePool, event_bus: EventBus, source: Arc<dyn AudioSource>) -> Self {
        let store = Arc::new(SqliteResultStore::new(db.clone(), DEFAULT_MAX_LOCK_WAIT_MS));
        Self {
            db,
            event_bus,
            classifier: None,
            source,
            store,
            timeouts: StageTimeouts::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            startup_time: Utc::now(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// The loaded classifier, or 503 "Model not loaded"
    pub fn require_classifier(&self) -> ApiResult<Arc<dyn Classifier>> {
        self.classifier.clone().ok_or(ApiError::ModelNotLoaded)
    }

    pub fn model_name(&self) -> &str {
        self.classifier
            .as_deref()
            .map(|c| c.model_name())
            .unwrap_or(classifier::DEFAULT_MODEL_NAME)
    }

    /// Orchestrator over this state's collaborators
    pub fn orchestrator(&self) -> ApiResult<BatchOrchestrator> {
        Ok(BatchOrchestrator::new(
            self.source.clone(),
            self.require_classifier()?,
            self.store.clone(),
            self.event_bus.clone(),
            self.timeouts,
        ))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::analyze_routes())
        .merge(api::batch_routes())
        .merge(api::status_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
