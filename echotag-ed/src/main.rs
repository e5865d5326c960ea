//! Event Detection (echotag-ed) - Main entry point
//!
//! HTTP service that tags audio with AudioSet events, either for an uploaded
//! file or for batches of stored files whose results are persisted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use echotag_common::config::prepare_root_folder;
use echotag_common::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use echotag_ed::classifier::labels::AUDIOSET_CLASS_COUNT;
use echotag_ed::classifier::{Classifier, LabelSet, RemoteClassifier};
use echotag_ed::config::{Args, ServiceConfig};
use echotag_ed::db::{init_database_pool, SqliteResultStore};
use echotag_ed::{build_router, storage, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting echotag Event Detection (echotag-ed)"
    );

    let config = ServiceConfig::load(&args).context("Failed to load configuration")?;

    let root_folder = config.resolve_root_folder(&args);
    let db_path = prepare_root_folder(&root_folder).context("Failed to prepare root folder")?;
    info!(root_folder = %root_folder.display(), "Root folder");

    let db_pool = init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!(path = %db_path.display(), "Database ready");

    let classifier = build_classifier(&config)?;

    let source = storage::from_config(&config.storage).context("Failed to configure storage")?;
    info!(source = %source.describe(), "Audio source configured");

    let store = Arc::new(SqliteResultStore::new(
        db_pool.clone(),
        config.pipeline.db_max_lock_wait_ms,
    ));
    let event_bus = EventBus::new(config.server.event_capacity);

    let mut state = AppState::new(db_pool, event_bus, source)
        .with_store(store)
        .with_timeouts(config.pipeline.stage_timeouts())
        .with_max_upload_bytes(config.max_upload_bytes());
    if let Some(classifier) = classifier {
        state = state.with_classifier(classifier);
    }

    let app = build_router(state);

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_addr))?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Remote classifier from config, or `None` when no endpoint is set
fn build_classifier(config: &ServiceConfig) -> Result<Option<Arc<dyn Classifier>>> {
    let Some(endpoint) = config.classifier.endpoint.as_deref() else {
        warn!("No classifier endpoint configured; analysis endpoints will return 503");
        return Ok(None);
    };

    let labels = match config.labels_path() {
        Some(path) => LabelSet::load(path).context("Failed to load classifier labels")?,
        None => {
            info!("No label file configured, using built-in AudioSet labels");
            LabelSet::fallback(AUDIOSET_CLASS_COUNT)
        }
    };

    let classifier = RemoteClassifier::new(
        endpoint,
        config.classifier.model_name.clone(),
        config.classifier.sample_rate,
        labels,
        Duration::from_secs(config.classifier.request_timeout_secs),
    )
    .context("Failed to create classifier client")?;

    info!(
        endpoint,
        model = %config.classifier.model_name,
        sample_rate = config.classifier.sample_rate,
        "Classifier configured"
    );

    Ok(Some(Arc::new(classifier)))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
