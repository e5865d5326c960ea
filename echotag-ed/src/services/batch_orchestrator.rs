//! Batch fetch → decode → classify → persist pipeline
//!
//! Items run one at a time in request order. Every per-item failure is folded
//! into the [`BatchReport`]; nothing short of invalid options stops a batch.
//! Cancellation is checked between items only, so an item that has started
//! always finishes (or fails) cleanly.

use chrono::Utc;
use echotag_common::{EchotagEvent, EventBus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::classifier::{Classifier, TimeoutClassifier};
use crate::db::{ResultStore, StoreError};
use crate::models::{
    AudioBuffer, BatchItem, BatchOptions, BatchReport, FailedItem, FilePathInfo, ItemResult,
};
use crate::services::{analyze_timeline, classify_whole, AnalysisError, AudioPreprocessor};
use crate::storage::{AudioSource, FetchError};
use crate::utils::audio_decoder::{decode_audio_bytes, file_extension, DecodeError};

/// Pipeline stage, used to tag timeouts and task failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetch,
    Decode,
    Classify,
    Persist,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Fetch => "fetch",
            PipelineStage::Decode => "decode",
            PipelineStage::Classify => "classify",
            PipelineStage::Persist => "persist",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds for each external call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTimeouts {
    pub fetch: Duration,
    pub decode: Duration,
    /// Applied per classifier call (per window in timeline mode)
    pub classify: Duration,
    pub persist: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(60),
            decode: Duration::from_secs(120),
            classify: Duration::from_secs(30),
            persist: Duration::from_secs(30),
        }
    }
}

/// Why one item failed
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// Classification succeeded but the result was never durably recorded
    #[error("Persist failed: {0}")]
    Persist(#[from] StoreError),

    #[error("{stage} stage timed out after {after:?}")]
    Timeout { stage: PipelineStage, after: Duration },

    #[error("{stage} task failed: {message}")]
    Join {
        stage: PipelineStage,
        message: String,
    },

    #[error("batch cancelled")]
    Cancelled,
}

impl ItemError {
    /// Stage the failure happened in, if it belongs to one
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            ItemError::Fetch(_) => Some(PipelineStage::Fetch),
            ItemError::Decode(_) => Some(PipelineStage::Decode),
            ItemError::Analysis(_) => Some(PipelineStage::Classify),
            ItemError::Persist(_) => Some(PipelineStage::Persist),
            ItemError::Timeout { stage, .. } | ItemError::Join { stage, .. } => Some(*stage),
            ItemError::Cancelled => None,
        }
    }
}

async fn with_timeout<T, E>(
    stage: PipelineStage,
    after: Duration,
    future: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, ItemError>
where
    ItemError: From<E>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result.map_err(ItemError::from),
        Err(_) => Err(ItemError::Timeout { stage, after }),
    }
}

/// Runs batches against the configured collaborators
pub struct BatchOrchestrator {
    source: Arc<dyn AudioSource>,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn ResultStore>,
    event_bus: EventBus,
    preprocessor: AudioPreprocessor,
    timeouts: StageTimeouts,
}

impl BatchOrchestrator {
    /// `classifier` is wrapped with the per-call classify timeout
    pub fn new(
        source: Arc<dyn AudioSource>,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ResultStore>,
        event_bus: EventBus,
        timeouts: StageTimeouts,
    ) -> Self {
        let preprocessor = AudioPreprocessor::new(classifier.sample_rate());
        let classifier: Arc<dyn Classifier> =
            Arc::new(TimeoutClassifier::new(classifier, timeouts.classify));

        Self {
            source,
            classifier,
            store,
            event_bus,
            preprocessor,
            timeouts,
        }
    }

    /// Process `paths` in order and report per-item outcomes
    ///
    /// Fails only when `options` are invalid, before any item is touched.
    pub async fn process_batch(
        &self,
        paths: &[String],
        options: &BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, AnalysisError> {
        options.validate()?;

        let batch_id = Uuid::new_v4();
        let start_time = Instant::now();

        tracing::info!(
            %batch_id,
            total_files = paths.len(),
            analyze_timeline = options.analyze_timeline,
            "Batch started"
        );
        self.event_bus.emit_lossy(EchotagEvent::BatchStarted {
            batch_id,
            total_files: paths.len(),
            timestamp: Utc::now(),
        });

        let mut processed_files = Vec::new();
        let mut processed_time_blocks: Vec<String> = Vec::new();
        let mut failed = Vec::new();

        for path in paths {
            let mut item = BatchItem::new(path.as_str());

            // Skipped items get no status write
            if cancel.is_cancelled() {
                let reason = ItemError::Cancelled.to_string();
                item.mark_failed(reason.as_str());
                self.emit_item(batch_id, &item);
                failed.push(FailedItem {
                    file_path: path.clone(),
                    error: reason,
                });
                continue;
            }

            match self.process_item(batch_id, &mut item, options).await {
                Ok(()) => {
                    let time_block = FilePathInfo::parse(path).time_block;
                    if !processed_time_blocks.contains(&time_block) {
                        processed_time_blocks.push(time_block);
                    }
                    processed_files.push(path.clone());
                }
                Err(e) => {
                    failed.push(FailedItem {
                        file_path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = BatchReport {
            batch_id,
            total_files: paths.len(),
            processed_files,
            processed_time_blocks,
            failed,
            execution_time_seconds: start_time.elapsed().as_secs_f64(),
        };

        tracing::info!(
            %batch_id,
            processed = report.processed(),
            errors = report.errors(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            cancelled = cancel.is_cancelled(),
            "Batch completed"
        );
        self.event_bus.emit_lossy(EchotagEvent::BatchCompleted {
            batch_id,
            total_files: report.total_files,
            processed: report.processed(),
            errors: report.errors(),
            execution_time_seconds: report.execution_time_seconds,
            timestamp: Utc::now(),
        });

        Ok(report)
    }

    /// Drive one item through its lifecycle, recording each transition
    async fn process_item(
        &self,
        batch_id: Uuid,
        item: &mut BatchItem,
        options: &BatchOptions,
    ) -> Result<(), ItemError> {
        item.mark_processing();
        self.record_status(batch_id, item).await;

        let result = self.run_pipeline(item.file_path(), options).await;

        match &result {
            Ok(()) => {
                item.mark_completed();
                tracing::info!(file_path = %item.file_path(), "Item completed");
            }
            Err(e) => {
                item.mark_failed(e.to_string());
                tracing::warn!(
                    file_path = %item.file_path(),
                    stage = e.stage().map(|s| s.as_str()).unwrap_or("none"),
                    error = %e,
                    "Item failed"
                );
            }
        }
        self.record_status(batch_id, item).await;

        result
    }

    async fn run_pipeline(&self, path: &str, options: &BatchOptions) -> Result<(), ItemError> {
        let stage_start = Instant::now();
        let bytes = with_timeout(
            PipelineStage::Fetch,
            self.timeouts.fetch,
            self.source.fetch(path),
        )
        .await?;
        tracing::debug!(
            file_path = %path,
            stage = "fetch",
            bytes = bytes.len(),
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Stage finished"
        );

        let stage_start = Instant::now();
        let buffer = self.decode(path, bytes).await?;
        tracing::debug!(
            file_path = %path,
            stage = "decode",
            duration_seconds = buffer.duration_seconds(),
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Stage finished"
        );

        let stage_start = Instant::now();
        let result = if options.analyze_timeline {
            let analysis =
                analyze_timeline(&buffer, self.classifier.as_ref(), &options.timeline_params())
                    .await?;
            ItemResult::Timeline(analysis)
        } else {
            let predictions = classify_whole(
                &buffer,
                self.classifier.as_ref(),
                options.top_k,
                Some(options.threshold),
            )
            .await?;
            ItemResult::Predictions(predictions)
        };
        tracing::debug!(
            file_path = %path,
            stage = "classify",
            mode = result.mode(),
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Stage finished"
        );

        let stage_start = Instant::now();
        with_timeout(
            PipelineStage::Persist,
            self.timeouts.persist,
            self.store.persist(path, &result),
        )
        .await?;
        tracing::debug!(
            file_path = %path,
            stage = "persist",
            elapsed_ms = stage_start.elapsed().as_millis() as u64,
            "Stage finished"
        );

        Ok(())
    }

    /// Decode and preprocess on the blocking pool
    ///
    /// On timeout the blocking task is abandoned, not aborted.
    async fn decode(&self, path: &str, bytes: Vec<u8>) -> Result<AudioBuffer, ItemError> {
        let extension = file_extension(path);
        let preprocessor = self.preprocessor;

        let task = tokio::task::spawn_blocking(move || {
            let decoded = decode_audio_bytes(bytes, extension.as_deref())?;
            preprocessor.prepare(decoded)
        });

        match tokio::time::timeout(self.timeouts.decode, task).await {
            Ok(Ok(result)) => result.map_err(ItemError::from),
            Ok(Err(join_error)) => Err(ItemError::Join {
                stage: PipelineStage::Decode,
                message: join_error.to_string(),
            }),
            Err(_) => Err(ItemError::Timeout {
                stage: PipelineStage::Decode,
                after: self.timeouts.decode,
            }),
        }
    }

    /// Write the item's status to the store and announce it
    ///
    /// Store failures are logged and otherwise ignored.
    async fn record_status(&self, batch_id: Uuid, item: &BatchItem) {
        let status = item.status();
        let update = with_timeout(
            PipelineStage::Persist,
            self.timeouts.persist,
            self.store.update_status(item.file_path(), status, item.error()),
        )
        .await;

        if let Err(e) = update {
            tracing::warn!(
                file_path = %item.file_path(),
                status = %status,
                error = %e,
                "Failed to record item status"
            );
        }

        self.emit_item(batch_id, item);
    }

    fn emit_item(&self, batch_id: Uuid, item: &BatchItem) {
        self.event_bus.emit_lossy(EchotagEvent::ItemStatusChanged {
            batch_id,
            file_path: item.file_path().to_string(),
            status: item.status(),
            error: item.error().map(str::to_string),
            timestamp: Utc::now(),
        });
    }
}
