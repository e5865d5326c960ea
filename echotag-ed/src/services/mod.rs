//! Analysis core and batch pipeline
//!
//! - [`segmenter`]: split an [`AudioBuffer`](crate::models::AudioBuffer) into windows
//! - [`prediction_ranker`]: filter → sort → truncate rule shared by both paths
//! - [`timeline_aggregator`]: per-window classification and summary statistics
//! - [`whole_file`]: single-shot classification without segmentation
//! - [`audio_preprocessor`]: decoded audio → classifier-ready buffer
//! - [`batch_orchestrator`]: fetch → decode → classify → persist for many paths

pub mod audio_preprocessor;
pub mod batch_orchestrator;
pub mod prediction_ranker;
pub mod segmenter;
pub mod timeline_aggregator;
pub mod whole_file;

use thiserror::Error;

use crate::classifier::ClassifierError;

pub use audio_preprocessor::AudioPreprocessor;
pub use batch_orchestrator::{BatchOrchestrator, ItemError, PipelineStage, StageTimeouts};
pub use prediction_ranker::rank_predictions;
pub use segmenter::segment;
pub use timeline_aggregator::{aggregate, analyze_timeline, summarize};
pub use whole_file::classify_whole;

/// Errors raised by the analysis core
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Rejected before any processing (bad segment_duration, overlap, top_k, threshold)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The classifier failed for a window or a whole file
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifierError),
}
