//! Audio event classifier capability
//!
//! The analysis core only sees [`Classifier`]: one waveform in, one score per
//! label out, in label order. The model itself runs behind an HTTP inference
//! endpoint ([`RemoteClassifier`]).

pub mod labels;
pub mod remote;
pub mod timeout;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::Prediction;

pub use labels::LabelSet;
pub use remote::RemoteClassifier;
pub use timeout::TimeoutClassifier;

/// Default model identifier reported by the service
pub const DEFAULT_MODEL_NAME: &str = "MIT/ast-finetuned-audioset-10-10-0.4593";

/// Sample rate the default model expects
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Inference endpoint unreachable or connection dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Inference endpoint answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Score vector length differs from the label set
    #[error("Model returned {got} scores but the label set has {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    /// No answer within the per-call timeout
    #[error("Classification timed out after {0:?}")]
    Timeout(Duration),
}

/// Waveform → label distribution
///
/// Input is mono audio at [`Classifier::sample_rate`]. Output covers the full
/// label set in label order; ranking is the caller's job. Implementations are
/// assumed deterministic for identical input.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Model identifier for banners and health output
    fn model_name(&self) -> &str;

    /// Sample rate the model expects its input at
    fn sample_rate(&self) -> u32;

    async fn classify(&self, samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError>;
}
