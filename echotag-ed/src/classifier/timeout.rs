//! Per-call timeout decorator

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Classifier, ClassifierError};
use crate::models::Prediction;

/// Wraps a classifier so every `classify` call is bounded by `timeout`
pub struct TimeoutClassifier {
    inner: Arc<dyn Classifier>,
    timeout: Duration,
}

impl TimeoutClassifier {
    pub fn new(inner: Arc<dyn Classifier>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Classifier for TimeoutClassifier {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    async fn classify(&self, samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
        match tokio::time::timeout(self.timeout, self.inner.classify(samples)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    model = self.inner.model_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Classification call timed out"
                );
                Err(ClassifierError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowClassifier(Duration);

    #[async_trait]
    impl Classifier for SlowClassifier {
        fn model_name(&self) -> &str {
            "slow"
        }

        fn sample_rate(&self) -> u32 {
            16_000
        }

        async fn classify(&self, _samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
            tokio::time::sleep(self.0).await;
            Ok(vec![Prediction::new("Speech", 1.0)])
        }
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let classifier = TimeoutClassifier::new(
            Arc::new(SlowClassifier(Duration::from_secs(10))),
            Duration::from_millis(50),
        );

        let err = classifier.classify(&[0.0]).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let classifier = TimeoutClassifier::new(
            Arc::new(SlowClassifier(Duration::from_millis(1))),
            Duration::from_secs(1),
        );

        let predictions = classifier.classify(&[0.0]).await.unwrap();
        assert_eq!(predictions[0].label, "Speech");
        assert_eq!(classifier.model_name(), "slow");
    }
}
