//! Whole-file classification (no segmentation)

use crate::classifier::Classifier;
use crate::models::analysis::{validate_threshold, validate_top_k};
use crate::models::{AudioBuffer, Prediction};
use crate::services::{rank_predictions, AnalysisError};

/// Classify the entire buffer once and rank the distribution
pub async fn classify_whole(
    buffer: &AudioBuffer,
    classifier: &dyn Classifier,
    top_k: usize,
    threshold: Option<f32>,
) -> Result<Vec<Prediction>, AnalysisError> {
    validate_top_k(top_k)?;
    if let Some(threshold) = threshold {
        validate_threshold(threshold)?;
    }
    if buffer.is_empty() {
        return Err(AnalysisError::InvalidParameter(
            "audio contains no samples".to_string(),
        ));
    }

    let distribution = classifier.classify(buffer.samples()).await?;
    Ok(rank_predictions(distribution, top_k, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        fn model_name(&self) -> &str {
            "fixed"
        }

        fn sample_rate(&self) -> u32 {
            16_000
        }

        async fn classify(&self, _samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                Prediction::new("Speech", 0.85),
                Prediction::new("Music", 0.05),
                Prediction::new("Cough", 0.12),
                Prediction::new("Silence", 0.02),
            ])
        }
    }

    #[tokio::test]
    async fn test_single_classification_call() {
        let classifier = FixedClassifier {
            calls: AtomicUsize::new(0),
        };
        let buffer = AudioBuffer::new(vec![0.1; 160_000], 16_000).unwrap();

        let first = classify_whole(&buffer, &classifier, 3, Some(0.1)).await.unwrap();
        let second = classify_whole(&buffer, &classifier, 3, Some(0.1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
        let labels: Vec<&str> = first.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Speech", "Cough"]);
    }

    #[tokio::test]
    async fn test_no_threshold_keeps_top_k() {
        let classifier = FixedClassifier {
            calls: AtomicUsize::new(0),
        };
        let buffer = AudioBuffer::new(vec![0.1; 100], 16_000).unwrap();

        let ranked = classify_whole(&buffer, &classifier, 5, None).await.unwrap();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[3].label, "Silence");
    }

    #[tokio::test]
    async fn test_empty_buffer_rejected() {
        let classifier = FixedClassifier {
            calls: AtomicUsize::new(0),
        };
        let buffer = AudioBuffer::new(Vec::new(), 16_000).unwrap();

        let err = classify_whole(&buffer, &classifier, 5, None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }
}
