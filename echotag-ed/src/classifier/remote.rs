//! HTTP inference client
//!
//! POSTs `{"sampling_rate", "samples"}` to the model server and maps the
//! returned score vector onto the [`LabelSet`]. Servers may answer with raw
//! `logits` (softmax is applied here) or with `probabilities`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Classifier, ClassifierError, LabelSet};
use crate::models::Prediction;

const USER_AGENT: &str = concat!("echotag-ed/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct InferenceRequest<'a> {
    sampling_rate: u32,
    samples: &'a [f32],
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    logits: Option<Vec<f32>>,
    #[serde(default)]
    probabilities: Option<Vec<f32>>,
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }

    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Classifier backed by a remote inference endpoint
pub struct RemoteClassifier {
    http_client: reqwest::Client,
    endpoint: String,
    model_name: String,
    sample_rate: u32,
    labels: LabelSet,
}

impl RemoteClassifier {
    /// Create a client for `endpoint`
    ///
    /// `request_timeout` bounds the whole HTTP exchange; the pipeline applies
    /// its own per-call timeout on top via
    /// [`TimeoutClassifier`](super::TimeoutClassifier).
    pub fn new(
        endpoint: impl Into<String>,
        model_name: impl Into<String>,
        sample_rate: u32,
        labels: LabelSet,
        request_timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            model_name: model_name.into(),
            sample_rate,
            labels,
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    fn to_predictions(&self, scores: Vec<f32>) -> Result<Vec<Prediction>, ClassifierError> {
        if scores.len() != self.labels.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.labels.len(),
                got: scores.len(),
            });
        }

        Ok(self
            .labels
            .iter()
            .zip(scores)
            .map(|(label, score)| Prediction::new(label, score))
            .collect())
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn classify(&self, samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            samples = samples.len(),
            "Requesting classification"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&InferenceRequest {
                sampling_rate: self.sample_rate,
                samples,
            })
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), error_text));
        }

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        let scores = match (body.logits, body.probabilities) {
            (Some(logits), _) => softmax(&logits),
            (None, Some(probabilities)) => probabilities,
            (None, None) => {
                return Err(ClassifierError::Parse(
                    "response has neither logits nor probabilities".to_string(),
                ))
            }
        };

        self.to_predictions(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/classify", addr)
    }

    fn labels() -> LabelSet {
        LabelSet::from_labels(vec!["Speech".into(), "Music".into(), "Silence".into()])
    }

    fn client(endpoint: String) -> RemoteClassifier {
        RemoteClassifier::new(endpoint, "test-model", 16_000, labels(), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1000.0, 1000.0, 999.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((probs[0] - probs[1]).abs() < 1e-7);
        assert!(probs[2] < probs[0]);
    }

    #[tokio::test]
    async fn test_logits_are_softmaxed_in_label_order() {
        let router = Router::new().route(
            "/classify",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["sampling_rate"], 16_000);
                assert_eq!(body["samples"].as_array().unwrap().len(), 4);
                Json(json!({ "logits": [2.0, 0.0, -2.0] }))
            }),
        );
        let classifier = client(serve(router).await);

        let predictions = classifier.classify(&[0.0, 0.1, 0.2, 0.3]).await.unwrap();
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].label, "Speech");
        assert!(predictions[0].score > predictions[1].score);
        let sum: f32 = predictions.iter().map(|p| p.score).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_probabilities_pass_through() {
        let router = Router::new().route(
            "/classify",
            post(|| async { Json(json!({ "probabilities": [0.1, 0.7, 0.2] })) }),
        );
        let classifier = client(serve(router).await);

        let predictions = classifier.classify(&[0.0]).await.unwrap();
        assert_eq!(predictions[1], Prediction::new("Music", 0.7));
    }

    #[tokio::test]
    async fn test_length_mismatch_is_error() {
        let router = Router::new().route(
            "/classify",
            post(|| async { Json(json!({ "probabilities": [0.5, 0.5] })) }),
        );
        let classifier = client(serve(router).await);

        let err = classifier.classify(&[0.0]).await.unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::ShapeMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let router = Router::new().route(
            "/classify",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
        );
        let classifier = client(serve(router).await);

        let err = classifier.classify(&[0.0]).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Api(503, _)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let classifier = client(format!("http://{}/classify", addr));
        let err = classifier.classify(&[0.0]).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Network(_)));
    }
}
