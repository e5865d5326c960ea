//! Single-file upload endpoints
//!
//! POST /analyze_sound and POST /analyze_timeline take a multipart `file`
//! field, decode it, and run the whole-file or timeline path directly. Errors
//! surface as the request's status code.

use axum::{
    extract::{Multipart, Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::classifier::{Classifier, TimeoutClassifier};
use crate::error::{ApiError, ApiResult};
use crate::models::analysis::round_to;
use crate::models::{AnalysisResult, AudioBuffer, Prediction, TimelineParams};
use crate::services::{analyze_timeline, classify_whole, AudioPreprocessor};
use crate::utils::audio_decoder::{file_extension, SUPPORTED_EXTENSIONS};
use crate::utils::{decode_audio_bytes, is_supported_extension};
use crate::AppState;

/// Describes the uploaded file as received, before resampling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub filename: String,
    /// Source duration, two decimals
    pub duration_seconds: f64,
    /// Source sample rate
    pub sample_rate: u32,
}

#[derive(Debug, Deserialize)]
pub struct SoundQuery {
    #[serde(default = "default_sound_top_k")]
    pub top_k: usize,
    pub threshold: Option<f32>,
}

fn default_sound_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    #[serde(default = "default_timeline_segment_duration")]
    pub segment_duration: f64,
    #[serde(default = "default_timeline_overlap")]
    pub overlap: f64,
    #[serde(default = "default_timeline_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub threshold: f32,
}

fn default_timeline_segment_duration() -> f64 {
    1.0
}

fn default_timeline_overlap() -> f64 {
    0.5
}

fn default_timeline_top_k() -> usize {
    3
}

impl TimelineQuery {
    fn params(&self) -> TimelineParams {
        TimelineParams {
            segment_duration: self.segment_duration,
            overlap: self.overlap,
            top_k: self.top_k,
            threshold: self.threshold,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SoundResponse {
    pub predictions: Vec<Prediction>,
    pub audio_info: AudioInfo,
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub audio_info: AudioInfo,
}

/// POST /analyze_sound
pub async fn analyze_sound(
    State(state): State<AppState>,
    Query(query): Query<SoundQuery>,
    multipart: Multipart,
) -> ApiResult<Json<SoundResponse>> {
    let classifier = state.require_classifier()?;
    let upload = read_upload(multipart).await?;
    let start = Instant::now();

    let (buffer, audio_info) = decode_upload(&state, &classifier, upload).await?;
    let classifier = TimeoutClassifier::new(classifier, state.timeouts.classify);
    let predictions = classify_whole(&buffer, &classifier, query.top_k, query.threshold).await?;

    tracing::info!(
        filename = %audio_info.filename,
        predictions = predictions.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Whole-file analysis finished"
    );

    Ok(Json(SoundResponse {
        predictions,
        audio_info,
    }))
}

/// POST /analyze_timeline
pub async fn analyze_timeline_upload(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
    multipart: Multipart,
) -> ApiResult<Json<TimelineResponse>> {
    let classifier = state.require_classifier()?;
    let params = query.params();
    params.validate()?;

    let upload = read_upload(multipart).await?;
    let start = Instant::now();

    let (buffer, audio_info) = decode_upload(&state, &classifier, upload).await?;
    let classifier = TimeoutClassifier::new(classifier, state.timeouts.classify);
    let result = analyze_timeline(&buffer, &classifier, &params).await?;

    tracing::info!(
        filename = %audio_info.filename,
        segments = result.summary.total_segments,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Timeline analysis finished"
    );

    Ok(Json(TimelineResponse { result, audio_info }))
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of a multipart body
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_supported_extension(&filename) {
            return Err(ApiError::BadRequest(format!(
                "Unsupported file format '{}'. Supported formats: {}",
                filename,
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// Decode and preprocess on the blocking pool under the decode timeout
async fn decode_upload(
    state: &AppState,
    classifier: &Arc<dyn Classifier>,
    upload: Upload,
) -> ApiResult<(AudioBuffer, AudioInfo)> {
    let preprocessor = AudioPreprocessor::new(classifier.sample_rate());
    let extension = file_extension(&upload.filename);
    let Upload { filename, bytes } = upload;

    let task = tokio::task::spawn_blocking(move || -> ApiResult<(AudioBuffer, AudioInfo)> {
        let decoded = decode_audio_bytes(bytes, extension.as_deref())?;
        let audio_info = AudioInfo {
            filename,
            duration_seconds: round_to(decoded.duration_seconds, 2),
            sample_rate: decoded.sample_rate,
        };
        let buffer = preprocessor.prepare(decoded)?;
        Ok((buffer, audio_info))
    });

    match tokio::time::timeout(state.timeouts.decode, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ApiError::Internal(format!(
            "Decode task failed: {}",
            join_error
        ))),
        Err(_) => Err(ApiError::timed_out("decode", state.timeouts.decode)),
    }
}

/// Build upload analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze_sound", post(analyze_sound))
        .route("/analyze_timeline", post(analyze_timeline_upload))
}
