//! Error types for echotag-ed's HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::db::StoreError;
use crate::services::AnalysisError;
use crate::utils::DecodeError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Audio container/codec not recognised (415)
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Recognised but undecodable audio (422)
    #[error("Corrupt audio: {0}")]
    CorruptAudio(String),

    /// Classifier failure (502)
    #[error("Classification failed: {0}")]
    Classification(String),

    /// A stage ran past its timeout (504)
    #[error("Timed out: {0}")]
    Timeout(String),

    /// No classifier configured (503)
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// echotag-common error
    #[error("Common error: {0}")]
    Common(#[from] echotag_common::Error),
}

impl ApiError {
    pub fn timed_out(what: &str, after: Duration) -> Self {
        ApiError::Timeout(format!("{} timed out after {:?}", what, after))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::CorruptAudio(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Classification(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message) = match self {
            ApiError::BadRequest(msg) => ("BAD_REQUEST", msg),
            ApiError::NotFound(msg) => ("NOT_FOUND", msg),
            ApiError::UnsupportedFormat(msg) => ("UNSUPPORTED_FORMAT", msg),
            ApiError::CorruptAudio(msg) => ("CORRUPT_AUDIO", msg),
            ApiError::Classification(msg) => ("CLASSIFICATION_ERROR", msg),
            ApiError::Timeout(msg) => ("TIMEOUT", msg),
            ApiError::ModelNotLoaded => ("MODEL_NOT_LOADED", "Model not loaded".to_string()),
            ApiError::Internal(msg) => ("INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => ("COMMON_ERROR", err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, %message, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Timeout(_) => ApiError::Timeout(err.to_string()),
            other => ApiError::Classification(other.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidParameter(msg) => ApiError::BadRequest(msg),
            AnalysisError::Classification(e) => e.into(),
        }
    }
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedFormat(msg) => ApiError::UnsupportedFormat(msg),
            DecodeError::CorruptData(msg) => ApiError::CorruptAudio(msg),
            DecodeError::Resample(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(e) => ApiError::Common(e),
            StoreError::Unavailable(msg) => ApiError::Internal(msg),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_errors_map_to_status() {
        let bad: ApiError = AnalysisError::InvalidParameter("overlap".into()).into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let timeout: ApiError =
            AnalysisError::Classification(ClassifierError::Timeout(Duration::from_secs(30))).into();
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let upstream: ApiError =
            AnalysisError::Classification(ClassifierError::Api(500, "boom".into())).into();
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_decode_errors_map_to_status() {
        let unsupported: ApiError = DecodeError::UnsupportedFormat("probe".into()).into();
        assert_eq!(unsupported.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let corrupt: ApiError = DecodeError::CorruptData("packet".into()).into();
        assert_eq!(corrupt.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_model_not_loaded_is_503() {
        assert_eq!(
            ApiError::ModelNotLoaded.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
