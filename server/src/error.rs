use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use visage_audio::AudioError;
use visage_engine::EngineError;

/// Problems with the configuration file. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config: environment variable {0} is not set")]
    MissingVar(String),

    #[error("config: {0}")]
    Invalid(String),
}

/// A request failure, rendered as `{"detail": ..., "error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnprocessableAudio(String),

    #[error("{0}")]
    Inference(String),

    #[error("inference timed out after {0}s")]
    InferenceTimeout(u64),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnprocessableAudio(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InferenceTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::UnprocessableAudio(_) => "unprocessable_audio",
            ApiError::Inference(_) => "inference_error",
            ApiError::InferenceTimeout(_) => "inference_timeout",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "detail": self.to_string(),
            "error": self.kind(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<AudioError> for ApiError {
    fn from(err: AudioError) -> Self {
        match &err {
            AudioError::Io(_) | AudioError::Wav(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::UnprocessableAudio(err.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotInitialized | EngineError::Busy => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            e if e.is_inference() => ApiError::Inference(format!("Processing failed: {e}")),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(format!("io: {err}"))
    }
}
