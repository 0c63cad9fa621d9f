//! API error taxonomy and HTTP mapping.
//!
//! Every failure a handler can hit maps to one variant, one machine-readable
//! code, and one status. Client-caused errors (4xx) echo their detail back;
//! server-side failures (5xx) are logged in full but answered with a fixed
//! message, so internal paths and library chatter never reach the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sussurro_transcription::TranscriptionError;
use tracing::{error, warn};

// ── Error code constants ────────────────────────────────────────────

/// Request is malformed (missing file field, empty payload).
pub const INVALID_INPUT: &str = "INVALID_INPUT";
/// Upload exceeds the configured size cap.
pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
/// Payload was received but could not be decoded as audio.
pub const AUDIO_DECODE_FAILED: &str = "AUDIO_DECODE_FAILED";
/// Model inference failed.
pub const INFERENCE_FAILED: &str = "INFERENCE_FAILED";
/// Staging the upload to disk failed.
pub const STORAGE_FAILED: &str = "STORAGE_FAILED";
/// No usable engine (model missing or not loaded).
pub const ENGINE_UNAVAILABLE: &str = "ENGINE_UNAVAILABLE";

/// Error type returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request is structurally invalid.
    #[error("{message}")]
    InvalidInput {
        /// What is wrong with the request.
        message: String,
    },

    /// Upload is larger than the configured cap.
    #[error("upload of {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge {
        /// Received size in bytes.
        size: u64,
        /// Configured cap in bytes.
        max: u64,
    },

    /// Payload is not decodable audio.
    #[error("{message}")]
    AudioDecode {
        /// Decoder failure description.
        message: String,
    },

    /// Inference failed inside the engine.
    #[error("{message}")]
    Inference {
        /// Internal failure description (not sent to clients).
        message: String,
    },

    /// Writing or cleaning up the staged file failed.
    #[error("{message}")]
    Storage {
        /// Internal failure description (not sent to clients).
        message: String,
    },

    /// Engine cannot serve requests.
    #[error("{message}")]
    EngineUnavailable {
        /// Internal failure description (not sent to clients).
        message: String,
    },
}

impl ApiError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => INVALID_INPUT,
            Self::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE,
            Self::AudioDecode { .. } => AUDIO_DECODE_FAILED,
            Self::Inference { .. } => INFERENCE_FAILED,
            Self::Storage { .. } => STORAGE_FAILED,
            Self::EngineUnavailable { .. } => ENGINE_UNAVAILABLE,
        }
    }

    /// HTTP status for this variant.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::AudioDecode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Inference { .. } | Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::EngineUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to send to the client. 4xx variants describe the
    /// client's own input; 5xx variants collapse to a fixed phrase.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidInput { .. } | Self::PayloadTooLarge { .. } | Self::AudioDecode { .. } => {
                self.to_string()
            }
            Self::Inference { .. } => "transcription failed".into(),
            Self::Storage { .. } => "could not store uploaded audio".into(),
            Self::EngineUnavailable { .. } => "transcription engine is not available".into(),
        }
    }
}

impl From<TranscriptionError> for ApiError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::AudioDecode(message) => Self::AudioDecode { message },
            TranscriptionError::ModelNotAvailable(message) => Self::EngineUnavailable { message },
            TranscriptionError::Inference(message) => Self::Inference { message },
            TranscriptionError::Io(e) => Self::Storage {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), detail = %self, "request failed");
        } else {
            warn!(code = self.code(), detail = %self, "request rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.client_message(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}
