/*
[INPUT]:  Error sources (HTTP, API, serialization, decode, WebSocket)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use crate::ws::frame::DecodeError;
use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the Vidra client.
#[derive(Error, Debug)]
pub enum VidraError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-2xx response
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// The intake call failed; recoverable by user-initiated resubmission
    #[error("upload failed: {message}")]
    UploadFailed { message: String },

    /// A status frame failed validation; dropped at the channel layer
    #[error(transparent)]
    MalformedFrame(#[from] DecodeError),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Response body did not match the expected schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VidraError {
    /// Check if the error is retryable.
    ///
    /// Upload failures are deliberately not retryable: resubmission is a
    /// user-initiated action, never an automatic one.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VidraError::Http(_) | VidraError::WebSocket(_) | VidraError::InvalidResponse(_)
        )
    }

    /// Check if the error is absorbed at its own layer and never surfaced.
    pub fn is_local(&self) -> bool {
        matches!(self, VidraError::MalformedFrame(_))
    }

    /// Create an API error from status code and message.
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        VidraError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }

    /// Wrap any error into the upload-failure class.
    pub fn upload_failed(message: impl Into<String>) -> Self {
        VidraError::UploadFailed {
            message: message.into(),
        }
    }
}

/// Result type alias for Vidra client operations.
pub type Result<T> = std::result::Result<T, VidraError>;
