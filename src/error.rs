//! Error types for the studio.

use std::time::Duration;

/// Notice shown to the user when a generation attempt fails, whatever the cause.
pub const GENERATION_FAILED_NOTICE: &str = "Failed to generate image. Please try again.";

/// Maximum length of an API error message kept in an error value.
#[cfg(feature = "gemini")]
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors raised by image providers and local image handling.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Billing is not enabled for the API key.
    #[error("billing error: {0}")]
    Billing(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API answered successfully but the payload was not usable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading the source image or saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudioError {
    /// Short machine-readable name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Api { .. } => "api",
            Self::RateLimited { .. } => "rate_limited",
            Self::Billing(_) => "billing",
            Self::ContentBlocked(_) => "content_blocked",
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnexpectedResponse(_) => "unexpected_response",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result type alias for provider and image operations.
pub type Result<T> = std::result::Result<T, StudioError>;

/// The single failure kind surfaced by [`crate::Studio`] for a generation attempt.
///
/// Every provider error collapses into this value. Its `Display` is the
/// generic user notice; the underlying cause is only reachable through
/// [`std::error::Error::source`] for logging.
#[derive(Debug, thiserror::Error)]
#[error("{}", GENERATION_FAILED_NOTICE)]
pub struct GenerationFailure {
    #[source]
    cause: StudioError,
}

impl GenerationFailure {
    pub(crate) fn new(cause: StudioError) -> Self {
        Self { cause }
    }

    /// The provider error that caused this failure.
    pub fn cause(&self) -> &StudioError {
        &self.cause
    }
}

/// Redacts API keys and truncates an API error body before it is stored.
#[cfg(feature = "gemini")]
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            // Google API keys start with "AIza"; also catch `key=...` query params.
            if word.contains("AIza") {
                "[REDACTED]".to_string()
            } else if let Some(pos) = word.find("key=") {
                format!("{}key=[REDACTED]", &word[..pos])
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

/// Parses a `Retry-After` header given in seconds.
#[cfg(feature = "gemini")]
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
