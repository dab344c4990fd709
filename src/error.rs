//! Error types for requests against the Clash Royale API
//!
//! Network and status failures are kept as distinct variants so callers can
//! tell retryable conditions (timeouts, rate limits, server errors) apart from
//! permanent ones (bad request, unauthorized, not found).

use thiserror::Error;

/// Errors surfaced to callers of the client
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The request could not be sent or the connection failed
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The response body was not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// 400 - typically a missing or malformed search parameter
    #[error("Bad request ({status}): {message}")]
    BadRequest { status: u16, message: String },

    /// 401/403 - invalid token or the token does not allow this IP
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// 404 - the player or clan does not exist
    #[error("Not found ({status}): {message}")]
    NotFound { status: u16, message: String },

    /// 429 - request throttled
    #[error("Rate limited ({status}): {message}")]
    RateLimited { status: u16, message: String },

    /// 5xx - the API service is having issues
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success status code
    #[error("Unexpected status ({status}): {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The token or user agent cannot be sent as an HTTP header
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The player or clan tag is malformed
    #[error("Invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },
}

impl ApiError {
    /// Maps a non-success HTTP status code to the matching error variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => ApiError::BadRequest { status, message },
            401 | 403 => ApiError::Unauthorized { status, message },
            404 => ApiError::NotFound { status, message },
            429 => ApiError::RateLimited { status, message },
            500..=599 => ApiError::ServerError { status, message },
            _ => ApiError::UnexpectedStatus { status, message },
        }
    }

    /// Classifies a transport-level reqwest failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err)
        } else {
            ApiError::Network(err)
        }
    }

    /// HTTP status code, if the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest { status, .. }
            | ApiError::Unauthorized { status, .. }
            | ApiError::NotFound { status, .. }
            | ApiError::RateLimited { status, .. }
            | ApiError::ServerError { status, .. }
            | ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_)
                | ApiError::Network(_)
                | ApiError::RateLimited { .. }
                | ApiError::ServerError { .. }
        )
    }
}
