//! Internal error types for Bot API operations.
//!
//! These errors stay inside `warden-telegram` and are mapped to
//! [`ChatError`] at the port boundary.

use thiserror::Error;
use warden_core::ChatError;

/// Result type alias for Bot API operations.
pub type TelegramResult<T> = Result<T, TelegramError>;

/// Errors from the Telegram Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The API answered with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api {
        /// `error_code` of the reply, or the HTTP status
        code: u16,
        /// `description` of the reply
        description: String,
    },

    /// The reply did not have the expected shape.
    #[error("Invalid response from Telegram API: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error. The URL (which embeds the token) is stripped.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Base URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl TelegramError {
    /// Wrap a reqwest error after removing the request URL.
    pub(crate) fn network(err: reqwest::Error) -> Self {
        Self::Network(err.without_url())
    }
}

impl From<TelegramError> for ChatError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Network(e) if e.is_timeout() => Self::Timeout,
            TelegramError::Network(e) => Self::Network(e.without_url().to_string()),
            TelegramError::Api { code, description } => Self::Api { code, description },
            other => Self::Internal(other.to_string()),
        }
    }
}
