//! Model backend errors
//!
//! Every failure talking to a generative-model service funnels into
//! [`BackendError`]. All variants are treated as transient by
//! [`ModelClient`](super::ModelClient), which retries them with backoff.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during backend operations
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum BackendError {
    /// API request failed with the given message
    #[error("{}", api_error_message(message, *status_code))]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitError { retry_after: Option<u64> },

    /// Invalid or malformed response from the model
    #[error("Invalid response from LLM: {message}")]
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Configuration error (missing API keys, invalid settings, etc.)
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Network-related error
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Generic error for other cases
    #[error("Error: {message}")]
    Other { message: String },
}

fn api_error_message(message: &str, status_code: Option<u16>) -> String {
    match status_code {
        Some(code) => format!("API error ({}): {}", code, message),
        None => format!("API error: {}", message),
    }
}

impl BackendError {
    pub fn other(message: impl Into<String>) -> Self {
        BackendError::Other {
            message: message.into(),
        }
    }
}
