//! Conversion service error types

use thiserror::Error;

/// Errors from the remote document-conversion service
#[derive(Debug, Error)]
pub enum ConversionError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The envelope carried a non-zero application code
    #[error("conversion service rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// A field the protocol requires was absent
    #[error("response missing '{0}'")]
    MissingField(&'static str),

    /// Failed to parse a response body
    #[error("parse error: {0}")]
    Parse(String),

    /// Reading the local file to upload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No service endpoint or token configured
    #[error("conversion service not configured: {0}")]
    NotConfigured(String),
}
