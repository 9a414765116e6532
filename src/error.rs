//! Error types for gridmail.

use thiserror::Error;

/// Errors that can occur when building or sending mail.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// No backend has been configured.
    #[error("SendGrid backend not configured")]
    NotConfigured,

    /// Configuration error (missing env var, invalid value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing required field (e.g., from address).
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Error reading or processing an attachment.
    #[error("Attachment error: {0}")]
    Attachment(String),

    /// The message cannot be expressed as a valid Mail Send request.
    #[error("Payload error: {0}")]
    Payload(String),

    /// Error response from the SendGrid API.
    #[error("SendGrid API error: {message}")]
    Api {
        message: String,
        /// HTTP status code of the response, when one was received.
        status: Option<u16>,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl MailError {
    /// Create an API error carrying the HTTP status of the response.
    pub fn api(message: impl Into<String>, status: u16) -> Self {
        Self::Api {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
