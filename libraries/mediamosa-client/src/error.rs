//! Error types for the MediaMosa client.

use thiserror::Error;

/// Errors that can occur when talking to a MediaMosa server.
#[derive(Error, Debug)]
pub enum MediaMosaError {
    /// Host, user or password missing, or configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Request rejected before any network activity
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, timeout or other transport failure
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with an empty body
    #[error("Empty response from server")]
    EmptyResponse,

    /// Response body is not a valid MediaMosa envelope
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Server returned a status other than OK
    #[error("API error ({code}): {description}")]
    Api { code: String, description: String },

    /// Unexpected status or payload during the login handshake
    #[error("Authentication protocol error ({code}): {description}")]
    AuthProtocol { code: String, description: String },

    /// Login handshake did not complete
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Expected field missing from an otherwise successful response
    #[error("Missing field in response: {0}")]
    FieldExtraction(String),
}

impl MediaMosaError {
    /// Wrap any transport-level error.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }
}

impl From<reqwest::Error> for MediaMosaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<quick_xml::Error> for MediaMosaError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for MediaMosa client operations.
pub type Result<T> = std::result::Result<T, MediaMosaError>;
