//! Error types for tubescribe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every execution context.
///
/// Errors cross context boundaries inside `Reply::Failure`, so the type is
/// `Clone` and serializable. The `Display` text of each variant is what the
/// panel shows to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScribeError {
    /// No API key has been configured yet.
    #[error("API key not found. Please enter your API key in the extension settings.")]
    MissingCredential,

    /// The provider rejected the API key (HTTP 401).
    #[error("Invalid API key: {message}")]
    InvalidCredential { message: String },

    /// The provider rejected the request itself (HTTP 400).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The key is valid but not allowed to use the model (HTTP 403).
    #[error("Access denied: {message}")]
    Forbidden { message: String },

    /// Too many requests (HTTP 429).
    #[error("Rate limit exceeded. Please wait a moment and try again later. ({message})")]
    RateLimited { message: String },

    /// The outbound AI call exceeded its wall-clock budget.
    #[error("The AI request timed out after {seconds}s. Try a shorter transcript or question.")]
    Timeout { seconds: u64 },

    /// Any other non-2xx answer from the provider.
    #[error("API request failed with status {status}: {message}")]
    UpstreamError { status: u16, message: String },

    /// The destination context has no listener (not injected, reloaded or gone).
    #[error("No listener for message in {target}")]
    NoListener { target: String },

    /// The transcript UI could not be read.
    #[error("Couldn't get the transcript, sorry")]
    ScrapeFailed,

    /// A bridge request was not answered within the configured bound.
    #[error("No reply to request {request_id} in time")]
    ReplyTimeout { request_id: u64 },

    /// The receiving context does not handle this message kind.
    #[error("Unknown action: {action}")]
    UnknownAction { action: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScribeError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NoListener error for the named destination.
    pub fn no_listener(target: impl Into<String>) -> Self {
        Self::NoListener {
            target: target.into(),
        }
    }

    /// Creates an UpstreamError.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::UpstreamError {
            status,
            message: message.into(),
        }
    }

    /// Creates an InvalidRequest error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates an UnknownAction error.
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NoListener error
    pub fn is_no_listener(&self) -> bool {
        matches!(self, Self::NoListener { .. })
    }

    /// True for errors the user fixes by entering a different API key.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::InvalidCredential { .. } | Self::Forbidden { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ScribeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ScribeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ScribeError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at bootstrap edges)
impl From<anyhow::Error> for ScribeError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

/// A type alias for `Result<T, ScribeError>`.
pub type Result<T> = std::result::Result<T, ScribeError>;
