//! Interface of the component that talks to the generative-language API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Abstract AI request, independent of the provider's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiRequest {
    /// Action or endpoint name, used for logging only.
    pub action: String,
    pub prompt: String,
    /// Requested model; unknown or deprecated ids fall back to the default.
    pub model: Option<String>,
}

/// Normalized provider output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    pub text: String,
    /// Model that actually served the request.
    pub model: String,
}

/// Owner of the credential and the only network client.
///
/// Every call results in at most one HTTP request. Errors are classified
/// (`MissingCredential`, `RateLimited`, `Timeout`, ...) and never retried.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Replaces the in-memory credential (last write wins).
    async fn set_credential(&self, api_key: Option<String>);

    async fn credential(&self) -> Option<String>;

    async fn generate(&self, request: AiRequest) -> Result<AiResponse>;

    /// Checks `api_key` with a tiny request. Returns a confirmation message.
    async fn validate_credential(&self, api_key: &str) -> Result<String>;
}
