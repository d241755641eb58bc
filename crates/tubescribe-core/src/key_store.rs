//! Persisted key/value store interface.
//!
//! Holds the API credential and UI preference flags. Values are strings;
//! flags are stored as `"true"`/`"false"`.

use async_trait::async_trait;

use crate::error::Result;

/// Well-known keys.
pub mod keys {
    /// API key for the generative-language service.
    pub const API_KEY: &str = "apiKey";
    /// Whether the panel should open automatically on watch pages.
    pub const TRANSCRIPT_PANEL_VISIBLE: &str = "transcriptPanelVisible";
    /// Transcript text saved when the panel was minimized.
    pub const LAST_TRANSCRIPT: &str = "lastTranscript";
}

/// Shortens a credential for log output: first five characters and `...`.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(5).collect();
    format!("{prefix}...")
}

/// Async persisted key/value store.
///
/// # Security Note
///
/// Implementations must never log stored values; the store holds the API key.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Stored API key, treating an empty string as absent.
    async fn api_key(&self) -> Result<Option<String>> {
        Ok(self
            .get(keys::API_KEY)
            .await?
            .filter(|key| !key.trim().is_empty()))
    }

    async fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.as_deref() == Some("true"))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, if value { "true" } else { "false" }).await
    }
}
