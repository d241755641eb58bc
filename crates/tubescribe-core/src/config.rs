//! Runtime configuration.
//!
//! Every section has defaults, so an empty or missing `config.toml` yields a
//! working configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::DEFAULT_TRANSCRIPT_BUDGET;
use crate::port::CONTENT_PORT_NAME;

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ScribeConfig {
    pub gateway: GatewayConfig,
    pub bridge: BridgeConfig,
    pub content: ContentConfig,
    pub router: RouterConfig,
    pub logging: LoggingConfig,
}

impl ScribeConfig {
    pub fn from_toml_str(raw: &str) -> crate::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Generative-language API client settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub default_model: String,
    /// Model used for credential checks.
    pub validation_model: String,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            default_model: "gemini-2.0-flash".to_string(),
            validation_model: "gemini-2.0-flash".to_string(),
            timeout_secs: 60,
            max_output_tokens: 2048,
            temperature: 0.7,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound for any pending bridge request.
    pub request_timeout_secs: u64,
    pub port_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 75,
            port_name: CONTENT_PORT_NAME.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// Wait after a new video is observed before scraping.
    pub initial_scrape_delay_ms: u64,
    /// Wait between opening the transcript UI and reading it.
    pub settle_delay_ms: u64,
    /// Transcript characters submitted with a prompt.
    pub transcript_budget: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            initial_scrape_delay_ms: 2_000,
            settle_delay_ms: 1_500,
            transcript_budget: DEFAULT_TRANSCRIPT_BUDGET,
        }
    }
}

impl ContentConfig {
    pub fn initial_scrape_delay(&self) -> Duration {
        Duration::from_millis(self.initial_scrape_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Wait after injecting the content script before the single resend.
    pub inject_settle_delay_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            inject_settle_delay_ms: 500,
        }
    }
}

impl RouterConfig {
    pub fn inject_settle_delay(&self) -> Duration {
        Duration::from_millis(self.inject_settle_delay_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Number of events kept by the in-memory log history.
    pub history_capacity: usize,
    /// Default filter when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            filter: "info".to_string(),
        }
    }
}
