use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tubescribe_core::config::ScribeConfig;
use tubescribe_execution::{LogHistory, init_tracing};
use tubescribe_infrastructure::{ConfigService, FileKeyStore};

pub mod run;
pub mod set_key;
pub mod validate;

/// What every command needs: configuration, the key store and the log
/// history.
pub struct Context {
    pub config: ScribeConfig,
    pub key_store: Arc<FileKeyStore>,
    pub history: LogHistory,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let service = match config_path {
            Some(path) => ConfigService::new(path.to_path_buf()),
            None => ConfigService::default_location().context("Failed to locate config directory")?,
        };
        let config = service.get_config().context("Failed to load configuration")?;
        let history = init_tracing(&config.logging);

        let key_store = FileKeyStore::default_location().context("Failed to locate key store")?;
        tracing::debug!("[Config] Key store at {}", key_store.path().display());

        Ok(Self {
            config,
            key_store: Arc::new(key_store),
            history,
        })
    }
}

pub fn print_log_history(history: &LogHistory) {
    println!("\n📋 Log history ({} max):", history.capacity());
    for record in history.snapshot() {
        let component = record.component.as_deref().unwrap_or("-");
        println!(
            "  {} {:5} [{}] {}",
            record.timestamp, record.level, component, record.message
        );
    }
}
