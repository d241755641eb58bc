//! Loads and caches `ScribeConfig` from `config.toml`.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tubescribe_core::Result;
use tubescribe_core::config::ScribeConfig;

use crate::atomic_toml::AtomicTomlFile;
use crate::paths::ScribePaths;

/// Configuration service with a lazily filled cache.
///
/// A missing file yields the defaults and is not created.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<ScribeConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ScribePaths::config_file()?))
    }

    /// Returns the configuration, reading the file on first access.
    ///
    /// A malformed file is an error; only a missing one falls back to the
    /// defaults.
    pub fn get_config(&self) -> Result<ScribeConfig> {
        if let Ok(read_lock) = self.config.read() {
            if let Some(cached) = read_lock.as_ref() {
                return Ok(cached.clone());
            }
        }

        let loaded = AtomicTomlFile::<ScribeConfig>::new(self.path.clone())
            .load()?
            .unwrap_or_default();
        tracing::debug!("[Config] loaded {}", self.path.display());

        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), ScribeConfig::default());
        assert!(!temp_dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_cache_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[router]\ninject_settle_delay_ms = 10\n").unwrap();

        let service = ConfigService::new(path.clone());
        assert_eq!(service.get_config().unwrap().router.inject_settle_delay_ms, 10);

        std::fs::write(&path, "[router]\ninject_settle_delay_ms = 20\n").unwrap();
        assert_eq!(service.get_config().unwrap().router.inject_settle_delay_ms, 10);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().router.inject_settle_delay_ms, 20);
    }
}
