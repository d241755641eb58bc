//! File locations.
//!
//! ```text
//! ~/.config/tubescribe/
//! ├── config.toml    # ScribeConfig
//! └── store.toml     # key/value store (API key, panel flags)
//! ```

use std::path::PathBuf;

use tubescribe_core::{Result, ScribeError};

const APP_DIR: &str = "tubescribe";

/// Resolves tubescribe's files under the platform config directory.
pub struct ScribePaths;

impl ScribePaths {
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ScribeError::config("Cannot find home directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// # Security Note
    ///
    /// This file holds the API key; it is written with mode 600 on Unix.
    pub fn store_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("store.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_app_dir() {
        if let Ok(dir) = ScribePaths::config_dir() {
            assert!(dir.ends_with(APP_DIR));
            assert_eq!(ScribePaths::config_file().unwrap(), dir.join("config.toml"));
            assert_eq!(ScribePaths::store_file().unwrap(), dir.join("store.toml"));
        }
    }
}
