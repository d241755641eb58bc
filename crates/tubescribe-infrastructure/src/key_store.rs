//! `KeyStore` implementations.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tubescribe_core::key_store::KeyStore;
use tubescribe_core::{Result, ScribeError};

use crate::atomic_toml::AtomicTomlFile;
use crate::paths::ScribePaths;

/// On-disk layout of `store.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Key store persisted to a TOML file.
///
/// Every call goes to disk, so several processes sharing the file observe
/// each other's writes. Mutations hold the file lock for the whole
/// read-modify-write cycle.
#[derive(Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default location (`~/.config/tubescribe/store.toml`).
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ScribePaths::store_file()?))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(AtomicTomlFile<StoreFile>) -> Result<R> + Send + 'static,
    {
        let file = AtomicTomlFile::new(self.path.clone());
        tokio::task::spawn_blocking(move || f(file))
            .await
            .map_err(|e| ScribeError::internal(format!("key store task failed: {}", e)))?
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.blocking(move |file| {
            Ok(file
                .load()?
                .and_then(|store| store.values.get(&key).cloned()))
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tracing::debug!("[KeyStore] set {}", key);
        let (key, value) = (key.to_string(), value.to_string());
        self.blocking(move |file| {
            file.update(StoreFile::default(), |store| {
                store.values.insert(key, value);
            })
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        tracing::debug!("[KeyStore] remove {}", key);
        let key = key.to_string();
        self.blocking(move |file| {
            file.update(StoreFile::default(), |store| {
                store.values.remove(&key);
            })
        })
        .await
    }
}

/// Process-local key store.
#[derive(Clone, Default)]
pub struct InMemoryKeyStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tubescribe_core::key_store::keys;

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.toml");

        let store = FileKeyStore::new(path.clone());
        store.set(keys::API_KEY, "AIza-test-key").await.unwrap();
        store
            .set_flag(keys::TRANSCRIPT_PANEL_VISIBLE, true)
            .await
            .unwrap();

        let reopened = FileKeyStore::new(path);
        assert_eq!(
            reopened.api_key().await.unwrap().as_deref(),
            Some("AIza-test-key")
        );
        assert!(
            reopened
                .get_flag(keys::TRANSCRIPT_PANEL_VISIBLE)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_file_store_remove_and_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(temp_dir.path().join("store.toml"));
        assert_eq!(store.get(keys::API_KEY).await.unwrap(), None);

        store.set(keys::LAST_TRANSCRIPT, "hello").await.unwrap();
        store.remove(keys::LAST_TRANSCRIPT).await.unwrap();
        assert_eq!(store.get(keys::LAST_TRANSCRIPT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_blank_api_key_counts_as_absent() {
        let store = InMemoryKeyStore::with_values([(keys::API_KEY, "  ")]);
        assert_eq!(store.api_key().await.unwrap(), None);
        assert!(!store.get_flag(keys::TRANSCRIPT_PANEL_VISIBLE).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_store_file_is_user_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(temp_dir.path().join("store.toml"));
        store.set(keys::API_KEY, "secret").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
