pub mod atomic_toml;
pub mod clipboard;
pub mod config_service;
pub mod key_store;
pub mod paths;

pub use clipboard::MemoryClipboard;
pub use config_service::ConfigService;
pub use key_store::{FileKeyStore, InMemoryKeyStore};
pub use paths::ScribePaths;
