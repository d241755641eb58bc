pub mod action;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod gateway;
pub mod key_store;
pub mod link;
pub mod message;
pub mod panel_host;
pub mod port;
pub mod scraper;
pub mod tab;
pub mod transcript;
pub mod watch_url;

// Re-export common error type
pub use error::{Result, ScribeError};

/// Identifier the browser assigns to a tab.
pub type TabId = u32;
