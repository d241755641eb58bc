use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tubescribe_core::Result;
use tubescribe_core::clipboard::Clipboard;

/// Clipboard kept in process memory; the last written text wins.
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<RwLock<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contents(&self) -> Option<String> {
        self.contents.read().await.clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        tracing::debug!("[Clipboard] {} chars written", text.chars().count());
        *self.contents.write().await = Some(text.to_string());
        Ok(())
    }
}
