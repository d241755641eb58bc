use async_trait::async_trait;

use crate::error::Result;

/// Best-effort clipboard write.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}
