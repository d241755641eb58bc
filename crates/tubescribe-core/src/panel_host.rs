use async_trait::async_trait;

use crate::error::Result;

/// Page-side mounting point of the injected panel.
#[async_trait]
pub trait PanelHost: Send + Sync {
    /// Mounts a panel that talks to the content context on `channel`.
    /// Mounting while a panel exists is a no-op.
    async fn mount(&self, channel: &str) -> Result<()>;

    async fn unmount(&self);

    fn is_mounted(&self) -> bool;
}
