use async_trait::async_trait;

use crate::error::Result;
use crate::message::{Message, Reply};
use crate::port::{Port, PortReceiver};

/// Both halves of a port opened towards the background.
#[derive(Debug)]
pub struct PortConnection {
    /// Posts to the background.
    pub port: Port,
    /// Messages the background posts back.
    pub receiver: PortReceiver,
}

/// Channel from a page-scoped context (content script, popup) to the
/// background context.
#[async_trait]
pub trait BackgroundLink: Send + Sync {
    /// One-shot request. Fails with `NoListener` when the background is gone.
    async fn send(&self, message: Message) -> Result<Reply>;

    /// Opens a named long-lived port.
    async fn connect(&self, name: &str) -> Result<PortConnection>;
}
