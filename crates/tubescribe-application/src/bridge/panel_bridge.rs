use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tubescribe_core::message::{BridgeRequest, Message, PageMessage, Reply};
use tubescribe_core::{Result, ScribeError};
use uuid::Uuid;

use super::pending::PendingRequests;
use super::surface::PageSurface;

/// Panel side of the bridge.
///
/// Owns a channel name unique to this panel session and the pending map of
/// its requests. A background task matches responses tagged with the
/// channel name to their pending entries.
pub struct PanelBridge {
    channel: String,
    surface: PageSurface,
    pending: PendingRequests,
    listener: JoinHandle<()>,
}

impl PanelBridge {
    /// Opens a bridge with a fresh channel name.
    pub fn open(surface: PageSurface, request_timeout: Duration) -> Self {
        Self::with_channel(
            format!("tubescribe-panel-{}", Uuid::new_v4()),
            surface,
            request_timeout,
        )
    }

    /// Opens a bridge on a channel name chosen by the mounting context.
    pub fn with_channel(
        channel: String,
        surface: PageSurface,
        request_timeout: Duration,
    ) -> Self {
        let pending = PendingRequests::new(request_timeout);
        let mut receiver = surface.subscribe();

        let listener = {
            let channel = channel.clone();
            let pending = pending.clone();
            tokio::spawn(async move {
                loop {
                    match receiver.recv().await {
                        Ok(PageMessage::Response(response)) if response.source == channel => {
                            pending.resolve(response.request_id, response.response).await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            // A skipped message may have been one of our replies.
                            tracing::warn!(
                                "[Bridge] Panel listener skipped {} page messages",
                                skipped
                            );
                            pending
                                .fail_all(ScribeError::internal(format!(
                                    "{skipped} page messages lost while waiting for a reply"
                                )))
                                .await;
                        }
                        Err(RecvError::Closed) => {
                            pending.fail_all(ScribeError::no_listener("page")).await;
                            break;
                        }
                    }
                }
            })
        };

        Self {
            channel,
            surface,
            pending,
            listener,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Sends `message` to the content context and waits for its reply.
    ///
    /// A `Failure` reply comes back as `Err`. Without any other listener on
    /// the page the request fails at once with `NoListener`, and when the
    /// listener falls behind the surface every in-flight request fails.
    pub async fn request(&self, message: Message) -> Result<Reply> {
        if self.surface.listener_count() <= 1 {
            return Err(ScribeError::no_listener("content script"));
        }

        let kind = message.kind();
        let (request_id, reply_rx) = self.pending.register().await;
        tracing::debug!("[Bridge] {} -> content as request {}", kind, request_id);
        self.surface.post(PageMessage::Request(BridgeRequest {
            target: self.channel.clone(),
            request_id,
            message,
        }));

        self.pending.wait(request_id, reply_rx).await?.into_result()
    }

    pub async fn in_flight(&self) -> usize {
        self.pending.len().await
    }
}

impl Drop for PanelBridge {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
