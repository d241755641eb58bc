use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tubescribe_core::ScribeError;
use tubescribe_core::message::{BridgeResponse, Message, PageMessage, Reply};

use super::surface::PageSurface;

/// Content-side handler of panel requests.
#[async_trait]
pub trait BridgeHandler: Send + Sync + 'static {
    /// Whether requests tagged with `channel` are addressed to this context.
    fn accepts_channel(&self, channel: &str) -> bool;

    async fn handle_bridge_request(&self, message: Message) -> Reply;
}

/// Listens on the page surface and answers panel requests.
///
/// Requests on a channel the handler does not accept are answered with a
/// `NoListener` failure.
///
/// Each request is handled on its own task, so a slow AI call never holds
/// up a transcript lookup issued after it.
pub struct ContentRelay {
    task: JoinHandle<()>,
}

impl ContentRelay {
    pub fn spawn<H: BridgeHandler>(surface: PageSurface, handler: Arc<H>) -> Self {
        let mut receiver = surface.subscribe();

        let task = tokio::spawn(async move {
            loop {
                let request = match receiver.recv().await {
                    Ok(PageMessage::Request(request)) => request,
                    Ok(PageMessage::Response(_)) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "[Bridge] Content relay skipped {} page messages",
                            skipped
                        );
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !handler.accepts_channel(&request.target) {
                    tracing::debug!(
                        "[Bridge] No panel mounted on channel {}, refusing request {}",
                        request.target,
                        request.request_id
                    );
                    surface.post(PageMessage::Response(BridgeResponse {
                        source: request.target,
                        request_id: request.request_id,
                        response: Reply::failure(ScribeError::no_listener("content script")),
                    }));
                    continue;
                }

                let handler = handler.clone();
                let surface = surface.clone();
                tokio::spawn(async move {
                    let response = handler.handle_bridge_request(request.message).await;
                    surface.post(PageMessage::Response(BridgeResponse {
                        source: request.target,
                        request_id: request.request_id,
                        response,
                    }));
                });
            }
        });

        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ContentRelay {
    fn drop(&mut self) {
        self.task.abort();
    }
}
