use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::time;
use tubescribe_core::message::Reply;
use tubescribe_core::{Result, ScribeError};

/// Reply slots of the requests a context has in flight.
///
/// Ids are allocated from a monotonic counter and never reused. An entry
/// leaves the map on its first matching reply, on timeout, or when the
/// owner fails everything at shutdown.
#[derive(Clone)]
pub struct PendingRequests {
    slots: Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>,
    next_id: Arc<AtomicU64>,
    timeout: Duration,
}

impl PendingRequests {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            timeout,
        }
    }

    /// Allocates an id and its reply slot. Register before posting so a fast
    /// reply cannot arrive ahead of the slot.
    pub async fn register(&self) -> (u64, oneshot::Receiver<Reply>) {
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.slots.lock().await.insert(request_id, tx);
        (request_id, rx)
    }

    /// Delivers `reply` to its slot. Returns `false` for unknown or already
    /// answered ids.
    pub async fn resolve(&self, request_id: u64, reply: Reply) -> bool {
        let Some(slot) = self.slots.lock().await.remove(&request_id) else {
            tracing::debug!("[Bridge] Dropping reply for unknown request {}", request_id);
            return false;
        };
        slot.send(reply).is_ok()
    }

    /// Waits for the reply of `request_id`, bounded by the configured timeout.
    pub async fn wait(
        &self,
        request_id: u64,
        reply_rx: oneshot::Receiver<Reply>,
    ) -> Result<Reply> {
        match time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.slots.lock().await.remove(&request_id);
                Err(ScribeError::internal(format!(
                    "reply slot of request {request_id} dropped"
                )))
            }
            Err(_) => {
                self.slots.lock().await.remove(&request_id);
                tracing::warn!(
                    "[Bridge] Request {} timed out after {:?}",
                    request_id,
                    self.timeout
                );
                Err(ScribeError::ReplyTimeout { request_id })
            }
        }
    }

    /// Resolves every pending request with `error`.
    pub async fn fail_all(&self, error: ScribeError) {
        let drained: Vec<_> = self.slots.lock().await.drain().collect();
        for (_, slot) in drained {
            let _ = slot.send(Reply::failure(error.clone()));
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}
