use tokio::sync::broadcast;
use tubescribe_core::message::PageMessage;

const SURFACE_CAPACITY: usize = 256;

/// Shared message surface of a page (the `window.postMessage` analogue).
///
/// Every subscriber sees every post; filtering by channel name is up to the
/// listener. Posting with no subscriber is not an error.
#[derive(Clone)]
pub struct PageSurface {
    sender: broadcast::Sender<PageMessage>,
}

impl Default for PageSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSurface {
    pub fn new() -> Self {
        Self::with_capacity(SURFACE_CAPACITY)
    }

    /// Surface keeping at most `capacity` unread messages per listener.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn post(&self, message: PageMessage) {
        let _ = self.sender.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageMessage> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
