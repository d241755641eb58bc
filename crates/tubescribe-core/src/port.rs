//! Long-lived named channels between contexts.

use tokio::sync::mpsc;

use crate::TabId;
use crate::error::{Result, ScribeError};
use crate::message::Message;

/// Name of the port the content context opens towards the background.
pub const CONTENT_PORT_NAME: &str = "yt-transcript-content";

/// Sending half of a named port.
///
/// Posting fails with `NoListener` once the other side has disconnected,
/// which is how a reloaded or closed context shows up to its peer.
#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    tab_id: Option<TabId>,
    sender: mpsc::UnboundedSender<Message>,
}

/// Receiving half of a named port.
pub type PortReceiver = mpsc::UnboundedReceiver<Message>;

/// Creates a connected port pair.
pub fn port_pair(name: impl Into<String>, tab_id: Option<TabId>) -> (Port, PortReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let port = Port {
        name: name.into(),
        tab_id,
        sender,
    };
    (port, receiver)
}

impl Port {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tab of the context on the far end, when it lives in a tab.
    pub fn tab_id(&self) -> Option<TabId> {
        self.tab_id
    }

    pub fn post(&self, message: Message) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| ScribeError::no_listener(format!("port {}", self.name)))
    }

    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
