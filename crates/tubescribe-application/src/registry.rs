//! Background-owned table of tab sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tubescribe_core::TabId;
use tubescribe_core::message::Message;
use tubescribe_core::tab::{ReceiverState, TabSession};

/// Result of a handshake on the registry side.
#[derive(Debug, Default, PartialEq)]
pub struct HandshakeReplay {
    /// Video claimed for delivery over the port, if one was pending.
    pub video_id: Option<String>,
    /// Queued messages to post after the video.
    pub actions: Vec<Message>,
}

#[derive(Default)]
struct Sessions {
    live: HashMap<TabId, TabSession>,
    /// Tabs the browser reported closed. Tab ids are never reused, so a late
    /// event for one of these must not bring its session back.
    closed: HashSet<TabId>,
}

/// Tab sessions keyed by tab id.
///
/// All mutations of one session happen under the write lock, so the
/// claim-then-send protocol of the router never hands the same
/// `(tab, video)` delivery to two callers.
#[derive(Clone, Default)]
pub struct TabSessionRegistry {
    sessions: Arc<RwLock<Sessions>>,
}

impl TabSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a navigation, creating the session on first sight.
    ///
    /// Returns whether the tab's video changed, or `None` for a tab that was
    /// already closed.
    pub async fn observe_navigation(&self, tab_id: TabId, video_id: &str) -> Option<bool> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.open(tab_id)?;
        Some(session.observe_video(video_id))
    }

    pub async fn get(&self, tab_id: TabId) -> Option<TabSession> {
        self.sessions.read().await.live.get(&tab_id).cloned()
    }

    pub async fn contains(&self, tab_id: TabId) -> bool {
        self.sessions.read().await.live.contains_key(&tab_id)
    }

    pub async fn is_closed(&self, tab_id: TabId) -> bool {
        self.sessions.read().await.closed.contains(&tab_id)
    }

    pub async fn tab_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<_> = self.sessions.read().await.live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.live.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.live.is_empty()
    }

    /// False once the tab closed or moved on to another video.
    pub async fn is_current(&self, tab_id: TabId, video_id: &str) -> bool {
        self.sessions
            .read()
            .await
            .live
            .get(&tab_id)
            .is_some_and(|session| session.is_current(video_id))
    }

    pub async fn claim_delivery(&self, tab_id: TabId, video_id: &str) -> bool {
        self.sessions
            .write()
            .await
            .live
            .get_mut(&tab_id)
            .is_some_and(|session| session.claim_delivery(video_id))
    }

    pub async fn release_delivery(&self, tab_id: TabId, video_id: &str) {
        if let Some(session) = self.sessions.write().await.live.get_mut(&tab_id) {
            session.release_delivery(video_id);
        }
    }

    pub async fn set_receiver(&self, tab_id: TabId, receiver: ReceiverState) {
        if let Some(session) = self.sessions.write().await.live.get_mut(&tab_id) {
            session.receiver = receiver;
        }
    }

    /// Marks the content script as injected. Returns `true` only for the
    /// first call of a session, i.e. when the caller should inject.
    pub async fn mark_injected(&self, tab_id: TabId) -> bool {
        match self.sessions.write().await.live.get_mut(&tab_id) {
            Some(session) if !session.script_injected => {
                session.script_injected = true;
                true
            }
            _ => false,
        }
    }

    /// Queues a message for the tab's next handshake. No-op for unknown tabs.
    pub async fn queue_for_handshake(&self, tab_id: TabId, message: Message) {
        if let Some(session) = self.sessions.write().await.live.get_mut(&tab_id) {
            session.queue_for_handshake(message);
        }
    }

    /// Applies a content-script handshake.
    ///
    /// Marks the receiver ready, adopts `fallback_video` when the session
    /// knows no video yet, claims the current video if it was not delivered
    /// and drains the handshake queue. A closed tab replays nothing.
    pub async fn handshake(
        &self,
        tab_id: TabId,
        fallback_video: Option<&str>,
    ) -> HandshakeReplay {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.open(tab_id) else {
            return HandshakeReplay::default();
        };

        session.receiver = ReceiverState::ReceiverReady;
        if session.last_video_id.is_none() {
            if let Some(video_id) = fallback_video {
                session.observe_video(video_id);
            }
        }

        let pending = session.undelivered_video().map(str::to_string);
        let video_id = pending.filter(|video_id| session.claim_delivery(video_id));

        HandshakeReplay {
            video_id,
            actions: session.take_handshake_actions(),
        }
    }

    /// Drops the session and remembers the tab as closed.
    pub async fn remove(&self, tab_id: TabId) -> Option<TabSession> {
        let mut sessions = self.sessions.write().await;
        sessions.closed.insert(tab_id);
        sessions.live.remove(&tab_id)
    }
}

impl Sessions {
    /// Session of a tab that is still open, created on first sight.
    fn open(&mut self, tab_id: TabId) -> Option<&mut TabSession> {
        if self.closed.contains(&tab_id) {
            return None;
        }
        Some(
            self.live
                .entry(tab_id)
                .or_insert_with(|| TabSession::new(tab_id)),
        )
    }
}
