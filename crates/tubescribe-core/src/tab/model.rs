use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::TabId;
use crate::message::Message;

/// Whether the tab's content context is known to be listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverState {
    /// No handshake yet, or the last delivery found no listener.
    NoReceiver,
    /// A delivery succeeded or the content context completed the handshake.
    ReceiverReady,
}

/// Background-owned protocol state of one browser tab.
///
/// Created on the first navigation to a watch page, updated whenever the
/// video id changes, dropped when the tab closes. The pair
/// (`last_video_id`, `delivered_video_id`) implements the delivery
/// deduplication: a video is delivered only while it differs from the last
/// one delivered to this tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSession {
    pub tab_id: TabId,
    /// Most recently observed video in the tab.
    pub last_video_id: Option<String>,
    pub receiver: ReceiverState,
    /// Video whose `NEW_VIDEO_LOADED` was delivered (or is being delivered).
    pub delivered_video_id: Option<String>,
    /// Set once the background injected the content script into this tab.
    pub script_injected: bool,
    /// Messages to replay over the port when the handshake arrives.
    pub pending_handshake_actions: VecDeque<Message>,
}

impl TabSession {
    pub fn new(tab_id: TabId) -> Self {
        Self {
            tab_id,
            last_video_id: None,
            receiver: ReceiverState::NoReceiver,
            delivered_video_id: None,
            script_injected: false,
            pending_handshake_actions: VecDeque::new(),
        }
    }

    /// Records a navigation to `video_id`. Returns `true` if the video changed.
    pub fn observe_video(&mut self, video_id: &str) -> bool {
        if self.last_video_id.as_deref() == Some(video_id) {
            return false;
        }
        self.last_video_id = Some(video_id.to_string());
        true
    }

    pub fn is_current(&self, video_id: &str) -> bool {
        self.last_video_id.as_deref() == Some(video_id)
    }

    /// Reserves the delivery of `video_id`.
    ///
    /// Succeeds only for the current video and only if it has not been
    /// delivered already. A caller that wins the claim must either deliver or
    /// call [`release_delivery`](Self::release_delivery).
    pub fn claim_delivery(&mut self, video_id: &str) -> bool {
        if !self.is_current(video_id) || self.delivered_video_id.as_deref() == Some(video_id) {
            return false;
        }
        self.delivered_video_id = Some(video_id.to_string());
        true
    }

    /// Gives back a claim whose delivery failed.
    pub fn release_delivery(&mut self, video_id: &str) {
        if self.delivered_video_id.as_deref() == Some(video_id) {
            self.delivered_video_id = None;
        }
    }

    /// Current video if it still needs to be delivered.
    pub fn undelivered_video(&self) -> Option<&str> {
        match (&self.last_video_id, &self.delivered_video_id) {
            (Some(last), Some(delivered)) if last == delivered => None,
            (Some(last), _) => Some(last.as_str()),
            (None, _) => None,
        }
    }

    /// Queues a message for the next handshake.
    ///
    /// A queued `API_KEY_UPDATED` replaces an older one: only the latest
    /// credential matters.
    pub fn queue_for_handshake(&mut self, message: Message) {
        if matches!(message, Message::ApiKeyUpdated { .. }) {
            self.pending_handshake_actions
                .retain(|queued| !matches!(queued, Message::ApiKeyUpdated { .. }));
        }
        self.pending_handshake_actions.push_back(message);
    }

    pub fn take_handshake_actions(&mut self) -> Vec<Message> {
        self.pending_handshake_actions.drain(..).collect()
    }
}
