//! Background message routing.
//!
//! The router owns the tab sessions and the credential. It reacts to
//! navigation, handshakes and tab closes, and answers intent messages from
//! the other contexts.

use std::sync::Arc;

use tokio::sync::oneshot;
use tubescribe_core::clipboard::Clipboard;
use tubescribe_core::config::RouterConfig;
use tubescribe_core::gateway::{AiGateway, AiRequest};
use tubescribe_core::key_store::{KeyStore, keys, redact};
use tubescribe_core::message::{GENERATE_CONTENT_ENDPOINT, Message, Reply};
use tubescribe_core::port::Port;
use tubescribe_core::tab::{ReceiverState, TabHost};
use tubescribe_core::watch_url::watch_video_id;
use tubescribe_core::{Result, ScribeError, TabId};

use crate::registry::TabSessionRegistry;

/// What `on_navigation_complete` did for one navigation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Not a watch page; nothing tracked.
    NotWatchPage,
    /// Same video as before; nothing sent.
    Unchanged,
    /// First send reached the content script.
    Delivered,
    /// The content script was missing; the resend after injection reached it.
    DeliveredAfterInject,
    /// Another path (handshake replay) delivered the video first.
    AlreadyDelivered,
    /// Nobody is listening yet; the handshake will replay the video.
    AwaitingHandshake,
    /// The tab closed or navigated elsewhere during the settle delay.
    Abandoned,
}

/// Handle to a reply that is computed asynchronously.
#[derive(Debug)]
pub struct PendingReply {
    receiver: oneshot::Receiver<Reply>,
}

impl PendingReply {
    pub async fn wait(self) -> Reply {
        self.receiver
            .await
            .unwrap_or_else(|_| Reply::failure(ScribeError::internal("reply handler dropped")))
    }
}

/// Background protocol engine.
#[derive(Clone)]
pub struct MessageRouter {
    registry: TabSessionRegistry,
    host: Arc<dyn TabHost>,
    gateway: Arc<dyn AiGateway>,
    key_store: Arc<dyn KeyStore>,
    clipboard: Arc<dyn Clipboard>,
    config: RouterConfig,
}

impl MessageRouter {
    pub fn new(
        host: Arc<dyn TabHost>,
        gateway: Arc<dyn AiGateway>,
        key_store: Arc<dyn KeyStore>,
        clipboard: Arc<dyn Clipboard>,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry: TabSessionRegistry::new(),
            host,
            gateway,
            key_store,
            clipboard,
            config,
        }
    }

    pub fn registry(&self) -> &TabSessionRegistry {
        &self.registry
    }

    /// Loads the stored API key into the gateway. Returns whether one existed.
    pub async fn restore_credential(&self) -> Result<bool> {
        let api_key = self.key_store.api_key().await?;
        let found = api_key.is_some();
        self.gateway.set_credential(api_key).await;
        tracing::info!("[Router] Credential restored: {}", found);
        Ok(found)
    }

    pub async fn on_navigation_complete(
        &self,
        tab_id: TabId,
        url: &str,
    ) -> Result<NavigationOutcome> {
        let Some(video_id) = watch_video_id(url) else {
            return Ok(NavigationOutcome::NotWatchPage);
        };

        match self.registry.observe_navigation(tab_id, &video_id).await {
            None => {
                tracing::debug!("[Router] Ignoring navigation in closed tab {}", tab_id);
                return Ok(NavigationOutcome::Abandoned);
            }
            Some(false) => {
                tracing::debug!("[Router] Tab {} still on video {}", tab_id, video_id);
                return Ok(NavigationOutcome::Unchanged);
            }
            Some(true) => {}
        }
        tracing::info!("[Router] Tab {} loaded video {}", tab_id, video_id);

        match self.deliver(tab_id, &video_id).await {
            Ok(true) => Ok(NavigationOutcome::Delivered),
            Ok(false) => Ok(self.refused_outcome(tab_id).await),
            Err(err) if err.is_no_listener() => self.inject_and_resend(tab_id, &video_id).await,
            Err(err) => Err(err),
        }
    }

    /// Outcome of a refused claim: the tab closed meanwhile, or someone else
    /// delivered.
    async fn refused_outcome(&self, tab_id: TabId) -> NavigationOutcome {
        if self.registry.contains(tab_id).await {
            NavigationOutcome::AlreadyDelivered
        } else {
            NavigationOutcome::Abandoned
        }
    }

    /// Claims the delivery of `video_id` and sends it. `Ok(false)` when the
    /// claim was refused.
    async fn deliver(&self, tab_id: TabId, video_id: &str) -> Result<bool> {
        if !self.registry.claim_delivery(tab_id, video_id).await {
            return Ok(false);
        }

        match self.host.send_message(tab_id, Message::new_video(video_id)).await {
            Ok(_) => {
                tracing::info!("[Router] Delivered {} to tab {}", video_id, tab_id);
                self.registry
                    .set_receiver(tab_id, ReceiverState::ReceiverReady)
                    .await;
                Ok(true)
            }
            Err(err) => {
                self.registry.release_delivery(tab_id, video_id).await;
                if err.is_no_listener() {
                    self.registry
                        .set_receiver(tab_id, ReceiverState::NoReceiver)
                        .await;
                }
                Err(err)
            }
        }
    }

    /// Fallback for a tab without a listening content script: inject once,
    /// let it settle, resend once.
    async fn inject_and_resend(
        &self,
        tab_id: TabId,
        video_id: &str,
    ) -> Result<NavigationOutcome> {
        if self.registry.mark_injected(tab_id).await {
            tracing::info!(
                "[Router] Content script not ready in tab {}, injecting",
                tab_id
            );
            if let Err(err) = self.host.inject_content_script(tab_id).await {
                tracing::warn!("[Router] Injection into tab {} failed: {}", tab_id, err);
                return Ok(NavigationOutcome::AwaitingHandshake);
            }
        }

        tokio::time::sleep(self.config.inject_settle_delay()).await;

        if !self.registry.is_current(tab_id, video_id).await {
            tracing::info!(
                "[Router] Tab {} closed or left {} before resend",
                tab_id,
                video_id
            );
            return Ok(NavigationOutcome::Abandoned);
        }

        if let Some(api_key) = self.gateway.credential().await {
            let update = Message::ApiKeyUpdated { api_key };
            if let Err(err) = self.host.send_message(tab_id, update.clone()).await {
                tracing::debug!(
                    "[Router] Credential resend to tab {} failed: {}",
                    tab_id,
                    err
                );
                self.registry.queue_for_handshake(tab_id, update).await;
            }
        }

        match self.deliver(tab_id, video_id).await {
            Ok(true) => Ok(NavigationOutcome::DeliveredAfterInject),
            Ok(false) => Ok(self.refused_outcome(tab_id).await),
            Err(err) if err.is_no_listener() => {
                tracing::info!(
                    "[Router] Tab {} still not listening, waiting for handshake",
                    tab_id
                );
                Ok(NavigationOutcome::AwaitingHandshake)
            }
            Err(err) => Err(err),
        }
    }

    /// Handles `CONTENT_SCRIPT_READY` received over `port`.
    ///
    /// Returns the number of messages replayed.
    pub async fn on_handshake(&self, tab_id: TabId, port: &Port) -> Result<usize> {
        let known_video = self
            .registry
            .get(tab_id)
            .await
            .and_then(|session| session.last_video_id);
        let fallback = match known_video {
            Some(_) => None,
            None => self
                .host
                .tab_url(tab_id)
                .await
                .and_then(|url| watch_video_id(&url)),
        };

        let replay = self.registry.handshake(tab_id, fallback.as_deref()).await;
        tracing::info!("[Router] Handshake from tab {}", tab_id);

        let mut posted = 0;
        if let Some(video_id) = replay.video_id {
            if let Err(err) = port.post(Message::new_video(&video_id)) {
                self.registry.release_delivery(tab_id, &video_id).await;
                self.registry
                    .set_receiver(tab_id, ReceiverState::NoReceiver)
                    .await;
                return Err(err);
            }
            tracing::info!("[Router] Replayed {} to tab {}", video_id, tab_id);
            posted += 1;
        }

        let mut actions = replay.actions.into_iter();
        while let Some(action) = actions.next() {
            if let Err(err) = port.post(action.clone()) {
                self.registry.queue_for_handshake(tab_id, action).await;
                for rest in actions.by_ref() {
                    self.registry.queue_for_handshake(tab_id, rest).await;
                }
                return Err(err);
            }
            posted += 1;
        }

        Ok(posted)
    }

    /// Forgets the tab for good. Pending resends see the missing session and
    /// stop, and later events for it are ignored.
    pub async fn on_tab_closed(&self, tab_id: TabId) -> bool {
        let removed = self.registry.remove(tab_id).await.is_some();
        if removed {
            tracing::info!("[Router] Tab {} closed", tab_id);
        }
        removed
    }

    /// Dispatches a one-shot message. The reply is always computed on a
    /// separate task.
    pub fn on_intent_message(&self, sender: Option<TabId>, message: Message) -> PendingReply {
        let (reply_tx, reply_rx) = oneshot::channel();
        let router = self.clone();

        tokio::spawn(async move {
            let kind = message.kind();
            tracing::debug!("[Router] {} from {:?}", kind, sender);
            let reply = Reply::from(router.handle_intent(sender, message).await);
            if let Reply::Failure { error } = &reply {
                tracing::warn!("[Router] {} failed: {}", kind, error);
            }
            let _ = reply_tx.send(reply);
        });

        PendingReply { receiver: reply_rx }
    }

    async fn handle_intent(&self, sender: Option<TabId>, message: Message) -> Result<Reply> {
        match message {
            Message::MakeApiCall { endpoint, payload } => {
                if endpoint != GENERATE_CONTENT_ENDPOINT {
                    return Err(ScribeError::invalid_request(format!(
                        "unsupported endpoint {endpoint}"
                    )));
                }
                self.generate(endpoint, payload.prompt, payload.model).await
            }
            Message::ProcessAiAction { ai_action, payload } => {
                self.generate(ai_action.to_string(), payload.prompt, payload.model)
                    .await
            }
            Message::ValidateApiKey { api_key } => {
                let reply = match self.gateway.validate_credential(&api_key).await {
                    Ok(message) => Reply::Validation {
                        valid: true,
                        message,
                    },
                    Err(err) => Reply::Validation {
                        valid: false,
                        message: err.to_string(),
                    },
                };
                Ok(reply)
            }
            Message::ApiKeyUpdated { api_key } => {
                self.update_credential(sender, api_key).await?;
                Ok(Reply::Ack)
            }
            Message::CopyToClipboard { text } => {
                self.clipboard.write_text(&text).await?;
                Ok(Reply::Ack)
            }
            Message::GetTabId => sender
                .map(|tab_id| Reply::TabId { tab_id })
                .ok_or_else(|| ScribeError::invalid_request("sender is not a tab")),
            Message::ContentScriptReady { .. } => Err(ScribeError::invalid_request(
                "CONTENT_SCRIPT_READY must arrive over the content port",
            )),
            other => Err(ScribeError::unknown_action(other.kind())),
        }
    }

    async fn generate(
        &self,
        action: String,
        prompt: String,
        model: Option<String>,
    ) -> Result<Reply> {
        let response = self
            .gateway
            .generate(AiRequest {
                action,
                prompt,
                model,
            })
            .await?;
        Ok(Reply::Generated {
            text: response.text,
            model: response.model,
        })
    }

    /// Persists a new credential and propagates it to the other tabs.
    async fn update_credential(&self, sender: Option<TabId>, api_key: String) -> Result<()> {
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            self.key_store.remove(keys::API_KEY).await?;
            self.gateway.set_credential(None).await;
        } else {
            self.key_store.set(keys::API_KEY, &api_key).await?;
            self.gateway.set_credential(Some(api_key.clone())).await;
        }
        tracing::info!("[Router] Credential updated ({})", redact(&api_key));

        let update = Message::ApiKeyUpdated { api_key };
        for tab_id in self.registry.tab_ids().await {
            if Some(tab_id) == sender {
                continue;
            }
            match self.host.send_message(tab_id, update.clone()).await {
                Ok(_) => {}
                Err(err) if err.is_no_listener() => {
                    self.registry.queue_for_handshake(tab_id, update.clone()).await;
                }
                Err(err) => {
                    tracing::warn!(
                        "[Router] Credential propagation to tab {} failed: {}",
                        tab_id,
                        err
                    );
                }
            }
        }
        Ok(())
    }
}
