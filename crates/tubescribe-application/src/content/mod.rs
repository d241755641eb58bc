//! Page-scoped content context.
//!
//! Owns the transcript cache of the visible video, serves the panel over the
//! page bridge and relays everything that needs the background.

mod loader;

pub use loader::TranscriptLoader;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tubescribe_core::action::AiAction;
use tubescribe_core::config::ScribeConfig;
use tubescribe_core::key_store::{KeyStore, keys};
use tubescribe_core::link::{BackgroundLink, PortConnection};
use tubescribe_core::message::{ApiPayload, Message, Reply};
use tubescribe_core::panel_host::PanelHost;
use tubescribe_core::port::Port;
use tubescribe_core::scraper::TranscriptScraper;
use tubescribe_core::transcript::{
    TranscriptCache, TranscriptSegment, full_text, unavailable_notice,
};
use tubescribe_core::watch_url::watch_video_id;
use tubescribe_core::{Result, ScribeError, TabId};
use uuid::Uuid;

use crate::bridge::{BridgeHandler, ContentRelay, PageSurface};
use crate::prompts::PromptLibrary;

struct ContentState {
    tab_id: Option<TabId>,
    cache: TranscriptCache,
    api_key: Option<String>,
    panel_channel: Option<String>,
}

/// Tasks a started content script runs. Dropping this stops them.
pub struct ContentTasks {
    relay: ContentRelay,
    port: Option<Port>,
    port_task: Option<JoinHandle<()>>,
}

impl ContentTasks {
    /// Port to the background, if the connection succeeded.
    pub fn port(&self) -> Option<&Port> {
        self.port.as_ref()
    }
}

impl Drop for ContentTasks {
    fn drop(&mut self) {
        self.relay.stop();
        if let Some(task) = &self.port_task {
            task.abort();
        }
    }
}

/// The content context of one tab.
pub struct ContentScript {
    this: Weak<ContentScript>,
    link: Arc<dyn BackgroundLink>,
    panel_host: Arc<dyn PanelHost>,
    key_store: Arc<dyn KeyStore>,
    surface: PageSurface,
    loader: TranscriptLoader,
    prompts: PromptLibrary,
    port_name: String,
    initial_scrape_delay: Duration,
    state: Mutex<ContentState>,
    scrape_lock: tokio::sync::Mutex<()>,
}

impl ContentScript {
    pub fn new(
        link: Arc<dyn BackgroundLink>,
        scraper: Arc<dyn TranscriptScraper>,
        panel_host: Arc<dyn PanelHost>,
        key_store: Arc<dyn KeyStore>,
        surface: PageSurface,
        config: &ScribeConfig,
    ) -> Result<Arc<Self>> {
        let prompts = PromptLibrary::new(config.content.transcript_budget)?;
        let loader = TranscriptLoader::new(scraper, config.content.settle_delay());

        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            link,
            panel_host,
            key_store,
            surface,
            loader,
            prompts,
            port_name: config.bridge.port_name.clone(),
            initial_scrape_delay: config.content.initial_scrape_delay(),
            state: Mutex::new(ContentState {
                tab_id: None,
                cache: TranscriptCache::new(),
                api_key: None,
                panel_channel: None,
            }),
            scrape_lock: tokio::sync::Mutex::new(()),
        }))
    }

    fn state(&self) -> MutexGuard<'_, ContentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.state().tab_id
    }

    pub fn current_video(&self) -> Option<String> {
        self.state().cache.video_id().map(str::to_string)
    }

    pub fn cached_segments(&self) -> Vec<TranscriptSegment> {
        self.state().cache.segments().to_vec()
    }

    pub fn has_api_key(&self) -> bool {
        self.state().api_key.is_some()
    }

    pub fn panel_channel(&self) -> Option<String> {
        self.state().panel_channel.clone()
    }

    /// Initializes the context on a freshly loaded page.
    ///
    /// Resolves the own tab id, opens the port to the background and sends
    /// the ready signal, then starts on the current video.
    pub async fn start(&self, page_url: &str) -> Result<ContentTasks> {
        let this = self
            .this
            .upgrade()
            .ok_or_else(|| ScribeError::internal("content script dropped"))?;

        let tab_id = match self.link.send(Message::GetTabId).await {
            Ok(Reply::TabId { tab_id }) => Some(tab_id),
            Ok(other) => {
                tracing::warn!("[Content] Unexpected reply to GET_TAB_ID: {:?}", other);
                None
            }
            Err(err) => {
                tracing::warn!("[Content] Could not resolve tab id: {}", err);
                None
            }
        };
        self.state().tab_id = tab_id;

        match self.key_store.api_key().await {
            Ok(api_key) => self.state().api_key = api_key,
            Err(err) => tracing::warn!("[Content] Could not read API key: {}", err),
        }

        let (port, port_task) = match self.link.connect(&self.port_name).await {
            Ok(PortConnection { port, mut receiver }) => {
                let task = {
                    let this = this.clone();
                    tokio::spawn(async move {
                        while let Some(message) = receiver.recv().await {
                            if let Reply::Failure { error } = this.handle_message(message).await {
                                tracing::warn!("[Content] Port message failed: {}", error);
                            }
                        }
                    })
                };
                if let Err(err) = port.post(Message::ContentScriptReady { tab_id }) {
                    tracing::warn!("[Content] Ready signal not delivered: {}", err);
                }
                (Some(port), Some(task))
            }
            Err(err) => {
                tracing::warn!("[Content] Could not connect to background: {}", err);
                (None, None)
            }
        };

        let relay = ContentRelay::spawn(self.surface.clone(), this);

        if let Some(video_id) = watch_video_id(page_url) {
            tracing::info!("[Content] Initialized with video {}", video_id);
            self.observe_video(&video_id);
        }

        match self.key_store.get_flag(keys::TRANSCRIPT_PANEL_VISIBLE).await {
            Ok(true) => {
                if let Err(err) = self.show_panel().await {
                    tracing::warn!("[Content] Could not restore panel: {}", err);
                }
            }
            Ok(false) => {}
            Err(err) => tracing::warn!("[Content] Could not read panel flag: {}", err),
        }

        Ok(ContentTasks {
            relay,
            port,
            port_task,
        })
    }

    /// In-page URL change seen by the content context itself.
    pub fn on_url_change(&self, url: &str) {
        if let Some(video_id) = watch_video_id(url) {
            self.observe_video(&video_id);
        }
    }

    /// Switches to `video_id`; a change drops the cache and schedules a scrape
    /// after the initial delay.
    fn observe_video(&self, video_id: &str) {
        if !self.state().cache.observe_video(video_id) {
            return;
        }
        tracing::info!("[Content] New video detected: {}", video_id);

        let Some(this) = self.this.upgrade() else {
            return;
        };
        let video_id = video_id.to_string();
        let delay = self.initial_scrape_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.ensure_transcript(&video_id).await;
        });
    }

    /// Cached segments of `video_id`, scraping once if none are cached.
    ///
    /// Scrapes are serialized, so concurrent callers share one attempt.
    async fn ensure_transcript(&self, video_id: &str) -> Vec<TranscriptSegment> {
        let _scrape = self.scrape_lock.lock().await;
        {
            let mut state = self.state();
            if let Some(segments) = state.cache.ready_segments(video_id) {
                return segments.to_vec();
            }
            if !state.cache.begin_loading(video_id) {
                return Vec::new();
            }
        }

        tracing::info!("[Content] Getting transcript for video {}", video_id);
        let segments = self.loader.scrape().await;
        if !self.state().cache.store(video_id, segments.clone()) {
            tracing::debug!("[Content] Discarded transcript of stale video {}", video_id);
        }
        segments
    }

    async fn get_transcript(&self) -> Reply {
        let Some(video_id) = self.current_video() else {
            return self.restored_transcript().await;
        };
        transcript_reply(self.ensure_transcript(&video_id).await)
    }

    /// Text saved when the panel was last minimized, for pages without a video.
    async fn restored_transcript(&self) -> Reply {
        match self.key_store.get(keys::LAST_TRANSCRIPT).await {
            Ok(Some(text)) if !text.trim().is_empty() => Reply::Transcript {
                segments: vec![TranscriptSegment::new("", text)],
                notice: None,
            },
            _ => transcript_reply(Vec::new()),
        }
    }

    async fn process_ai_action(&self, action: AiAction, payload: ApiPayload) -> Result<Reply> {
        let segments = match self.current_video() {
            Some(video_id) => self.ensure_transcript(&video_id).await,
            None => Vec::new(),
        };
        if segments.is_empty() {
            return Err(ScribeError::ScrapeFailed);
        }

        let prompt = self
            .prompts
            .render(action, &full_text(&segments), Some(payload.prompt.as_str()))?;
        tracing::info!("[Content] {} over {} segments", action, segments.len());

        self.relay_to_background(Message::ProcessAiAction {
            ai_action: action,
            payload: ApiPayload {
                prompt,
                model: payload.model,
            },
        })
        .await
    }

    async fn relay_to_background(&self, message: Message) -> Result<Reply> {
        self.link.send(message).await?.into_result()
    }

    async fn show_panel(&self) -> Result<()> {
        let channel = {
            let mut state = self.state();
            state
                .panel_channel
                .get_or_insert_with(|| format!("tubescribe-panel-{}", Uuid::new_v4()))
                .clone()
        };
        tracing::info!("[Content] Showing panel");
        self.panel_host.mount(&channel).await
    }

    /// Removes the panel, keeping the transcript text for the next session.
    async fn hide_panel(&self) -> Result<()> {
        let text = {
            let mut state = self.state();
            state.panel_channel = None;
            full_text(state.cache.segments())
        };
        if !text.is_empty() {
            self.key_store.set(keys::LAST_TRANSCRIPT, &text).await?;
        }
        self.panel_host.unmount().await;
        Ok(())
    }

    /// Handles a message from the background or the popup.
    pub async fn handle_message(&self, message: Message) -> Reply {
        tracing::debug!("[Content] Received {}", message.kind());
        let result = match message {
            Message::NewVideoLoaded { video_id } => {
                self.observe_video(&video_id);
                Ok(Reply::Ack)
            }
            Message::ShowSidepanel { .. } => self.show_panel().await.map(|_| Reply::Ack),
            Message::ToggleTranscriptPanel { visible } => {
                let toggled = if visible {
                    self.show_panel().await
                } else {
                    self.hide_panel().await
                };
                toggled.map(|_| Reply::Ack)
            }
            Message::ApiKeyUpdated { api_key } => {
                self.state().api_key = Some(api_key).filter(|key| !key.is_empty());
                Ok(Reply::Ack)
            }
            Message::GetTranscript => Ok(self.get_transcript().await),
            Message::ProcessAiAction { ai_action, payload } => {
                self.process_ai_action(ai_action, payload).await
            }
            other => Err(ScribeError::unknown_action(other.kind())),
        };
        Reply::from(result)
    }
}

#[async_trait]
impl BridgeHandler for ContentScript {
    fn accepts_channel(&self, channel: &str) -> bool {
        self.state().panel_channel.as_deref() == Some(channel)
    }

    async fn handle_bridge_request(&self, message: Message) -> Reply {
        tracing::debug!("[Content] Panel sent {}", message.kind());
        let result = match message {
            Message::GetTranscript => Ok(self.get_transcript().await),
            Message::ProcessAiAction { ai_action, payload } => {
                self.process_ai_action(ai_action, payload).await
            }
            Message::ApiKeyUpdated { api_key } => {
                self.state().api_key = Some(api_key.clone()).filter(|key| !key.is_empty());
                self.relay_to_background(Message::ApiKeyUpdated { api_key })
                    .await
            }
            Message::ToggleTranscriptPanel { visible: false } => {
                self.hide_panel().await.map(|_| Reply::Ack)
            }
            message @ (Message::MakeApiCall { .. } | Message::CopyToClipboard { .. }) => {
                self.relay_to_background(message).await
            }
            other => Err(ScribeError::unknown_action(other.kind())),
        };
        Reply::from(result)
    }
}

fn transcript_reply(segments: Vec<TranscriptSegment>) -> Reply {
    let notice = segments.is_empty().then(unavailable_notice);
    Reply::Transcript { segments, notice }
}
