//! In-process host for all extension contexts.
//!
//! The background context is an event loop over [`BrowserEvent`]s. Each tab
//! gets its own content context, page surface and panel host once the
//! content script is injected. Contexts only talk through messages, ports
//! and the page surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tubescribe_application::{
    ContentScript, ContentTasks, MessageRouter, NavigationOutcome, PageSurface, PanelBridge,
    PanelController, Popup,
};
use tubescribe_core::clipboard::Clipboard;
use tubescribe_core::config::ScribeConfig;
use tubescribe_core::gateway::AiGateway;
use tubescribe_core::key_store::KeyStore;
use tubescribe_core::link::{BackgroundLink, PortConnection};
use tubescribe_core::message::{Message, Reply};
use tubescribe_core::panel_host::PanelHost;
use tubescribe_core::port::{Port, PortReceiver, port_pair};
use tubescribe_core::tab::TabHost;
use tubescribe_core::transcript::TranscriptSegment;
use tubescribe_core::{Result, ScribeError, TabId};

use crate::scraper::{FixtureScraper, TranscriptLibrary};

/// Everything the background context reacts to.
pub enum BrowserEvent {
    NavigationComplete {
        tab_id: TabId,
        url: String,
        done: oneshot::Sender<Result<NavigationOutcome>>,
    },
    TabClosed {
        tab_id: TabId,
    },
    /// A context opened a port; `receiver` yields what it posts.
    PortConnected {
        tab_id: Option<TabId>,
        port: Port,
        receiver: PortReceiver,
    },
    /// One-shot message with its reply slot.
    Intent {
        sender: Option<TabId>,
        message: Message,
        reply: oneshot::Sender<Reply>,
    },
}

/// Completion of a navigation event in the background.
pub struct Navigation {
    receiver: oneshot::Receiver<Result<NavigationOutcome>>,
}

impl Navigation {
    pub async fn outcome(self) -> Result<NavigationOutcome> {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(ScribeError::no_listener("background")))
    }
}

/// Link from a tab or the popup into the background loop.
pub struct RuntimeLink {
    events: mpsc::UnboundedSender<BrowserEvent>,
    tab_id: Option<TabId>,
}

impl RuntimeLink {
    pub fn new(events: mpsc::UnboundedSender<BrowserEvent>, tab_id: Option<TabId>) -> Self {
        Self { events, tab_id }
    }
}

#[async_trait]
impl BackgroundLink for RuntimeLink {
    async fn send(&self, message: Message) -> Result<Reply> {
        let (reply, receiver) = oneshot::channel();
        self.events
            .send(BrowserEvent::Intent {
                sender: self.tab_id,
                message,
                reply,
            })
            .map_err(|_| ScribeError::no_listener("background"))?;
        receiver
            .await
            .map_err(|_| ScribeError::no_listener("background"))
    }

    async fn connect(&self, name: &str) -> Result<PortConnection> {
        let (to_background, background_rx) = port_pair(name, self.tab_id);
        let (to_page, page_rx) = port_pair(name, None);
        self.events
            .send(BrowserEvent::PortConnected {
                tab_id: self.tab_id,
                port: to_page,
                receiver: background_rx,
            })
            .map_err(|_| ScribeError::no_listener("background"))?;
        Ok(PortConnection {
            port: to_background,
            receiver: page_rx,
        })
    }
}

/// Mounts the panel into the page: a [`PanelController`] on the page's
/// surface.
pub struct InPagePanelHost {
    surface: PageSurface,
    request_timeout: Duration,
    panel: Mutex<Option<Arc<PanelController>>>,
}

impl InPagePanelHost {
    pub fn new(surface: PageSurface, request_timeout: Duration) -> Self {
        Self {
            surface,
            request_timeout,
            panel: Mutex::new(None),
        }
    }

    pub fn controller(&self) -> Option<Arc<PanelController>> {
        self.panel().clone()
    }

    fn panel(&self) -> MutexGuard<'_, Option<Arc<PanelController>>> {
        self.panel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PanelHost for InPagePanelHost {
    async fn mount(&self, channel: &str) -> Result<()> {
        let mut panel = self.panel();
        if panel.is_none() {
            let bridge = PanelBridge::with_channel(
                channel.to_string(),
                self.surface.clone(),
                self.request_timeout,
            );
            *panel = Some(Arc::new(PanelController::new(bridge)));
            tracing::info!("[Runtime] Panel mounted on {}", channel);
        }
        Ok(())
    }

    async fn unmount(&self) {
        if self.panel().take().is_some() {
            tracing::info!("[Runtime] Panel removed");
        }
    }

    fn is_mounted(&self) -> bool {
        self.panel().is_some()
    }
}

struct Page {
    content: Arc<ContentScript>,
    panel_host: Arc<InPagePanelHost>,
    _tasks: ContentTasks,
}

struct TabEntry {
    url: Arc<Mutex<String>>,
    page: Option<Arc<Page>>,
}

#[derive(Default)]
struct BrowserState {
    tabs: HashMap<TabId, TabEntry>,
    active: Option<TabId>,
}

/// Browser primitives over the runtime's tabs.
pub struct BrowserHost {
    state: Mutex<BrowserState>,
    next_tab: AtomicU32,
    inject_lock: tokio::sync::Mutex<()>,
    events: mpsc::UnboundedSender<BrowserEvent>,
    key_store: Arc<dyn KeyStore>,
    transcripts: TranscriptLibrary,
    config: ScribeConfig,
}

impl BrowserHost {
    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_tab(&self, url: &str) -> TabId {
        let tab_id = self.next_tab.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.tabs.insert(
            tab_id,
            TabEntry {
                url: Arc::new(Mutex::new(url.to_string())),
                page: None,
            },
        );
        state.active = Some(tab_id);
        tab_id
    }

    fn page(&self, tab_id: TabId) -> Option<Arc<Page>> {
        self.state()
            .tabs
            .get(&tab_id)
            .and_then(|entry| entry.page.clone())
    }

    /// Updates the tab's URL; `false` for an unknown tab.
    fn set_url(&self, tab_id: TabId, url: &str) -> bool {
        match self.state().tabs.get(&tab_id) {
            Some(entry) => {
                *entry.url.lock().unwrap_or_else(PoisonError::into_inner) = url.to_string();
                true
            }
            None => false,
        }
    }

    fn remove_tab(&self, tab_id: TabId) -> bool {
        let mut state = self.state();
        if state.active == Some(tab_id) {
            state.active = None;
        }
        state.tabs.remove(&tab_id).is_some()
    }

    async fn start_page(&self, tab_id: TabId, url: Arc<Mutex<String>>) -> Result<Arc<Page>> {
        let surface = PageSurface::new();
        let panel_host = Arc::new(InPagePanelHost::new(
            surface.clone(),
            self.config.bridge.request_timeout(),
        ));
        let scraper = Arc::new(FixtureScraper::new(self.transcripts.clone(), url.clone()));
        let link = Arc::new(RuntimeLink::new(self.events.clone(), Some(tab_id)));

        let content = ContentScript::new(
            link,
            scraper,
            panel_host.clone(),
            self.key_store.clone(),
            surface,
            &self.config,
        )?;
        let page_url = url.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let tasks = content.start(&page_url).await?;
        tracing::info!("[Runtime] Content script running in tab {}", tab_id);

        Ok(Arc::new(Page {
            content,
            panel_host,
            _tasks: tasks,
        }))
    }
}

#[async_trait]
impl TabHost for BrowserHost {
    async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Reply> {
        let page = self
            .page(tab_id)
            .ok_or_else(|| ScribeError::no_listener(format!("tab {}", tab_id)))?;
        Ok(page.content.handle_message(message).await)
    }

    async fn inject_content_script(&self, tab_id: TabId) -> Result<()> {
        let _inject = self.inject_lock.lock().await;
        let url = match self.state().tabs.get(&tab_id) {
            None => return Err(ScribeError::no_listener(format!("tab {}", tab_id))),
            Some(entry) if entry.page.is_some() => return Ok(()),
            Some(entry) => entry.url.clone(),
        };

        let page = self.start_page(tab_id, url).await?;
        if let Some(entry) = self.state().tabs.get_mut(&tab_id) {
            entry.page = Some(page);
        }
        Ok(())
    }

    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.state()
            .tabs
            .get(&tab_id)
            .map(|entry| entry.url.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn active_tab(&self) -> Option<TabId> {
        self.state().active
    }
}

/// Runs the background context until cancelled.
async fn run_background(
    router: MessageRouter,
    mut events: mpsc::UnboundedReceiver<BrowserEvent>,
    cancel: CancellationToken,
) {
    tracing::info!("[Runtime] Background started");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        dispatch(&router, event).await;
    }
    tracing::info!("[Runtime] Background stopped");
}

/// Closes are applied before the next event is read, so every later event
/// of the tab sees it closed. Everything else runs on its own task.
async fn dispatch(router: &MessageRouter, event: BrowserEvent) {
    if let BrowserEvent::TabClosed { tab_id } = event {
        router.on_tab_closed(tab_id).await;
        return;
    }

    let router = router.clone();
    match event {
        BrowserEvent::NavigationComplete { tab_id, url, done } => {
            tokio::spawn(async move {
                let outcome = router.on_navigation_complete(tab_id, &url).await;
                match &outcome {
                    Ok(outcome) => {
                        tracing::debug!("[Runtime] Tab {} navigation: {:?}", tab_id, outcome)
                    }
                    Err(err) => {
                        tracing::warn!("[Runtime] Tab {} navigation failed: {}", tab_id, err)
                    }
                }
                let _ = done.send(outcome);
            });
        }
        BrowserEvent::TabClosed { .. } => {}
        BrowserEvent::PortConnected {
            tab_id,
            port,
            mut receiver,
        } => {
            tokio::spawn(async move {
                while let Some(message) = receiver.recv().await {
                    match (message, tab_id) {
                        (Message::ContentScriptReady { .. }, Some(tab_id)) => {
                            if let Err(err) = router.on_handshake(tab_id, &port).await {
                                tracing::warn!(
                                    "[Runtime] Handshake with tab {} failed: {}",
                                    tab_id,
                                    err
                                );
                            }
                        }
                        (message, _) => {
                            tracing::debug!(
                                "[Runtime] Ignoring {} on port {}",
                                message.kind(),
                                port.name()
                            );
                        }
                    }
                }
            });
        }
        BrowserEvent::Intent {
            sender,
            message,
            reply,
        } => {
            let pending = router.on_intent_message(sender, message);
            tokio::spawn(async move {
                let _ = reply.send(pending.wait().await);
            });
        }
    }
}

/// The whole extension running in one process.
pub struct ExtensionRuntime {
    host: Arc<BrowserHost>,
    router: MessageRouter,
    key_store: Arc<dyn KeyStore>,
    events: mpsc::UnboundedSender<BrowserEvent>,
    cancel: CancellationToken,
    background: JoinHandle<()>,
}

impl ExtensionRuntime {
    /// Starts the background context. Must be called within a tokio runtime.
    pub fn new(
        config: ScribeConfig,
        gateway: Arc<dyn AiGateway>,
        key_store: Arc<dyn KeyStore>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();
        let host = Arc::new(BrowserHost {
            state: Mutex::new(BrowserState::default()),
            next_tab: AtomicU32::new(1),
            inject_lock: tokio::sync::Mutex::new(()),
            events: events.clone(),
            key_store: key_store.clone(),
            transcripts: TranscriptLibrary::new(),
            config: config.clone(),
        });
        let router = MessageRouter::new(
            host.clone(),
            gateway,
            key_store.clone(),
            clipboard,
            config.router.clone(),
        );

        let cancel = CancellationToken::new();
        let background = tokio::spawn(run_background(router.clone(), receiver, cancel.clone()));

        Self {
            host,
            router,
            key_store,
            events,
            cancel,
            background,
        }
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Loads the stored credential into the gateway.
    pub async fn restore_credential(&self) -> Result<bool> {
        self.router.restore_credential().await
    }

    /// Makes a transcript available to pages showing `video_id`.
    pub fn add_transcript(&self, video_id: impl Into<String>, segments: Vec<TranscriptSegment>) {
        self.host.transcripts.insert(video_id, segments);
    }

    /// Opens a new, active tab on `url`.
    pub fn open_tab(&self, url: &str) -> (TabId, Navigation) {
        let tab_id = self.host.create_tab(url);
        tracing::info!("[Runtime] Opened tab {} on {}", tab_id, url);
        (tab_id, self.navigation_complete(tab_id, url))
    }

    /// In-page navigation of an existing tab.
    pub fn navigate(&self, tab_id: TabId, url: &str) -> Result<Navigation> {
        if !self.host.set_url(tab_id, url) {
            return Err(ScribeError::no_listener(format!("tab {}", tab_id)));
        }
        if let Some(page) = self.host.page(tab_id) {
            page.content.on_url_change(url);
        }
        Ok(self.navigation_complete(tab_id, url))
    }

    pub fn activate(&self, tab_id: TabId) -> bool {
        let mut state = self.host.state();
        let known = state.tabs.contains_key(&tab_id);
        if known {
            state.active = Some(tab_id);
        }
        known
    }

    pub fn close_tab(&self, tab_id: TabId) -> bool {
        let removed = self.host.remove_tab(tab_id);
        if removed {
            let _ = self.events.send(BrowserEvent::TabClosed { tab_id });
        }
        removed
    }

    fn navigation_complete(&self, tab_id: TabId, url: &str) -> Navigation {
        let (done, receiver) = oneshot::channel();
        let event = BrowserEvent::NavigationComplete {
            tab_id,
            url: url.to_string(),
            done,
        };
        if self.events.send(event).is_err() {
            tracing::warn!("[Runtime] Background gone, navigation of tab {} dropped", tab_id);
        }
        Navigation { receiver }
    }

    /// Content context of the tab, once injected.
    pub fn content(&self, tab_id: TabId) -> Option<Arc<ContentScript>> {
        self.host.page(tab_id).map(|page| page.content.clone())
    }

    /// Panel mounted in the tab, if any.
    pub fn panel(&self, tab_id: TabId) -> Option<Arc<PanelController>> {
        self.host
            .page(tab_id)
            .and_then(|page| page.panel_host.controller())
    }

    pub fn popup(&self) -> Popup {
        Popup::new(
            self.host.clone(),
            Arc::new(RuntimeLink::new(self.events.clone(), None)),
            self.key_store.clone(),
        )
    }

    /// Stops the background loop and waits for it.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Err(err) = (&mut self.background).await {
            tracing::warn!("[Runtime] Background task ended abnormally: {}", err);
        }
    }
}

impl Drop for ExtensionRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
