#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tubescribe_application::MessageRouter;
use tubescribe_core::config::RouterConfig;
use tubescribe_core::gateway::{AiGateway, AiRequest, AiResponse};
use tubescribe_core::link::{BackgroundLink, PortConnection};
use tubescribe_core::message::{Message, Reply};
use tubescribe_core::panel_host::PanelHost;
use tubescribe_core::port::port_pair;
use tubescribe_core::scraper::TranscriptScraper;
use tubescribe_core::tab::TabHost;
use tubescribe_core::transcript::TranscriptSegment;
use tubescribe_core::{Result, ScribeError, TabId};
use tubescribe_infrastructure::{InMemoryKeyStore, MemoryClipboard};

pub fn watch(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[derive(Default)]
struct HostState {
    urls: HashMap<TabId, String>,
    listening: HashSet<TabId>,
    delivered: Vec<(TabId, Message)>,
    injections: Vec<TabId>,
    active: Option<TabId>,
}

/// Browser stand-in. A tab only answers messages once it is listening;
/// injection makes it listen when `listen_on_inject` is set.
pub struct MockTabHost {
    state: Mutex<HostState>,
    listen_on_inject: bool,
    pub injected: Notify,
}

impl MockTabHost {
    pub fn new(listen_on_inject: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HostState::default()),
            listen_on_inject,
            injected: Notify::new(),
        })
    }

    pub fn open_tab(&self, tab_id: TabId, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.urls.insert(tab_id, url.to_string());
        state.active = Some(tab_id);
    }

    pub fn set_listening(&self, tab_id: TabId) {
        self.state.lock().unwrap().listening.insert(tab_id);
    }

    pub fn injections(&self) -> Vec<TabId> {
        self.state.lock().unwrap().injections.clone()
    }

    pub fn delivered(&self) -> Vec<(TabId, Message)> {
        self.state.lock().unwrap().delivered.clone()
    }

    pub fn deliveries_of(&self, kind: &str) -> usize {
        self.delivered()
            .iter()
            .filter(|(_, message)| message.kind() == kind)
            .count()
    }
}

#[async_trait]
impl TabHost for MockTabHost {
    async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Reply> {
        let mut state = self.state.lock().unwrap();
        if !state.listening.contains(&tab_id) {
            return Err(ScribeError::no_listener(format!("tab {}", tab_id)));
        }
        state.delivered.push((tab_id, message));
        Ok(Reply::Ack)
    }

    async fn inject_content_script(&self, tab_id: TabId) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.injections.push(tab_id);
            if self.listen_on_inject {
                state.listening.insert(tab_id);
            }
        }
        self.injected.notify_one();
        Ok(())
    }

    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.state.lock().unwrap().urls.get(&tab_id).cloned()
    }

    async fn active_tab(&self) -> Option<TabId> {
        self.state.lock().unwrap().active
    }
}

/// Gateway that records prompts and answers with a fixed text.
#[derive(Default)]
pub struct RecordingGateway {
    credential: Mutex<Option<String>>,
    requests: Mutex<Vec<AiRequest>>,
}

impl RecordingGateway {
    pub fn with_credential(api_key: &str) -> Arc<Self> {
        let gateway = Self::default();
        *gateway.credential.lock().unwrap() = Some(api_key.to_string());
        Arc::new(gateway)
    }

    pub fn requests(&self) -> Vec<AiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiGateway for RecordingGateway {
    async fn set_credential(&self, api_key: Option<String>) {
        *self.credential.lock().unwrap() = api_key;
    }

    async fn credential(&self) -> Option<String> {
        self.credential.lock().unwrap().clone()
    }

    async fn generate(&self, request: AiRequest) -> Result<AiResponse> {
        if self.credential.lock().unwrap().is_none() {
            return Err(ScribeError::MissingCredential);
        }
        self.requests.lock().unwrap().push(request);
        Ok(AiResponse {
            text: "generated".into(),
            model: "gemini-2.0-flash".into(),
        })
    }

    async fn validate_credential(&self, api_key: &str) -> Result<String> {
        if api_key.starts_with("AIza") {
            Ok("API key is valid!".into())
        } else {
            Err(ScribeError::InvalidCredential {
                message: "API key not valid".into(),
            })
        }
    }
}

/// Scraper returning fixed segments and counting open/close calls.
#[derive(Default)]
pub struct StubScraper {
    segments: Vec<TranscriptSegment>,
    pub reveals: AtomicUsize,
    pub closes: AtomicUsize,
}

impl StubScraper {
    pub fn with_segments(segments: Vec<TranscriptSegment>) -> Arc<Self> {
        Arc::new(Self {
            segments,
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptScraper for StubScraper {
    async fn reveal(&self) -> Result<bool> {
        self.reveals.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn read_segments(&self) -> Result<Vec<TranscriptSegment>> {
        Ok(self.segments.clone())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Panel host that only remembers the mounted channel.
#[derive(Default)]
pub struct RecordingPanelHost {
    channel: Mutex<Option<String>>,
}

impl RecordingPanelHost {
    pub fn channel(&self) -> Option<String> {
        self.channel.lock().unwrap().clone()
    }
}

#[async_trait]
impl PanelHost for RecordingPanelHost {
    async fn mount(&self, channel: &str) -> Result<()> {
        self.channel
            .lock()
            .unwrap()
            .get_or_insert_with(|| channel.to_string());
        Ok(())
    }

    async fn unmount(&self) {
        self.channel.lock().unwrap().take();
    }

    fn is_mounted(&self) -> bool {
        self.channel.lock().unwrap().is_some()
    }
}

/// Link from a content context in `tab_id` straight into a router.
pub struct RouterLink {
    router: MessageRouter,
    tab_id: Option<TabId>,
}

impl RouterLink {
    pub fn new(router: MessageRouter, tab_id: Option<TabId>) -> Arc<Self> {
        Arc::new(Self { router, tab_id })
    }
}

#[async_trait]
impl BackgroundLink for RouterLink {
    async fn send(&self, message: Message) -> Result<Reply> {
        Ok(self.router.on_intent_message(self.tab_id, message).wait().await)
    }

    async fn connect(&self, name: &str) -> Result<PortConnection> {
        let (to_background, mut background_rx) = port_pair(name, self.tab_id);
        let (to_content, content_rx) = port_pair(name, None);
        let router = self.router.clone();
        let tab_id = self.tab_id;

        tokio::spawn(async move {
            while let Some(message) = background_rx.recv().await {
                if let (Message::ContentScriptReady { .. }, Some(tab_id)) = (&message, tab_id) {
                    let _ = router.on_handshake(tab_id, &to_content).await;
                }
            }
        });

        Ok(PortConnection {
            port: to_background,
            receiver: content_rx,
        })
    }
}

/// Link whose background never answers, as after an extension reload.
#[derive(Default)]
pub struct DeadLink {
    sent: Mutex<Vec<Message>>,
}

impl DeadLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundLink for DeadLink {
    async fn send(&self, message: Message) -> Result<Reply> {
        self.sent.lock().unwrap().push(message);
        Err(ScribeError::no_listener("background"))
    }

    async fn connect(&self, _name: &str) -> Result<PortConnection> {
        Err(ScribeError::no_listener("background"))
    }
}

pub fn router_with(host: Arc<MockTabHost>, gateway: Arc<dyn AiGateway>) -> MessageRouter {
    MessageRouter::new(
        host,
        gateway,
        Arc::new(InMemoryKeyStore::new()),
        Arc::new(MemoryClipboard::new()),
        RouterConfig::default(),
    )
}
