//! Injected panel context.
//!
//! The panel only ever talks to the content context of its own page, over the
//! [`PanelBridge`]. Everything it shows lives in a [`PanelView`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tubescribe_core::action::AiAction;
use tubescribe_core::message::{ApiPayload, Message, Reply};
use tubescribe_core::transcript::TranscriptSegment;
use tubescribe_core::{Result, ScribeError};

use crate::bridge::PanelBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSender {
    User,
    Assistant,
}

impl ChatSender {
    fn label(&self) -> &'static str {
        match self {
            ChatSender::User => "You",
            ChatSender::Assistant => "Assistant",
        }
    }
}

/// One line of the panel's chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sender: ChatSender,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ChatEntry {
    fn now(sender: ChatSender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

/// What the panel currently displays.
#[derive(Debug, Clone, Default)]
pub struct PanelView {
    pub segments: Vec<TranscriptSegment>,
    /// Replaces the transcript when none could be loaded.
    pub notice: Option<String>,
    /// Result or error text of the last action.
    pub output: Option<String>,
    /// Busy label while an action runs.
    pub busy: Option<&'static str>,
    pub chat: Vec<ChatEntry>,
}

pub struct PanelController {
    bridge: PanelBridge,
    view: Mutex<PanelView>,
}

impl PanelController {
    pub fn new(bridge: PanelBridge) -> Self {
        Self {
            bridge,
            view: Mutex::new(PanelView::default()),
        }
    }

    fn view_mut(&self) -> MutexGuard<'_, PanelView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> PanelView {
        self.view_mut().clone()
    }

    pub fn channel(&self) -> &str {
        self.bridge.channel()
    }

    /// Fetches the transcript of the current video from the content context.
    pub async fn load_transcript(&self) -> Result<usize> {
        let reply = self.bridge.request(Message::GetTranscript).await;
        let mut view = self.view_mut();
        match reply {
            Ok(Reply::Transcript { segments, notice }) => {
                let count = segments.len();
                view.segments = segments;
                view.notice = notice;
                Ok(count)
            }
            Ok(other) => Err(unexpected_reply(&other)),
            Err(err) => {
                view.segments.clear();
                view.notice = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Runs one of the one-shot actions over the transcript.
    pub async fn run_action(&self, action: AiAction, model: Option<String>) -> Result<String> {
        self.view_mut().busy = Some(action.progress_label());

        let result = self
            .generate(action, ApiPayload::default().with_model(model))
            .await;

        let mut view = self.view_mut();
        view.busy = None;
        view.output = Some(match &result {
            Ok(text) => text.clone(),
            Err(err) => format!("Failed to {}: {}", action, err),
        });
        result
    }

    /// Asks a question about the video and records both sides in the chat.
    ///
    /// A failed turn still gets an assistant entry carrying the error.
    pub async fn ask(&self, question: &str, model: Option<String>) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ScribeError::invalid_request("question is empty"));
        }
        {
            let mut view = self.view_mut();
            view.chat.push(ChatEntry::now(ChatSender::User, question));
            view.busy = Some(AiAction::ChatTurn.progress_label());
        }

        let result = self
            .generate(
                AiAction::ChatTurn,
                ApiPayload::new(question).with_model(model),
            )
            .await;

        let answer = match &result {
            Ok(text) => text.clone(),
            Err(err) => format!("I'm sorry, there was an error: {}", err),
        };
        let mut view = self.view_mut();
        view.busy = None;
        view.chat.push(ChatEntry::now(ChatSender::Assistant, answer));
        result
    }

    async fn generate(&self, action: AiAction, payload: ApiPayload) -> Result<String> {
        match self
            .bridge
            .request(Message::ProcessAiAction {
                ai_action: action,
                payload,
            })
            .await?
        {
            Reply::Generated { text, .. } => Ok(text),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Copies `text` through the background clipboard.
    pub async fn copy(&self, text: &str) -> Result<()> {
        self.bridge
            .request(Message::CopyToClipboard {
                text: text.to_string(),
            })
            .await
            .map(|_| ())
    }

    pub async fn save_api_key(&self, api_key: &str) -> Result<()> {
        self.bridge
            .request(Message::ApiKeyUpdated {
                api_key: api_key.trim().to_string(),
            })
            .await
            .map(|_| ())
    }

    /// Asks the content context to remove the panel.
    pub async fn minimize(&self) -> Result<()> {
        self.bridge
            .request(Message::ToggleTranscriptPanel { visible: false })
            .await
            .map(|_| ())
    }

    /// Plain-text export of the chat history.
    pub fn export_chat(&self, title: &str) -> String {
        let date = Local::now().format("%Y-%m-%d %H:%M").to_string();
        render_chat_export(title, &date, &self.view_mut().chat)
    }
}

fn unexpected_reply(reply: &Reply) -> ScribeError {
    ScribeError::internal(format!("unexpected reply: {:?}", reply))
}

fn render_chat_export(title: &str, date: &str, entries: &[ChatEntry]) -> String {
    let mut out = format!("Chat History for: {}\nDate: {}\n\n", title, date);
    for entry in entries {
        out.push_str(&format!(
            "[{}] {}: {}\n\n",
            entry.timestamp.format("%H:%M:%S"),
            entry.sender.label(),
            entry.text
        ));
    }
    out
}

/// File name for an exported chat: non-alphanumerics become `-`.
pub fn export_file_name(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("chat-{}.txt", slug.trim_matches('-'))
}
