//! Messages exchanged between the background, content and panel contexts.
//!
//! Every message is a `{action, ...fields}` JSON value. Replies travel back
//! as a separate tagged [`Reply`] so that each hop can match them to the
//! request it answered.

use serde::{Deserialize, Serialize};

use crate::TabId;
use crate::action::AiAction;
use crate::error::{Result, ScribeError};
use crate::transcript::TranscriptSegment;

/// Endpoint name accepted by `MAKE_API_CALL`.
pub const GENERATE_CONTENT_ENDPOINT: &str = "generateContent";

/// Prompt plus optional model override carried by AI requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiPayload {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ApiPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// A one-way message between execution contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    /// background -> content: a (new) video is active in the tab.
    NewVideoLoaded { video_id: String },
    /// content -> background over the long-lived port: receiver is initialized.
    ContentScriptReady { tab_id: Option<TabId> },
    /// content -> background: resolve the sender's own tab id.
    GetTabId,
    /// popup/background -> content: inject the side panel.
    ShowSidepanel { validated: bool },
    /// popup -> content: show or hide the side panel.
    ToggleTranscriptPanel { visible: bool },
    /// any -> content/background: a new credential was saved.
    ApiKeyUpdated { api_key: String },
    /// panel -> content: cached or freshly scraped transcript.
    GetTranscript,
    /// content/panel -> background: raw AI call.
    MakeApiCall {
        endpoint: String,
        payload: ApiPayload,
    },
    /// panel -> content -> background: AI action over the current transcript.
    ProcessAiAction {
        ai_action: AiAction,
        #[serde(default)]
        payload: ApiPayload,
    },
    /// popup -> background: test a credential against the provider.
    ValidateApiKey { api_key: String },
    /// panel -> content -> background: clipboard write fallback.
    CopyToClipboard { text: String },
}

impl Message {
    /// Wire name of the message kind, safe to log (never includes fields).
    pub fn kind(&self) -> &'static str {
        match self {
            Message::NewVideoLoaded { .. } => "NEW_VIDEO_LOADED",
            Message::ContentScriptReady { .. } => "CONTENT_SCRIPT_READY",
            Message::GetTabId => "GET_TAB_ID",
            Message::ShowSidepanel { .. } => "SHOW_SIDEPANEL",
            Message::ToggleTranscriptPanel { .. } => "TOGGLE_TRANSCRIPT_PANEL",
            Message::ApiKeyUpdated { .. } => "API_KEY_UPDATED",
            Message::GetTranscript => "GET_TRANSCRIPT",
            Message::MakeApiCall { .. } => "MAKE_API_CALL",
            Message::ProcessAiAction { .. } => "PROCESS_AI_ACTION",
            Message::ValidateApiKey { .. } => "VALIDATE_API_KEY",
            Message::CopyToClipboard { .. } => "COPY_TO_CLIPBOARD",
        }
    }

    pub fn new_video(video_id: impl Into<String>) -> Self {
        Message::NewVideoLoaded {
            video_id: video_id.into(),
        }
    }
}

/// Answer to a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Reply {
    /// Message applied; nothing to return.
    Ack,
    TabId {
        tab_id: TabId,
    },
    /// Transcript of the current video; `notice` replaces it when empty.
    Transcript {
        segments: Vec<TranscriptSegment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
    },
    /// Normalized AI output.
    Generated {
        text: String,
        model: String,
    },
    /// Outcome of a credential check.
    Validation {
        valid: bool,
        message: String,
    },
    Failure {
        error: ScribeError,
    },
}

impl Reply {
    pub fn failure(error: ScribeError) -> Self {
        Reply::Failure { error }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Reply::Failure { .. })
    }

    /// Turns `Failure` into `Err` so callers can use `?`.
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Failure { error } => Err(error),
            other => Ok(other),
        }
    }
}

impl From<Result<Reply>> for Reply {
    fn from(result: Result<Reply>) -> Self {
        result.unwrap_or_else(Reply::failure)
    }
}

/// Panel -> content request posted on the shared page surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    /// Channel name of the panel session the request belongs to.
    pub target: String,
    pub request_id: u64,
    pub message: Message,
}

/// Content -> panel response posted on the shared page surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    /// Channel name echoed from the request.
    pub source: String,
    pub request_id: u64,
    pub response: Reply,
}

/// Anything posted on the page surface. Every listener sees every post and
/// filters by channel name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageMessage {
    Request(BridgeRequest),
    Response(BridgeResponse),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_use_action_tag_and_camel_case_fields() {
        let value = serde_json::to_value(Message::new_video("abc123")).unwrap();
        assert_eq!(value, json!({"action": "NEW_VIDEO_LOADED", "videoId": "abc123"}));

        let value = serde_json::to_value(Message::ProcessAiAction {
            ai_action: AiAction::Summarize,
            payload: ApiPayload::new("").with_model(Some("gemini-2.0-flash".into())),
        })
        .unwrap();
        assert_eq!(value["action"], "PROCESS_AI_ACTION");
        assert_eq!(value["aiAction"], "summarize");
        assert_eq!(value["payload"]["model"], "gemini-2.0-flash");
    }

    #[test]
    fn test_browser_wire_messages_parse() {
        let parsed: Message = serde_json::from_value(json!({
            "action": "MAKE_API_CALL",
            "endpoint": "generateContent",
            "payload": {"prompt": "hi"}
        }))
        .unwrap();
        assert_eq!(
            parsed,
            Message::MakeApiCall {
                endpoint: GENERATE_CONTENT_ENDPOINT.to_string(),
                payload: ApiPayload::new("hi"),
            }
        );

        let parsed: Message =
            serde_json::from_value(json!({"action": "SHOW_SIDEPANEL", "validated": true})).unwrap();
        assert_eq!(parsed.kind(), "SHOW_SIDEPANEL");
    }

    #[test]
    fn test_page_messages_are_told_apart_by_tag_field() {
        let request = PageMessage::Request(BridgeRequest {
            target: "chan-1".into(),
            request_id: 7,
            message: Message::GetTranscript,
        });
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["target"], "chan-1");
        assert_eq!(value["requestId"], 7);
        assert_eq!(serde_json::from_value::<PageMessage>(value).unwrap(), request);

        let response = PageMessage::Response(BridgeResponse {
            source: "chan-1".into(),
            request_id: 7,
            response: Reply::Ack,
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(serde_json::from_value::<PageMessage>(value).unwrap(), response);
    }

    #[test]
    fn test_failure_reply_converts_to_err() {
        let reply = Reply::failure(ScribeError::MissingCredential);
        assert!(!reply.is_success());
        assert_eq!(reply.into_result(), Err(ScribeError::MissingCredential));
        assert_eq!(Reply::Ack.into_result(), Ok(Reply::Ack));
    }
}
