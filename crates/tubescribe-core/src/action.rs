//! AI actions the panel can request.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Default number of transcript characters submitted with a prompt.
pub const DEFAULT_TRANSCRIPT_BUDGET: usize = 15_000;

/// A user-triggered AI action.
///
/// Every action consumes the cached transcript of the current video as
/// context. `ChatTurn` additionally carries the user's question in the
/// request payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AiAction {
    Summarize,
    Explain,
    Quiz,
    Notes,
    #[strum(to_string = "chat_turn", serialize = "chat")]
    ChatTurn,
}

impl AiAction {
    /// Label used for the panel's busy indicator.
    pub fn progress_label(&self) -> &'static str {
        match self {
            AiAction::Summarize => "Generating summary with AI...",
            AiAction::Explain => "Explaining the video with AI...",
            AiAction::Quiz => "Building a quiz with AI...",
            AiAction::Notes => "Taking notes with AI...",
            AiAction::ChatTurn => "...",
        }
    }

    /// Whether the action needs a user-supplied input besides the transcript.
    pub fn takes_user_input(&self) -> bool {
        matches!(self, AiAction::ChatTurn)
    }
}

/// Returns the longest prefix of `text` holding at most `max_chars` characters.
///
/// Counts `char`s rather than bytes so multi-byte transcripts are never cut
/// inside a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
