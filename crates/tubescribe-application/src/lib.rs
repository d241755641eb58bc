//! Application layer for tubescribe.
//!
//! Each execution context of the extension is a constructor-injected object
//! here: [`MessageRouter`] for the background, [`ContentScript`] for the
//! page, [`PanelController`] for the injected panel and [`Popup`].

pub mod bridge;
pub mod content;
pub mod panel;
pub mod popup;
pub mod prompts;
pub mod registry;
pub mod router;

pub use bridge::{PageSurface, PanelBridge, PendingRequests};
pub use content::{ContentScript, ContentTasks, TranscriptLoader};
pub use panel::{ChatEntry, ChatSender, PanelController, PanelView};
pub use popup::{KeyCheck, Popup, PopupState};
pub use prompts::PromptLibrary;
pub use registry::TabSessionRegistry;
pub use router::{MessageRouter, NavigationOutcome, PendingReply};
