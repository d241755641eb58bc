use async_trait::async_trait;

use crate::TabId;
use crate::error::Result;
use crate::message::{Message, Reply};

/// Browser primitives the background and popup use to reach a tab.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Fire-and-check delivery of one message to the tab's content context.
    ///
    /// Fails with `ScribeError::NoListener` when no content context is
    /// listening in the tab. No retry happens at this level.
    async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Reply>;

    /// Injects the content script into the tab. Injecting into a tab that
    /// already runs it is a no-op for the page.
    async fn inject_content_script(&self, tab_id: TabId) -> Result<()>;

    /// Current URL of the tab, `None` if the tab does not exist.
    async fn tab_url(&self, tab_id: TabId) -> Option<String>;

    /// Tab focused in the current window.
    async fn active_tab(&self) -> Option<TabId>;
}
