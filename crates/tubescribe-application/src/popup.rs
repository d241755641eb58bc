//! Popup context: credential entry and panel visibility.

use std::sync::Arc;

use tubescribe_core::key_store::{KeyStore, keys, redact};
use tubescribe_core::link::BackgroundLink;
use tubescribe_core::message::{Message, Reply};
use tubescribe_core::tab::TabHost;
use tubescribe_core::watch_url::is_video_site;
use tubescribe_core::{Result, ScribeError, TabId};

/// What the popup shows after opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupState {
    /// No credential stored; the key form is shown.
    NeedsKey,
    /// The panel was requested in this tab.
    PanelShown { tab_id: TabId },
    /// Credential present but the active tab is not on the video site.
    NotVideoPage,
}

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCheck {
    pub valid: bool,
    pub message: String,
}

pub struct Popup {
    host: Arc<dyn TabHost>,
    link: Arc<dyn BackgroundLink>,
    key_store: Arc<dyn KeyStore>,
}

impl Popup {
    pub fn new(
        host: Arc<dyn TabHost>,
        link: Arc<dyn BackgroundLink>,
        key_store: Arc<dyn KeyStore>,
    ) -> Self {
        Self {
            host,
            link,
            key_store,
        }
    }

    /// Shows the panel right away when a credential is already stored.
    pub async fn open(&self) -> Result<PopupState> {
        if self.key_store.api_key().await?.is_none() {
            return Ok(PopupState::NeedsKey);
        }
        let shown = self
            .send_to_active_video_tab(Message::ShowSidepanel { validated: true })
            .await?;
        Ok(shown.map_or(PopupState::NotVideoPage, |tab_id| {
            PopupState::PanelShown { tab_id }
        }))
    }

    /// Validates `api_key` against the provider and, when valid, hands it to
    /// the background and opens the panel.
    pub async fn validate_and_save(&self, api_key: &str) -> Result<KeyCheck> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ScribeError::invalid_request("Please enter an API key"));
        }

        let check = match self
            .link
            .send(Message::ValidateApiKey {
                api_key: api_key.to_string(),
            })
            .await?
            .into_result()?
        {
            Reply::Validation { valid, message } => KeyCheck { valid, message },
            other => {
                return Err(ScribeError::internal(format!(
                    "unexpected reply to VALIDATE_API_KEY: {:?}",
                    other
                )));
            }
        };
        if !check.valid {
            tracing::info!("[Popup] Key {} rejected", redact(api_key));
            return Ok(check);
        }

        self.link
            .send(Message::ApiKeyUpdated {
                api_key: api_key.to_string(),
            })
            .await?
            .into_result()?;

        if let Err(err) = self
            .send_to_active_video_tab(Message::ShowSidepanel { validated: true })
            .await
        {
            tracing::warn!("[Popup] Could not show panel after saving key: {}", err);
        }
        Ok(check)
    }

    /// Persists the visibility preference and applies it to the active tab.
    pub async fn toggle_panel(&self, visible: bool) -> Result<Option<TabId>> {
        self.key_store
            .set_flag(keys::TRANSCRIPT_PANEL_VISIBLE, visible)
            .await?;
        self.send_to_active_video_tab(Message::ToggleTranscriptPanel { visible })
            .await
    }

    /// Delivers `message` to the content script of the active tab, injecting
    /// the script first if it is not there yet.
    ///
    /// Returns `None` when the active tab is not on the video site.
    async fn send_to_active_video_tab(&self, message: Message) -> Result<Option<TabId>> {
        let Some(tab_id) = self.host.active_tab().await else {
            return Ok(None);
        };
        let on_video_site = self
            .host
            .tab_url(tab_id)
            .await
            .is_some_and(|url| is_video_site(&url));
        if !on_video_site {
            return Ok(None);
        }

        match self.host.send_message(tab_id, message.clone()).await {
            Err(err) if err.is_no_listener() => {
                tracing::info!("[Popup] Injecting content script into tab {}", tab_id);
                self.host.inject_content_script(tab_id).await?;
                self.host.send_message(tab_id, message).await?.into_result()?;
            }
            other => {
                other?.into_result()?;
            }
        }
        Ok(Some(tab_id))
    }
}
