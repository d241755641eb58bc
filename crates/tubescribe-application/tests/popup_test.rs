mod common;

use std::sync::Arc;

use common::{MockTabHost, RecordingGateway, RouterLink, watch};
use tubescribe_application::MessageRouter;
use tubescribe_application::popup::{Popup, PopupState};
use tubescribe_core::config::RouterConfig;
use tubescribe_core::gateway::AiGateway;
use tubescribe_core::key_store::{KeyStore, keys};
use tubescribe_infrastructure::{InMemoryKeyStore, MemoryClipboard};

struct Setup {
    popup: Popup,
    host: Arc<MockTabHost>,
    gateway: Arc<RecordingGateway>,
    key_store: Arc<InMemoryKeyStore>,
}

fn setup(active_url: &str) -> Setup {
    let host = MockTabHost::new(true);
    host.open_tab(3, active_url);
    let gateway = Arc::new(RecordingGateway::default());
    let key_store = Arc::new(InMemoryKeyStore::new());
    let router = MessageRouter::new(
        host.clone(),
        gateway.clone(),
        key_store.clone(),
        Arc::new(MemoryClipboard::new()),
        RouterConfig::default(),
    );
    let popup = Popup::new(host.clone(), RouterLink::new(router, None), key_store.clone());
    Setup {
        popup,
        host,
        gateway,
        key_store,
    }
}

#[tokio::test]
async fn test_open_without_key_asks_for_one() {
    let setup = setup(&watch("abc123"));
    assert_eq!(setup.popup.open().await.unwrap(), PopupState::NeedsKey);
    assert!(setup.host.delivered().is_empty());
}

#[tokio::test]
async fn test_valid_key_is_saved_and_panel_shown() {
    let setup = setup(&watch("abc123"));

    let check = setup.popup.validate_and_save("  AIzaGood  ").await.unwrap();
    assert!(check.valid);

    assert_eq!(
        setup.key_store.get(keys::API_KEY).await.unwrap().as_deref(),
        Some("AIzaGood")
    );
    assert_eq!(setup.gateway.credential().await.as_deref(), Some("AIzaGood"));
    // The content script was missing, so it got injected before the panel request.
    assert_eq!(setup.host.injections(), vec![3]);
    assert_eq!(setup.host.deliveries_of("SHOW_SIDEPANEL"), 1);

    assert_eq!(
        setup.popup.open().await.unwrap(),
        PopupState::PanelShown { tab_id: 3 }
    );
    assert_eq!(setup.host.injections().len(), 1);
}

#[tokio::test]
async fn test_invalid_key_is_not_saved() {
    let setup = setup(&watch("abc123"));

    let check = setup.popup.validate_and_save("wrong").await.unwrap();
    assert!(!check.valid);
    assert!(check.message.contains("Invalid API key"));

    assert_eq!(setup.key_store.get(keys::API_KEY).await.unwrap(), None);
    assert!(setup.host.delivered().is_empty());
}

#[tokio::test]
async fn test_blank_key_is_rejected_locally() {
    let setup = setup(&watch("abc123"));
    let err = setup.popup.validate_and_save("   ").await.unwrap_err();
    assert!(matches!(
        err,
        tubescribe_core::ScribeError::InvalidRequest { .. }
    ));
}

#[tokio::test]
async fn test_toggle_outside_video_site_only_stores_preference() {
    let setup = setup("https://example.com/");

    assert_eq!(setup.popup.toggle_panel(true).await.unwrap(), None);
    assert!(
        setup
            .key_store
            .get_flag(keys::TRANSCRIPT_PANEL_VISIBLE)
            .await
            .unwrap()
    );
    assert!(setup.host.injections().is_empty());
}

#[tokio::test]
async fn test_open_on_other_site_with_key() {
    let setup = setup("https://example.com/");
    setup.key_store.set(keys::API_KEY, "AIzaStored").await.unwrap();
    assert_eq!(setup.popup.open().await.unwrap(), PopupState::NotVideoPage);
}
