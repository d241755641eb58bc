mod common;

use std::sync::Arc;

use common::{MockTabHost, RecordingGateway, router_with, watch};
use tubescribe_application::NavigationOutcome;
use tubescribe_core::gateway::AiGateway;
use tubescribe_core::message::{Message, Reply};
use tubescribe_core::port::{CONTENT_PORT_NAME, port_pair};
use tubescribe_core::tab::ReceiverState;
use tubescribe_core::{ScribeError, TabId};

const TAB: TabId = 5;

#[tokio::test(start_paused = true)]
async fn test_missing_content_script_is_injected_once_and_resent_once() {
    let host = MockTabHost::new(true);
    host.open_tab(TAB, &watch("abc123"));
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    let outcome = router
        .on_navigation_complete(TAB, &watch("abc123"))
        .await
        .unwrap();

    assert_eq!(outcome, NavigationOutcome::DeliveredAfterInject);
    assert_eq!(host.injections(), vec![TAB]);
    assert_eq!(host.deliveries_of("NEW_VIDEO_LOADED"), 1);

    let session = router.registry().get(TAB).await.unwrap();
    assert_eq!(session.receiver, ReceiverState::ReceiverReady);
    assert_eq!(session.delivered_video_id.as_deref(), Some("abc123"));

    // Same video again: nothing sent, nothing injected.
    let outcome = router
        .on_navigation_complete(TAB, &watch("abc123"))
        .await
        .unwrap();
    assert_eq!(outcome, NavigationOutcome::Unchanged);
    assert_eq!(host.injections().len(), 1);
    assert_eq!(host.deliveries_of("NEW_VIDEO_LOADED"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_credential_is_resent_before_the_video_after_injection() {
    let host = MockTabHost::new(true);
    let router = router_with(host.clone(), RecordingGateway::with_credential("AIzaTest"));

    router
        .on_navigation_complete(TAB, &watch("abc123"))
        .await
        .unwrap();

    let kinds: Vec<_> = host.delivered().iter().map(|(_, m)| m.kind()).collect();
    assert_eq!(kinds, vec!["API_KEY_UPDATED", "NEW_VIDEO_LOADED"]);
}

#[tokio::test(start_paused = true)]
async fn test_late_handshake_replays_the_video_exactly_once() {
    let host = MockTabHost::new(false);
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    let outcome = router
        .on_navigation_complete(TAB, &watch("abc123"))
        .await
        .unwrap();
    assert_eq!(outcome, NavigationOutcome::AwaitingHandshake);
    assert_eq!(host.injections(), vec![TAB]);

    let (port, mut receiver) = port_pair(CONTENT_PORT_NAME, None);
    assert_eq!(router.on_handshake(TAB, &port).await.unwrap(), 1);
    assert_eq!(receiver.recv().await, Some(Message::new_video("abc123")));

    // A reconnect of the same content script does not replay again.
    assert_eq!(router.on_handshake(TAB, &port).await.unwrap(), 0);
    assert!(receiver.try_recv().is_err());
    assert_eq!(host.deliveries_of("NEW_VIDEO_LOADED"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_during_settle_delay_wins_the_delivery() {
    let host = MockTabHost::new(true);
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    let navigation = {
        let router = router.clone();
        tokio::spawn(async move { router.on_navigation_complete(TAB, &watch("abc123")).await })
    };
    host.injected.notified().await;

    let (port, mut receiver) = port_pair(CONTENT_PORT_NAME, None);
    assert_eq!(router.on_handshake(TAB, &port).await.unwrap(), 1);

    let outcome = navigation.await.unwrap().unwrap();
    assert_eq!(outcome, NavigationOutcome::AlreadyDelivered);
    assert_eq!(receiver.recv().await, Some(Message::new_video("abc123")));
    assert_eq!(host.deliveries_of("NEW_VIDEO_LOADED"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tab_closed_during_settle_delay_abandons_resend() {
    let host = MockTabHost::new(true);
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    let navigation = {
        let router = router.clone();
        tokio::spawn(async move { router.on_navigation_complete(TAB, &watch("abc123")).await })
    };
    host.injected.notified().await;
    assert!(router.on_tab_closed(TAB).await);

    let outcome = navigation.await.unwrap().unwrap();
    assert_eq!(outcome, NavigationOutcome::Abandoned);
    assert!(host.delivered().is_empty());
    assert!(!router.registry().contains(TAB).await);
}

#[tokio::test(start_paused = true)]
async fn test_events_arriving_after_close_do_not_recreate_the_session() {
    let host = MockTabHost::new(true);
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    assert!(!router.on_tab_closed(TAB).await);

    let outcome = router
        .on_navigation_complete(TAB, &watch("abc123"))
        .await
        .unwrap();
    assert_eq!(outcome, NavigationOutcome::Abandoned);

    let (port, mut receiver) = port_pair(CONTENT_PORT_NAME, None);
    assert_eq!(router.on_handshake(TAB, &port).await.unwrap(), 0);
    assert!(receiver.try_recv().is_err());

    assert!(host.injections().is_empty());
    assert!(host.delivered().is_empty());
    assert!(router.registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_an_earlier_video_delivers_it_again() {
    let host = MockTabHost::new(true);
    host.set_listening(TAB);
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    for video in ["abc123", "def456", "abc123"] {
        let outcome = router
            .on_navigation_complete(TAB, &watch(video))
            .await
            .unwrap();
        assert_eq!(outcome, NavigationOutcome::Delivered);
    }
    assert_eq!(host.deliveries_of("NEW_VIDEO_LOADED"), 3);
    assert!(host.injections().is_empty());
}

#[tokio::test]
async fn test_non_watch_pages_are_not_tracked() {
    let host = MockTabHost::new(true);
    let router = router_with(host.clone(), Arc::new(RecordingGateway::default()));

    let outcome = router
        .on_navigation_complete(TAB, "https://www.youtube.com/feed/subscriptions")
        .await
        .unwrap();
    assert_eq!(outcome, NavigationOutcome::NotWatchPage);
    assert!(router.registry().is_empty().await);
}

#[tokio::test]
async fn test_intent_replies_arrive_through_pending_handle() {
    let host = MockTabHost::new(true);
    let gateway = RecordingGateway::with_credential("AIzaTest");
    let router = router_with(host, gateway.clone());

    let reply = router
        .on_intent_message(Some(TAB), Message::GetTabId)
        .wait()
        .await;
    assert_eq!(reply, Reply::TabId { tab_id: TAB });

    let reply = router
        .on_intent_message(
            None,
            Message::MakeApiCall {
                endpoint: "streamGenerateContent".into(),
                payload: Default::default(),
            },
        )
        .wait()
        .await;
    assert!(matches!(
        reply,
        Reply::Failure {
            error: ScribeError::InvalidRequest { .. }
        }
    ));
    assert!(gateway.requests().is_empty());

    let reply = router
        .on_intent_message(None, Message::GetTranscript)
        .wait()
        .await;
    assert_eq!(
        reply,
        Reply::failure(ScribeError::unknown_action("GET_TRANSCRIPT"))
    );
}

#[tokio::test]
async fn test_validation_reports_invalid_key_without_storing_it() {
    let host = MockTabHost::new(true);
    let gateway = Arc::new(RecordingGateway::default());
    let router = router_with(host, gateway.clone());

    let reply = router
        .on_intent_message(
            None,
            Message::ValidateApiKey {
                api_key: "nope".into(),
            },
        )
        .wait()
        .await;

    match reply {
        Reply::Validation { valid, message } => {
            assert!(!valid);
            assert!(message.starts_with("Invalid API key"));
        }
        other => panic!("unexpected reply {:?}", other),
    }
    assert_eq!(gateway.credential().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_credential_update_is_queued_for_tabs_without_listener() {
    let host = MockTabHost::new(false);
    let gateway = Arc::new(RecordingGateway::default());
    let router = router_with(host.clone(), gateway.clone());

    host.set_listening(1);
    router.on_navigation_complete(1, &watch("abc123")).await.unwrap();
    router.on_navigation_complete(2, &watch("def456")).await.unwrap();

    let reply = router
        .on_intent_message(
            None,
            Message::ApiKeyUpdated {
                api_key: "AIzaNew".into(),
            },
        )
        .wait()
        .await;
    assert_eq!(reply, Reply::Ack);

    assert_eq!(gateway.credential().await.as_deref(), Some("AIzaNew"));
    assert_eq!(host.deliveries_of("API_KEY_UPDATED"), 1);

    let (port, mut receiver) = port_pair(CONTENT_PORT_NAME, None);
    assert_eq!(router.on_handshake(2, &port).await.unwrap(), 2);
    assert_eq!(receiver.recv().await, Some(Message::new_video("def456")));
    assert_eq!(
        receiver.recv().await,
        Some(Message::ApiKeyUpdated {
            api_key: "AIzaNew".into()
        })
    );
}
