//! Live channel against the fake socket: push-triggered refresh,
//! keepalives, reconnect bound and handshake token refresh.

use larder_client::{ChannelState, Client, UpdateEvent};
use larder_protocol::wire::WireListItem;
use larder_protocol::{HEARTBEAT_FRAME, REFRESH_SHOPPING_LISTS};
use larder_testkit::prelude::*;
use std::time::Duration;
use tokio::time::timeout;

async fn open_client(harness: &TestHarness) -> Client {
    init_tracing();
    let client = harness.client();
    let mut state = client.watch_channel_state();
    client.login().await.unwrap();
    assert!(wait_for_state(&mut state, |s| s.is_open()).await);
    client
}

#[tokio::test]
async fn refresh_frame_refetches_and_notifies_once() {
    let harness = TestHarness::new();
    let client = open_client(&harness).await;
    let mut updates = client.subscribe();

    harness.server.update_data(|data| {
        data.shopping_lists_response.new_lists[1].items.push(WireListItem {
            identifier: "item-9".into(),
            list_id: Some("list-2".into()),
            name: "nails".into(),
            ..Default::default()
        });
    });
    assert!(harness.socket.push_text(REFRESH_SHOPPING_LISTS));

    let event = timeout(WAIT_TIMEOUT, updates.recv()).await.unwrap().unwrap();
    let UpdateEvent::ListsUpdated { lists } = event;
    let hardware = lists.iter().find(|l| l.name() == "Hardware").unwrap();
    assert_eq!(hardware.items()[0].name(), "nails");
    assert_eq!(client.fetch_count(), 1);
    assert_eq!(harness.server.user_data_count(), 1);
    assert!(client.list_by_id("list-2").unwrap().item_by_id("item-9").is_some());

    // Frames are handled in order, so the second refresh proves the ones
    // before it were ignored.
    assert!(harness.socket.push_text("refresh-recipes"));
    assert!(harness.socket.push_text(HEARTBEAT_FRAME));
    assert!(harness.socket.push_text("  refresh-shopping-lists\n"));
    assert!(harness.socket.push_text(REFRESH_SHOPPING_LISTS));
    timeout(WAIT_TIMEOUT, updates.recv()).await.unwrap().unwrap();

    assert_eq!(client.fetch_count(), 2);
    assert!(updates.try_recv().is_none());
    client.teardown().await;
}

#[tokio::test]
async fn every_subscriber_sees_the_update() {
    let harness = TestHarness::new();
    let client = open_client(&harness).await;
    let mut first = client.subscribe();
    let mut second = client.subscribe();
    let dropped = client.subscribe();
    drop(dropped);

    assert!(harness.socket.push_text(REFRESH_SHOPPING_LISTS));

    assert!(timeout(WAIT_TIMEOUT, first.recv()).await.unwrap().is_some());
    assert!(timeout(WAIT_TIMEOUT, second.recv()).await.unwrap().is_some());
    assert_eq!(client.fetch_count(), 1);
    client.teardown().await;
}

#[tokio::test]
async fn heartbeats_stop_on_teardown() {
    let harness = TestHarness::new();
    let client = open_client(&harness).await;

    tokio::time::sleep(Duration::from_millis(180)).await;
    assert!(harness.socket.heartbeat_count() >= 2);

    client.teardown().await;
    let sent = harness.socket.heartbeat_count();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(harness.socket.heartbeat_count(), sent);
    assert_eq!(client.channel_state(), ChannelState::Disconnected);
    assert!(!harness.socket.push_text(REFRESH_SHOPPING_LISTS));
}

#[tokio::test]
async fn failing_transport_gives_up_after_the_bound() {
    init_tracing();
    let harness = TestHarness::new();
    harness.socket.fail_all_connects(true);
    let client = harness.client_with(client_config().with_reconnect(fast_retry(2)));
    let mut state = client.watch_channel_state();

    client.login().await.unwrap();
    timeout(WAIT_TIMEOUT, harness.socket.wait_for_connects(3))
        .await
        .unwrap();
    assert!(wait_for_state(&mut state, |s| *s == ChannelState::Disconnected).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.socket.connect_count(), 3);
    assert_eq!(harness.server.refresh_count(), 2);
    assert_eq!(client.channel_state(), ChannelState::Disconnected);
}

#[tokio::test]
async fn padded_refresh_frame_is_ignored() {
    let harness = TestHarness::new();
    let client = open_client(&harness).await;
    let mut updates = client.subscribe();

    assert!(harness.socket.push_text("  refresh-shopping-lists\n"));
    assert!(harness.socket.push_text("refresh-shopping-lists "));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(updates.try_recv().is_none());
    assert_eq!(client.fetch_count(), 0);
    assert_eq!(harness.server.user_data_count(), 0);
    client.teardown().await;
}

#[tokio::test]
async fn login_after_giving_up_reopens_the_channel() {
    init_tracing();
    let harness = TestHarness::new();
    harness.socket.fail_all_connects(true);
    let client = harness.client_with(client_config().with_reconnect(fast_retry(1)));
    let mut state = client.watch_channel_state();

    client.login().await.unwrap();
    timeout(WAIT_TIMEOUT, harness.socket.wait_for_connects(2))
        .await
        .unwrap();
    assert!(wait_for_state(&mut state, |s| *s == ChannelState::Disconnected).await);
    assert_eq!(harness.socket.connect_count(), 2);

    harness.socket.fail_all_connects(false);
    client.login().await.unwrap();
    assert!(wait_for_state(&mut state, |s| s.is_open()).await);
    assert_eq!(harness.socket.connect_count(), 3);

    // A running channel is kept.
    client.login().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.socket.connect_count(), 3);
    assert!(client.channel_state().is_open());
    client.teardown().await;
}

#[tokio::test]
async fn transient_failures_recover() {
    init_tracing();
    let harness = TestHarness::new();
    harness.socket.fail_next_connects(2);
    let client = harness.client();
    let mut state = client.watch_channel_state();

    client.login().await.unwrap();
    timeout(WAIT_TIMEOUT, harness.socket.wait_for_connects(3))
        .await
        .unwrap();
    assert!(wait_for_state(&mut state, |s| s.is_open()).await);
    assert_eq!(harness.server.refresh_count(), 2);
    client.teardown().await;
}

#[tokio::test]
async fn server_close_reconnects_without_refresh() {
    let harness = TestHarness::new();
    let client = open_client(&harness).await;
    let mut state = client.watch_channel_state();

    assert!(harness.socket.close_connection());
    timeout(WAIT_TIMEOUT, harness.socket.wait_for_connects(2))
        .await
        .unwrap();
    assert!(wait_for_state(&mut state, |s| s.is_open()).await);

    assert_eq!(harness.server.refresh_count(), 0);
    client.teardown().await;
}

#[tokio::test]
async fn expired_token_handshake_refreshes_and_reconnects() {
    let harness = TestHarness::new();
    let client = open_client(&harness).await;
    let mut state = client.watch_channel_state();

    harness.server.expire_access_tokens();
    assert!(harness.socket.close_connection());

    timeout(WAIT_TIMEOUT, harness.socket.wait_for_connects(3))
        .await
        .unwrap();
    assert!(wait_for_state(&mut state, |s| s.is_open()).await);

    assert_eq!(harness.server.refresh_count(), 1);
    let handshakes = harness.socket.handshakes();
    assert_eq!(handshakes.len(), 3);
    assert_eq!(
        handshakes[0].header("authorization"),
        handshakes[1].header("authorization")
    );
    assert_ne!(
        handshakes[1].header("authorization"),
        handshakes[2].header("authorization")
    );
    assert!(handshakes[2].header("x-anyleaf-client-identifier").is_some());
    client.teardown().await;
}
