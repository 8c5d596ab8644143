//! Session lifecycle against the fake service: token fetch, single-flight
//! refresh, the refresh ladder and credential persistence.

use larder_client::{ClientError, RequestBody, USER_DATA_PATH};
use larder_core::crypto;
use larder_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn login_fetches_tokens_once() {
    init_tracing();
    let harness = TestHarness::new();
    let client = harness.client();

    client.session().establish().await.unwrap();
    client.session().establish().await.unwrap();

    assert_eq!(harness.server.token_fetch_count(), 1);
    assert_eq!(client.session().user_id().as_deref(), Some(USER_ID));
    assert!(client.session().client_id().is_some());
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
    init_tracing();
    let harness =
        TestHarness::with_server(FakeServer::new(sample_user_data()).with_latency(Duration::from_millis(20)));
    let client = harness.client();
    client.session().establish().await.unwrap();
    let generation = client.session().token_generation();

    harness.server.expire_access_tokens();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let session = Arc::clone(client.session());
        tasks.spawn(async move {
            session
                .authenticated_request(USER_DATA_PATH, RequestBody::Empty)
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        let response = result.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }

    assert_eq!(harness.server.refresh_count(), 1);
    assert_eq!(harness.server.token_fetch_count(), 1);
    assert_eq!(harness.server.user_data_count(), 8);
    assert_eq!(client.session().token_generation(), generation + 1);
}

#[tokio::test]
async fn rejected_refresh_falls_back_to_credentials() {
    init_tracing();
    let harness = TestHarness::new();
    let client = harness.client();
    client.session().establish().await.unwrap();

    harness.server.expire_access_tokens();
    harness.server.revoke_refresh_tokens();

    let lists = client.lists(true).await.unwrap();
    assert_eq!(lists.len(), 2);
    assert_eq!(harness.server.refresh_count(), 0);
    assert_eq!(harness.server.token_fetch_count(), 2);
}

#[tokio::test]
async fn wrong_password_fails_login() {
    init_tracing();
    let harness = TestHarness::with_server(
        FakeServer::new(sample_user_data()).with_account(EMAIL, "another password", USER_ID),
    );
    let client = harness.client();

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
    assert!(!err.is_retryable());
    assert_eq!(harness.socket.connect_count(), 0);
}

#[tokio::test]
async fn saved_credentials_skip_the_fetch() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let harness = TestHarness::new();

    let first = harness.client_with(persistent_config(dir.path()));
    first.session().establish().await.unwrap();
    first.lists(false).await.unwrap();

    let second = harness.client_with(persistent_config(dir.path()));
    second.session().establish().await.unwrap();
    second.lists(false).await.unwrap();

    assert_eq!(harness.server.token_fetch_count(), 1);
    assert_eq!(first.session().client_id(), second.session().client_id());
    assert_eq!(harness.server.client_ids().len(), 1);
}

#[tokio::test]
async fn refreshed_tokens_are_persisted() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let harness = TestHarness::new();

    let first = harness.client_with(persistent_config(dir.path()));
    first.session().establish().await.unwrap();
    harness.server.expire_access_tokens();
    first.lists(false).await.unwrap();
    assert_eq!(harness.server.refresh_count(), 1);

    // The rotated pair is on disk, so a new client works without a fetch.
    let second = harness.client_with(persistent_config(dir.path()));
    second.session().establish().await.unwrap();
    second.lists(false).await.unwrap();
    assert_eq!(harness.server.token_fetch_count(), 1);
}

#[tokio::test]
async fn corrupt_credentials_file_falls_back_to_fetch() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, b"{\"iv\":\"zz\",\"cipher\":\"not hex\"}").unwrap();

    let harness = TestHarness::new();
    let client = harness.client_with(persistent_config(dir.path()));
    client.session().establish().await.unwrap();

    assert_eq!(harness.server.token_fetch_count(), 1);
    let record = crypto::decrypt(&std::fs::read(&path).unwrap(), PASSWORD).unwrap();
    assert!(record.has_tokens());
    assert_eq!(record.client_id, client.session().client_id());
}

#[tokio::test]
async fn credentials_file_is_not_readable_with_another_password() {
    let dir = TempDir::new().unwrap();
    let harness = TestHarness::new();
    let client = harness.client_with(persistent_config(dir.path()));
    client.session().establish().await.unwrap();

    let blob = std::fs::read(dir.path().join("credentials.json")).unwrap();
    assert!(crypto::decrypt(&blob, "not the password").is_err());
    assert!(!String::from_utf8_lossy(&blob).contains("access."));
}

#[tokio::test]
async fn login_opens_the_channel_and_teardown_closes_it() {
    init_tracing();
    let harness = TestHarness::new();
    let client = harness.client();
    let mut state = client.watch_channel_state();

    client.login().await.unwrap();
    assert!(wait_for_state(&mut state, |s| s.is_open()).await);
    assert_eq!(harness.socket.connect_count(), 1);

    client.teardown().await;
    client.teardown().await;
    assert_eq!(client.channel_state(), larder_client::ChannelState::Disconnected);
}
