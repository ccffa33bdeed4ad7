mod support;

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use smartwayz_client::{
    AuthSessionManager, ClientError, CredentialPair, MemoryTokenStore, RefreshPhase,
    ResourceApi, SessionClient, SessionStatus, StoredSession, TokenStore,
};
use smartwayz_core::Role;
use support::{FakeBackend, RecordingListener, RefreshOutcome, api_config};
use tokio::task::JoinSet;

type Client = SessionClient<Arc<FakeBackend>, Arc<MemoryTokenStore>>;

fn expired_session() -> StoredSession {
    StoredSession::new(CredentialPair::new("expired-access", "refresh-1"), None)
}

fn client_with(backend: &Arc<FakeBackend>, listener: &Arc<RecordingListener>) -> (Arc<Client>, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let client = SessionClient::new(&api_config(), Arc::clone(backend), Arc::clone(&store))
        .expect("valid config")
        .with_listener(listener.clone());
    client
        .install_session(expired_session())
        .expect("install session");
    (Arc::new(client), store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_401s_share_a_single_refresh() {
    let backend = Arc::new(
        FakeBackend::new("fresh-access")
            .with_refresh_outcomes(vec![RefreshOutcome::Issue("fresh-access")]),
    );
    let listener = Arc::new(RecordingListener::default());
    let (client, store) = client_with(&backend, &listener);

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        tasks.spawn(async move { client.get::<Value>("/reports/").await });
    }

    while let Some(joined) = tasks.join_next().await {
        joined
            .expect("task should not panic")
            .expect("every caller should succeed after the refresh");
    }

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(client.refresh_phase(), RefreshPhase::Idle);
    assert_eq!(client.access_token().as_deref(), Some("fresh-access"));
    let saved = store.load().expect("load").expect("session kept");
    assert_eq!(saved.credentials.access, "fresh-access");
    assert!(listener.reasons().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_refresh_rejects_every_waiter_and_logs_out_once() {
    let backend = Arc::new(
        FakeBackend::new("never-issued").with_refresh_outcomes(vec![RefreshOutcome::Reject]),
    );
    let listener = Arc::new(RecordingListener::default());
    let (client, store) = client_with(&backend, &listener);

    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let client = Arc::clone(&client);
        tasks.spawn(async move { client.get::<Value>("/reports/").await });
    }

    while let Some(joined) = tasks.join_next().await {
        let err = joined
            .expect("task should not panic")
            .expect_err("every caller should fail");
        assert!(matches!(err, ClientError::SessionExpired { .. }), "got {err:?}");
    }

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(client.refresh_phase(), RefreshPhase::LoggedOut);
    assert_eq!(client.session(), None);
    assert_eq!(store.load().expect("load"), None);
    assert_eq!(listener.reasons(), vec!["Token is invalid or expired".to_owned()]);

    let err = client
        .get::<Value>("/reports/")
        .await
        .expect_err("logged out clients fail fast");
    assert!(err.is_session_expired());
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_refresher_hands_the_refresh_to_a_waiter() {
    let backend = Arc::new(
        FakeBackend::new("fresh-access")
            .with_refresh_delay(Duration::from_millis(300))
            .with_refresh_outcomes(vec![RefreshOutcome::Issue("fresh-access")]),
    );
    let listener = Arc::new(RecordingListener::default());
    let (client, _store) = client_with(&backend, &listener);

    let owner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get::<Value>("/reports/").await })
    };
    while backend.refresh_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let waiter = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get::<Value>("/reports/").await })
    };
    while backend.requests_to("/reports/") < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.refresh_phase(), RefreshPhase::Refreshing);

    owner.abort();
    assert!(owner.await.is_err(), "owner should be cancelled");

    waiter
        .await
        .expect("waiter should not panic")
        .expect("waiter should finish the refresh itself");
    assert_eq!(backend.refresh_calls(), 2);
    assert_eq!(client.refresh_phase(), RefreshPhase::Idle);
}

#[tokio::test]
async fn public_endpoints_ignore_the_session() {
    let backend = Arc::new(FakeBackend::new("fresh-access"));
    let listener = Arc::new(RecordingListener::default());
    let (client, _store) = client_with(&backend, &listener);

    let categories = ResourceApi::new(client.as_ref())
        .list_categories()
        .await
        .expect("categories are public");

    assert_eq!(categories.len(), 2);
    assert_eq!(backend.requests()[0].bearer_token(), None);
    assert_eq!(backend.refresh_calls(), 0);
}

#[tokio::test]
async fn full_session_lifecycle_against_the_backend() {
    let backend = Arc::new(
        FakeBackend::new("access-1")
            .with_refresh_delay(Duration::from_millis(1))
            .with_refresh_outcomes(vec![RefreshOutcome::Issue("access-2")]),
    );
    let store = Arc::new(MemoryTokenStore::new());
    let manager = AuthSessionManager::new(&api_config(), Arc::clone(&backend), Arc::clone(&store))
        .expect("valid config");

    assert_eq!(manager.restore().await.status, SessionStatus::Anonymous);
    assert!(matches!(
        manager.require_authenticated(),
        Err(ClientError::NotAuthenticated)
    ));

    manager
        .login("Juan@Example.com", "correct-horse", Role::Citizen)
        .await
        .expect("login");
    let client = manager.require_authenticated().expect("signed in");
    let api = ResourceApi::new(client.as_ref());

    assert!(api.list_reports(&Default::default()).await.expect("reports").is_empty());

    backend.expire_access("rotated-elsewhere");
    assert!(api.list_reports(&Default::default()).await.expect("reports after refresh").is_empty());
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(manager.session().status, SessionStatus::Authenticated);

    manager.logout().await;
    manager.logout().await;

    assert_eq!(backend.requests_to("/auth/logout/"), 1);
    assert_eq!(store.load().expect("load"), None);
    assert_eq!(manager.session().status, SessionStatus::Anonymous);
    let err = api
        .list_reports(&Default::default())
        .await
        .expect_err("signed out");
    assert!(err.is_session_expired());
}
