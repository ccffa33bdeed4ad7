use std::time::{SystemTime, UNIX_EPOCH};

use smartwayz_client::{CredentialPair, KeyringTokenStore, StoredSession, TokenStore};
use smartwayz_core::{Role, UserId, UserProfile};

const TEST_SERVICE: &str = "smartwayz-keyring-integration-tests";

fn unique_account(label: &str) -> String {
    format!(
        "{label}-{}-{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos()
    )
}

#[test]
fn keyring_round_trip_save_load_clear() {
    let store = KeyringTokenStore::new(TEST_SERVICE, unique_account("session"));
    store.clear().expect("cleanup before test should succeed");

    let session = StoredSession::new(
        CredentialPair::new("access-token-test", "refresh-token-test"),
        Some(UserProfile {
            id: UserId(42),
            email: "integration@example.com".to_string(),
            role: Role::Citizen,
            name: Some("Integration Citizen".to_string()),
            authority_name: None,
        }),
    );

    store
        .save(&session)
        .expect("saving session in keyring should succeed");
    assert_eq!(
        store.load().expect("loading from keyring should succeed"),
        Some(session)
    );

    store.clear().expect("clearing keyring should succeed");
    assert_eq!(store.load().expect("loading after clear should succeed"), None);
}

#[test]
fn separate_prefixes_do_not_share_sessions() {
    let first = KeyringTokenStore::new(TEST_SERVICE, unique_account("first"));
    let second = KeyringTokenStore::new(TEST_SERVICE, unique_account("second"));

    first
        .save(&StoredSession::new(
            CredentialPair::new("first-access", "first-refresh"),
            None,
        ))
        .expect("saving first session should succeed");

    assert_eq!(second.load().expect("loading second should succeed"), None);

    first.clear().expect("clearing first should succeed");
    second.clear().expect("clearing second should succeed");
}
