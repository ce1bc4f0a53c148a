// flowdeck-client/tests/session_lifecycle.rs
// Credential storage and session binding tests (no network)

use flowdeck_client::{
    CREDENTIAL_FILE, ClientConfig, ClientError, CredentialStorage, Credentials, Role, Session,
};
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> ClientConfig {
    ClientConfig::new("http://localhost:8008").with_auth_dir(dir.path())
}

#[tokio::test]
async fn test_credential_storage_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let storage = CredentialStorage::new(temp_dir.path(), CREDENTIAL_FILE);

    assert!(!storage.exists());
    assert!(!storage.is_authenticated());

    // Test save and load
    let credentials = Credentials::new("alice", "pw", "http://host:8008")
        .with_token("jwt-token")
        .with_role(Role::Op);
    storage.save(&credentials).unwrap();
    assert!(storage.exists());
    assert!(storage.is_authenticated());

    let loaded = storage.load().unwrap();
    assert_eq!(loaded.username, "alice");
    assert_eq!(loaded.token.as_deref(), Some("jwt-token"));
    assert_eq!(loaded.role, Some(Role::Op));
    assert_eq!(loaded, credentials);

    // Test delete, twice (second must be a no-op)
    storage.delete().unwrap();
    assert!(!storage.exists());
    assert!(storage.load().is_none());
    storage.delete().unwrap();
}

#[tokio::test]
async fn test_corrupt_record_reads_as_absent() {
    let temp_dir = TempDir::new().unwrap();
    let storage = CredentialStorage::new(temp_dir.path(), CREDENTIAL_FILE);

    storage.ensure_dir().unwrap();
    std::fs::write(storage.path(), "{ not json").unwrap();

    assert!(storage.exists());
    assert!(storage.load().is_none());
    assert!(!storage.is_authenticated());
}

#[tokio::test]
async fn test_client_requires_stored_credentials() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::new(test_config(&temp_dir));

    assert!(!session.is_authenticated());
    let err = session.client().unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn test_session_binds_to_stored_credentials() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::new(test_config(&temp_dir));

    let alice = Credentials::new("alice", "pw", "http://host:8008");
    session.storage().save(&alice).unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.username().as_deref(), Some("alice"));

    let header = session.client().unwrap().auth_header().map(str::to_string);
    assert_eq!(header.as_deref(), Some("Basic YWxpY2U6cHc="));
}

#[tokio::test]
async fn test_session_rebinds_on_user_change() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::new(test_config(&temp_dir));

    let alice = Credentials::new("alice", "pw", "http://host:8008");
    session.storage().save(&alice).unwrap();
    let alice_header = session.client().unwrap().auth_header().map(str::to_string);

    // A different user lands in storage behind the session's back
    let bob = Credentials::new("bob", "pw", "http://host:8008");
    session.storage().save(&bob).unwrap();

    let bob_header = session.client().unwrap().auth_header().map(str::to_string);
    assert_eq!(bob_header.as_deref(), Some(bob.authorization_value().as_str()));
    assert_ne!(alice_header, bob_header);

    // The rebind sticks: the same binding serves follow-up calls
    let again = session.client().unwrap().auth_header().map(str::to_string);
    assert_eq!(again, bob_header);
}

#[tokio::test]
async fn test_session_rebinds_on_token_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::new(test_config(&temp_dir));

    let basic = Credentials::new("alice", "pw", "http://host:8008");
    session.storage().save(&basic).unwrap();
    let before = session.client().unwrap().auth_header().map(str::to_string);
    assert_eq!(before.as_deref(), Some("Basic YWxpY2U6cHc="));

    // Same user gains a token; the bound header must not go stale
    let with_token = basic.clone().with_token("fresh-jwt");
    session.storage().save(&with_token).unwrap();

    let after = session.client().unwrap().auth_header().map(str::to_string);
    assert_eq!(after.as_deref(), Some("Bearer fresh-jwt"));
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::new(test_config(&temp_dir));

    let alice = Credentials::new("alice", "pw", "http://host:8008");
    session.storage().save(&alice).unwrap();
    session.client().unwrap();

    session.reset();
    session.reset();

    // Credentials survive a reset; the binding is rebuilt on demand
    assert!(session.is_authenticated());
    assert!(session.client().is_ok());
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::new(test_config(&temp_dir));

    let alice = Credentials::new("alice", "pw", "http://host:8008").with_role(Role::Admin);
    session.storage().save(&alice).unwrap();
    session.client().unwrap();
    assert_eq!(session.role(), Some(Role::Admin));

    session.logout();
    assert!(!session.is_authenticated());
    assert!(!session.storage().exists());
    assert_eq!(session.role(), None);
    assert!(matches!(session.client(), Err(ClientError::Unauthorized)));

    // Logging out again is harmless
    session.logout();
}
