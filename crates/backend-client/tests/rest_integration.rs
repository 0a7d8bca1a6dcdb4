//! Integration tests for the hosted backend client
//!
//! These tests use wiremock to stand in for the auth and row endpoints and
//! exercise the full request/response cycle, error mapping, and session
//! bookkeeping.

use backend_client::session_store::SessionStore;
use backend_client::{
    AuthChangeEvent, AuthService, BackendConfig, HostedBackend, NewProfile, ProfileStore, Role,
    Session, StoreError, User, UserMetadata,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";

fn session_body(user_id: &str) -> serde_json::Value {
    json!({
        "access_token": format!("{}_access", user_id),
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("{}_refresh", user_id),
        "user": {
            "id": user_id,
            "email": "alice@example.com",
            "user_metadata": { "full_name": "Alice" }
        }
    })
}

fn profile_body(user_id: &str) -> serde_json::Value {
    json!({
        "id": user_id,
        "full_name": "Alice",
        "role": "supervisor",
        "organization": "Central Water Commission",
        "location": "Guwahati",
        "site_id": null,
        "created_at": "2025-10-02T08:30:00Z",
        "is_active": true
    })
}

fn backend(server: &MockServer) -> HostedBackend {
    HostedBackend::new(BackendConfig::new(server.uri(), ANON_KEY)).unwrap()
}

async fn mount_password_login(server: &MockServer, user_id: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body(user_id)))
        .mount(server)
        .await;
}

// =============================================================================
// Auth endpoints
// =============================================================================

#[tokio::test]
async fn test_sign_in_with_password_establishes_session() {
    let server = MockServer::start().await;
    mount_password_login(&server, "user-1").await;

    let backend = backend(&server);
    let mut sub = backend.subscribe();

    let session = backend
        .sign_in_with_password("alice@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(session.user_id(), "user-1");
    assert!(session.expires_at.is_some());

    let change = sub.recv().await.unwrap();
    assert_eq!(change.event, AuthChangeEvent::SignedIn);
    assert_eq!(change.session.as_ref().map(|s| s.user_id()), Some("user-1"));

    let current = backend.get_current_session().await.unwrap();
    assert_eq!(current, Some(session));
}

#[tokio::test]
async fn test_sign_in_failure_keeps_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let err = backend
        .sign_in_with_password("alice@example.com", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.message, "Invalid login credentials");
    assert_eq!(err.status, Some(400));
    assert!(backend.get_current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_pending_confirmation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({
            "email": "new@x.com",
            "data": { "full_name": "New User", "role": "public" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-9",
            "email": "new@x.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = UserMetadata {
        full_name: Some("New User".to_string()),
        role: Some(Role::Public),
        ..UserMetadata::default()
    };

    let backend = backend(&server);
    let session = backend.sign_up("new@x.com", "pw", &metadata).await.unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn test_sign_up_with_auto_confirm_returns_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-2")))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let session = backend
        .sign_up("new@x.com", "pw", &UserMetadata::default())
        .await
        .unwrap();
    assert_eq!(session.map(|s| s.user.id), Some("user-2".to_string()));
}

#[tokio::test]
async fn test_otp_request_and_verify() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/otp"))
        .and(body_partial_json(json!({ "email": "new@x.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(body_partial_json(json!({
            "type": "email",
            "email": "new@x.com",
            "token": "123456"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-3")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend.sign_in_with_otp("new@x.com").await.unwrap();
    let session = backend.verify_otp("new@x.com", "123456").await.unwrap();
    assert_eq!(session.user_id(), "user-3");
}

#[tokio::test]
async fn test_verify_otp_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": 403,
            "error_code": "otp_expired",
            "msg": "Token has expired or is invalid"
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let err = backend.verify_otp("new@x.com", "000000").await.unwrap_err();
    assert_eq!(err.to_string(), "Token has expired or is invalid");
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let server = MockServer::start().await;
    mount_password_login(&server, "user-1").await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("Authorization", "Bearer user-1_access"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend
        .sign_in_with_password("alice@example.com", "secret")
        .await
        .unwrap();

    let mut sub = backend.subscribe();
    backend.sign_out().await.unwrap();

    let change = sub.recv().await.unwrap();
    assert_eq!(change.event, AuthChangeEvent::SignedOut);
    assert!(change.session.is_none());
    assert!(backend.get_current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_out_with_dead_token_still_clears() {
    let server = MockServer::start().await;
    mount_password_login(&server, "user-1").await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend
        .sign_in_with_password("alice@example.com", "secret")
        .await
        .unwrap();

    backend.sign_out().await.unwrap();
    assert!(backend.get_current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_persisted_session_is_refreshed() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let session_path = temp_dir.path().join("session.json");

    let expired = Session {
        access_token: "old_access".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: Some(1),
        refresh_token: "old_refresh".to_string(),
        user: User::new("user-1", Some("alice@example.com".to_string())),
    };
    SessionStore::with_path(&session_path)
        .save(Some(expired))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(json!({ "refresh_token": "old_refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-1")))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig::new(server.uri(), ANON_KEY).with_session_path(&session_path);
    let backend = HostedBackend::new(config).unwrap();

    let session = backend.get_current_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "user-1_access");
}

#[tokio::test]
async fn test_rejected_refresh_discards_session() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let session_path = temp_dir.path().join("session.json");

    let mut expired: Session = serde_json::from_value(session_body("user-1")).unwrap();
    expired.expires_at = Some(1);
    SessionStore::with_path(&session_path)
        .save(Some(expired))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "refresh_token_not_found",
            "msg": "Invalid Refresh Token: Refresh Token Not Found"
        })))
        .mount(&server)
        .await;

    let config = BackendConfig::new(server.uri(), ANON_KEY).with_session_path(&session_path);
    let backend = HostedBackend::new(config).unwrap();

    assert!(backend.get_current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_fetch_network_failure() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let session_path = temp_dir.path().join("session.json");

    let mut expired: Session = serde_json::from_value(session_body("user-1")).unwrap();
    expired.expires_at = Some(1);
    SessionStore::with_path(&session_path)
        .save(Some(expired))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = BackendConfig::new(server.uri(), ANON_KEY).with_session_path(&session_path);
    let backend = HostedBackend::new(config).unwrap();

    assert!(backend.get_current_session().await.is_err());
}

// =============================================================================
// Profile rows
// =============================================================================

#[tokio::test]
async fn test_get_profile_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.user-1"))
        .and(query_param("select", "*"))
        .and(header("Accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("user-1")))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let profile = backend.get_profile("user-1").await.unwrap();

    assert_eq!(profile.id, "user-1");
    assert_eq!(profile.role, Role::Supervisor);
    assert_eq!(profile.is_active, Some(true));
    assert!(profile.created_at.is_some());
}

#[tokio::test]
async fn test_get_profile_uses_session_token() {
    let server = MockServer::start().await;
    mount_password_login(&server, "user-1").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(header("Authorization", "Bearer user-1_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("user-1")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend
        .sign_in_with_password("alice@example.com", "secret")
        .await
        .unwrap();
    backend.get_profile("user-1").await.unwrap();
}

#[tokio::test]
async fn test_get_profile_refreshes_expired_token() {
    let server = MockServer::start().await;

    let mut expired = session_body("user-1");
    expired["access_token"] = json!("old_access");
    expired["refresh_token"] = json!("old_refresh");
    expired["expires_at"] = json!(1);
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(expired))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(json!({ "refresh_token": "old_refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-1")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(header("Authorization", "Bearer user-1_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("user-1")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend
        .sign_in_with_password("alice@example.com", "secret")
        .await
        .unwrap();
    let mut sub = backend.subscribe();

    let profile = backend.get_profile("user-1").await.unwrap();
    assert_eq!(profile.id, "user-1");

    let change = sub.recv().await.unwrap();
    assert_eq!(change.event, AuthChangeEvent::TokenRefreshed);
    let current = backend.get_current_session().await.unwrap().unwrap();
    assert_eq!(current.access_token, "user-1_access");
}

#[tokio::test]
async fn test_failed_sign_in_persistence_leaves_no_session() {
    let server = MockServer::start().await;
    mount_password_login(&server, "user-1").await;

    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let config =
        BackendConfig::new(server.uri(), ANON_KEY).with_session_path(blocker.join("session.json"));
    let backend = HostedBackend::new(config).unwrap();
    let mut sub = backend.subscribe();

    let err = backend
        .sign_in_with_password("alice@example.com", "secret")
        .await
        .unwrap_err();
    assert!(err.message.starts_with("Session persistence error"));

    // Nothing was announced, and no session is reported.
    assert!(!matches!(backend.get_current_session().await, Ok(Some(_))));
    assert!(tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn test_get_profile_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "details": "The result contains 0 rows",
            "hint": null,
            "message": "JSON object requested, multiple (or no) rows returned"
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let err = backend.get_profile("user-1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_profile_other_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "42501",
            "message": "permission denied for table profiles"
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let err = backend.get_profile("user-1").await.unwrap_err();
    assert_eq!(
        err,
        StoreError::Backend {
            code: "42501".to_string(),
            message: "permission denied for table profiles".to_string(),
        }
    );
}

#[tokio::test]
async fn test_insert_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(header("Prefer", "return=minimal"))
        .and(body_partial_json(json!({
            "id": "user-1",
            "full_name": "Rajesh Kumar",
            "role": "field_personnel",
            "site_id": "CWC-GAN-001"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let record = NewProfile::new(
        "user-1",
        "Rajesh Kumar",
        Role::FieldPersonnel,
        "Central Water Commission",
        "Bhopal",
        Some("CWC-GAN-001".to_string()),
    );

    let backend = backend(&server);
    backend.insert_profile(&record).await.unwrap();
}

#[tokio::test]
async fn test_insert_profile_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"profiles_pkey\""
        })))
        .mount(&server)
        .await;

    let record = NewProfile::new("user-1", "A", Role::Public, "Org", "Loc", None);
    let backend = backend(&server);
    let err = backend.insert_profile(&record).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(err.message().contains("duplicate key"));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let config = BackendConfig::new("http://127.0.0.1:1", ANON_KEY);
    let backend = HostedBackend::new(config).unwrap();

    let err = backend.get_profile("user-1").await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}
