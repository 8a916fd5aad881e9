//! Integration tests for the consent example server
//!
//! These tests drive the full request/response cycle for both demo flows
//! against an in-memory user store and a scripted platform client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::{get, post},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use datavault_consent_server::models::{
    DeliveryStatus, FileDescriptor, FileList, RetrievedFile, SessionFileStatus, UserRecord,
};
use datavault_consent_server::platform::{
    AuthorizeOutcome, AuthorizeRequest, ContractConfig, PlatformClient, PlatformError,
    PushRequest, Session,
};
use datavault_consent_server::routes::*;
use datavault_consent_server::store::{MemoryStore, UserStore};
use datavault_consent_server::{AppState, Config};

// Test fixture constants
const CONSENT_URL: &str = "https://consent.example/authorize?session=sess-auth";
const TEST_VERIFIER: &str = "verifier-1";
const TEST_TOKEN: &str = "token-123";

// =============================================================================
// Test Helpers
// =============================================================================

/// Scripted stand-in for the external platform.
struct MockPlatform {
    file_lists: Mutex<Vec<FileList>>,
    list_tick: AtomicUsize,
    authorize_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    read_file_calls: AtomicUsize,
    honor_existing_token: bool,
    fail_read_session: bool,
    fail_file_list: bool,
    push_status: DeliveryStatus,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            file_lists: Mutex::new(vec![FileList {
                status: SessionFileStatus::Completed,
                files: vec![],
            }]),
            list_tick: AtomicUsize::new(0),
            authorize_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            read_file_calls: AtomicUsize::new(0),
            honor_existing_token: false,
            fail_read_session: false,
            fail_file_list: false,
            push_status: DeliveryStatus::Delivered,
        }
    }
}

impl MockPlatform {
    fn with_file_lists(lists: Vec<FileList>) -> Self {
        Self {
            file_lists: Mutex::new(lists),
            ..Default::default()
        }
    }
}

fn file_list_of(status: SessionFileStatus, names: &[&str]) -> FileList {
    FileList {
        status,
        files: names
            .iter()
            .map(|name| FileDescriptor {
                name: name.to_string(),
                size: Some(16),
            })
            .collect(),
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn establish_session(
        &self,
        _contract: &ContractConfig,
    ) -> Result<Session, PlatformError> {
        Ok(Session {
            key: "sess-push".to_string(),
            expiry: None,
        })
    }

    async fn read_session(
        &self,
        _contract: &ContractConfig,
        _access_token: &str,
    ) -> Result<Session, PlatformError> {
        if self.fail_read_session {
            return Err(PlatformError::Api {
                status: 401,
                message: "token expired".to_string(),
            });
        }
        Ok(Session {
            key: "sess-token".to_string(),
            expiry: None,
        })
    }

    async fn get_authorize_url(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<AuthorizeOutcome, PlatformError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        let session = Session {
            key: "sess-auth".to_string(),
            expiry: None,
        };
        if self.honor_existing_token && request.access_token.is_some() {
            Ok(AuthorizeOutcome::DataAuthorized {
                updated_access_token: "token-refreshed".to_string(),
                session,
            })
        } else {
            Ok(AuthorizeOutcome::ConsentRequired {
                authorization_url: CONSENT_URL.to_string(),
                code_verifier: TEST_VERIFIER.to_string(),
                session,
            })
        }
    }

    async fn exchange_code_for_token(
        &self,
        _contract: &ContractConfig,
        _redirect_uri: &str,
        _code: &str,
        code_verifier: &str,
    ) -> Result<String, PlatformError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(code_verifier, TEST_VERIFIER);
        Ok(TEST_TOKEN.to_string())
    }

    async fn read_file_list(&self, _session_key: &str) -> Result<FileList, PlatformError> {
        if self.fail_file_list {
            return Err(PlatformError::Api {
                status: 500,
                message: "list unavailable".to_string(),
            });
        }
        let lists = self.file_lists.lock().unwrap();
        let tick = self.list_tick.fetch_add(1, Ordering::SeqCst);
        Ok(lists[tick.min(lists.len() - 1)].clone())
    }

    async fn read_file(
        &self,
        _session_key: &str,
        file_name: &str,
    ) -> Result<RetrievedFile, PlatformError> {
        self.read_file_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RetrievedFile {
            name: file_name.to_string(),
            mime_type: Some("application/json".to_string()),
            data: br#"{"entries":[]}"#.to_vec(),
        })
    }

    async fn push_file(&self, _request: &PushRequest) -> Result<DeliveryStatus, PlatformError> {
        Ok(self.push_status)
    }
}

/// Create a test configuration
fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0, // Random port
        platform_base_url: "http://platform.invalid".to_string(),
        application_id: "app-test".to_string(),
        contract_id: "contract-test".to_string(),
        public_base_url: None,
        users_file_path: String::new(), // Unused: tests inject MemoryStore
        poll_interval_ms: 1,
        push_file_path: String::new(), // Set per test when pushing
        service_id: None,
        environment: "test".to_string(),
    }
}

/// Create a test app router
fn create_test_app(
    store: Arc<MemoryStore>,
    platform: Arc<MockPlatform>,
    config: Config,
) -> Router {
    let state = AppState::new(store, platform, config);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/error", get(show_error))
        .route("/fetch", get(begin_fetch))
        .route("/return", get(return_callback))
        .route("/file-list", post(file_list))
        .route("/preparing", get(preparing))
        .route("/results", get(results))
        .route("/send-receipt", get(send_receipt))
        .route("/exchange-token", get(exchange_token))
        .route("/push", get(push_receipt))
        .with_state(state)
}

fn default_app() -> (Arc<MemoryStore>, Arc<MockPlatform>, Router) {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    let app = create_test_app(store.clone(), platform.clone(), test_config());
    (store, platform, app)
}

async fn send_get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header(header::HOST, "example.test")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn send_post(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "example.test")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_to_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_to_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(resp: &axum::response::Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("redirect should carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

fn record_with(
    token: Option<&str>,
    verifier: Option<&str>,
    session: Option<&str>,
) -> UserRecord {
    UserRecord {
        access_token: token.map(str::to_string),
        code_verifier: verifier.map(str::to_string),
        session_key: session.map(str::to_string),
        ..Default::default()
    }
}

// =============================================================================
// Health & Landing Page
// =============================================================================

#[tokio::test]
async fn test_health_returns_healthy() {
    let (_, _, app) = default_app();

    let resp = send_get(app, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_to_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "readable");
}

#[tokio::test]
async fn test_home_links_both_flows_for_fresh_user() {
    let (_, _, app) = default_app();

    let resp = send_get(app, "/").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_to_string(resp).await;
    assert!(body.contains("/fetch?userId="));
    assert!(body.contains("/send-receipt?userId="));
}

#[tokio::test]
async fn test_home_keeps_given_user_id() {
    let (_, _, app) = default_app();

    let resp = send_get(app, "/?userId=known-user").await;
    let body = body_to_string(resp).await;
    assert!(body.contains("/fetch?userId=known-user"));
}

// =============================================================================
// Read Flow: Authorization
// =============================================================================

#[tokio::test]
async fn test_fetch_without_user_id_is_rejected() {
    let (_, _, app) = default_app();

    let resp = send_get(app, "/fetch").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_first_fetch_redirects_to_consent_and_persists_verifier() {
    let (store, platform, app) = default_app();

    let resp = send_get(app, "/fetch?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), CONSENT_URL);

    // The verifier and session key must be on disk before the user leaves:
    // without them the callback cannot complete.
    let record = store.get("u1").await.unwrap().unwrap();
    assert_eq!(record.code_verifier.as_deref(), Some(TEST_VERIFIER));
    assert_eq!(record.session_key.as_deref(), Some("sess-auth"));
    assert_eq!(platform.authorize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_with_valid_token_skips_consent() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save("u1", record_with(Some("stored-token"), None, None))
        .await
        .unwrap();
    let app = create_test_app(store, platform.clone(), test_config());

    let resp = send_get(app, "/fetch?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        "http://example.test/preparing?sessionKey=sess-token&userId=u1"
    );
    assert_eq!(platform.authorize_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_with_rejected_token_falls_back_to_consent() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform {
        fail_read_session: true,
        ..Default::default()
    });
    store
        .save("u1", record_with(Some("expired-token"), None, None))
        .await
        .unwrap();
    let app = create_test_app(store, platform.clone(), test_config());

    let resp = send_get(app, "/fetch?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), CONSENT_URL);
    assert_eq!(platform.authorize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_with_honored_token_reauthorizes_without_consent() {
    // The token no longer opens a session directly, but the platform still
    // honors it during authorization and hands back a refreshed token.
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform {
        fail_read_session: true,
        honor_existing_token: true,
        ..Default::default()
    });
    store
        .save("u1", record_with(Some("stale-token"), None, None))
        .await
        .unwrap();
    let app = create_test_app(store.clone(), platform.clone(), test_config());

    let resp = send_get(app, "/fetch?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        "http://example.test/preparing?sessionKey=sess-auth&userId=u1"
    );

    let record = store.get("u1").await.unwrap().unwrap();
    assert_eq!(record.access_token.as_deref(), Some("token-refreshed"));
    assert!(record.code_verifier.is_none());
}

// =============================================================================
// Read Flow: Callback
// =============================================================================

#[tokio::test]
async fn test_callback_exchanges_code_and_stores_token() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save("u1", record_with(None, Some(TEST_VERIFIER), Some("sess-1")))
        .await
        .unwrap();
    let app = create_test_app(store.clone(), platform.clone(), test_config());

    let resp = send_get(app, "/return?success=true&code=auth-code&state=userId%3Du1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        "http://example.test/preparing?sessionKey=sess-1&userId=u1"
    );

    let record = store.get("u1").await.unwrap().unwrap();
    assert_eq!(record.access_token.as_deref(), Some(TEST_TOKEN));
    // The verifier is single-use: cleared by the exchange that consumed it.
    assert!(record.code_verifier.is_none());
    assert_eq!(platform.exchange_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_callback_without_code_issues_no_exchange() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save("u1", record_with(None, Some(TEST_VERIFIER), None))
        .await
        .unwrap();
    let app = create_test_app(store, platform.clone(), test_config());

    let resp = send_get(app, "/return?success=true&state=userId%3Du1").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(platform.exchange_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_callback_with_negative_result_issues_no_exchange() {
    let (_, platform, app) = default_app();

    let resp = send_get(
        app,
        "/return?success=false&code=auth-code&state=userId%3Du1",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(platform.exchange_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_callback_without_pending_verifier_is_rejected() {
    let (_, platform, app) = default_app();

    let resp = send_get(app, "/return?success=true&code=auth-code&state=userId%3Du1").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(platform.exchange_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// File List & Results
// =============================================================================

#[tokio::test]
async fn test_file_list_proxies_platform_response() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::with_file_lists(vec![file_list_of(
        SessionFileStatus::Running,
        &["media.json"],
    )]));
    let app = create_test_app(store, platform, test_config());

    let resp = send_post(app, "/file-list?sessionKey=sess-1").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_to_json(resp).await;
    assert_eq!(body["status"], "running");
    assert_eq!(body["files"][0]["name"], "media.json");
}

#[tokio::test]
async fn test_file_list_failure_answers_404() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform {
        fail_file_list: true,
        ..Default::default()
    });
    let app = create_test_app(store, platform, test_config());

    let resp = send_post(app, "/file-list?sessionKey=sess-1").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_results_drains_session_files() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::with_file_lists(vec![
        file_list_of(SessionFileStatus::Pending, &[]),
        file_list_of(SessionFileStatus::Running, &["a.json", "b.json"]),
        file_list_of(SessionFileStatus::Completed, &["a.json", "b.json"]),
    ]));
    let app = create_test_app(store, platform.clone(), test_config());

    let resp = send_get(app, "/results?sessionKey=sess-1&userId=u1").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_to_string(resp).await;
    assert!(body.contains("2 file(s) were retrieved"));
    assert!(body.contains("a.json"));
    assert!(body.contains("b.json"));
    // Each file fetched exactly once across both listing ticks.
    assert_eq!(platform.read_file_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_results_failure_renders_error_page() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform {
        fail_file_list: true,
        ..Default::default()
    });
    let app = create_test_app(store, platform, test_config());

    let resp = send_get(app, "/results?sessionKey=sess-1&userId=u1").await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// Write Flow
// =============================================================================

#[tokio::test]
async fn test_send_receipt_first_time_forces_consent() {
    let (store, platform, app) = default_app();

    let resp = send_get(app, "/send-receipt?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), CONSENT_URL);
    assert_eq!(platform.authorize_calls.load(Ordering::SeqCst), 1);

    let record = store.get("u1").await.unwrap().unwrap();
    assert_eq!(record.code_verifier.as_deref(), Some(TEST_VERIFIER));
}

#[tokio::test]
async fn test_send_receipt_with_postbox_skips_consent() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save(
            "u1",
            UserRecord {
                access_token: Some("tok".to_string()),
                postbox_id: Some("pb-1".to_string()),
                public_key: Some("pk-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let app = create_test_app(store, platform.clone(), test_config());

    let resp = send_get(app, "/send-receipt?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "http://example.test/push?userId=u1");
    assert_eq!(platform.authorize_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exchange_token_requires_postbox_details() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save("u1", record_with(None, Some(TEST_VERIFIER), None))
        .await
        .unwrap();
    let app = create_test_app(store, platform.clone(), test_config());

    let resp = send_get(
        app,
        "/exchange-token?success=true&code=auth-code&state=userId%3Du1",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(platform.exchange_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exchange_token_persists_postbox_coordinates() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save("u9", record_with(None, Some(TEST_VERIFIER), None))
        .await
        .unwrap();
    let app = create_test_app(store.clone(), platform, test_config());

    let resp = send_get(
        app,
        "/exchange-token?success=true&code=auth-code&state=userId%3Du9&postboxId=pb-1&publicKey=pk-1",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "http://example.test/push?userId=u9");

    let record = store.get("u9").await.unwrap().unwrap();
    assert_eq!(record.access_token.as_deref(), Some(TEST_TOKEN));
    assert_eq!(record.postbox_id.as_deref(), Some("pb-1"));
    assert_eq!(record.public_key.as_deref(), Some("pk-1"));
}

#[tokio::test]
async fn test_push_delivers_receipt() {
    let temp = tempfile::TempDir::new().unwrap();
    let receipt_path = temp.path().join("receipt.json");
    std::fs::write(&receipt_path, br#"{"total":"12.40"}"#).unwrap();

    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save(
            "u1",
            UserRecord {
                access_token: Some("tok".to_string()),
                postbox_id: Some("pb-1".to_string()),
                public_key: Some("pk-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut config = test_config();
    config.push_file_path = receipt_path.to_string_lossy().into_owned();
    let app = create_test_app(store, platform, config);

    let resp = send_get(app, "/push?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_to_string(resp).await;
    assert!(body.contains("was delivered"));
}

#[tokio::test]
async fn test_push_failed_status_renders_error_page_without_erroring() {
    let temp = tempfile::TempDir::new().unwrap();
    let receipt_path = temp.path().join("receipt.json");
    std::fs::write(&receipt_path, br#"{"total":"12.40"}"#).unwrap();

    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform {
        push_status: DeliveryStatus::Failed,
        ..Default::default()
    });
    store
        .save(
            "u1",
            UserRecord {
                access_token: Some("tok".to_string()),
                postbox_id: Some("pb-1".to_string()),
                public_key: Some("pk-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut config = test_config();
    config.push_file_path = receipt_path.to_string_lossy().into_owned();
    let app = create_test_app(store, platform, config);

    // A failed delivery is an outcome, not a server error.
    let resp = send_get(app, "/push?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_to_string(resp).await;
    assert!(body.contains("could not be delivered"));
}

#[tokio::test]
async fn test_push_without_postbox_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::default());
    store
        .save("u1", record_with(Some("tok"), None, None))
        .await
        .unwrap();
    let app = create_test_app(store, platform, test_config());

    let resp = send_get(app, "/push?userId=u1").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
