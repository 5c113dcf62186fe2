//! End-to-end tests of `HttpService` against an in-process axum server that
//! speaks the registry's REST contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use integrity_client::batch::BatchOrchestrator;
use integrity_client::config::ApiConfig;
use integrity_client::service::{
    AuthService, CleanupStatus, HttpService, Identity, IntegrityService, RegistrationRequest,
    MALFORMED_OUTCOME_MESSAGE,
};
use integrity_client::{
    AuthError, Error, ItemStatus, LocalFile, Session, SessionCredential, VerificationSubmitter,
};

// ============================================================================
// Mock registry
// ============================================================================

const GOOD_TOKEN: &str = "good-token";
const REGISTERED_CONTENT: &[u8] = b"registered deed";

type Reply = (StatusCode, Json<Value>);

#[derive(Clone, Default)]
struct Registry {
    records: Arc<AtomicU64>,
}

fn authorized(headers: &HeaderMap) -> Result<(), Reply> {
    let expected = format!("Bearer {}", GOOD_TOKEN);
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token expired" })),
        )),
    }
}

fn admin() -> Value {
    json!({
        "id": "65f0c0ffee",
        "username": "registrar",
        "email": "registrar@example.org",
        "full_name": "Records Office"
    })
}

async fn health() -> Reply {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "service": "mock-registry" })),
    )
}

async fn verify(mut multipart: Multipart) -> Reply {
    let mut content = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            content = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        }
    }

    let hash = format!("{:016x}", content.len());
    if content == REGISTERED_CONTENT {
        (
            StatusCode::OK,
            Json(json!({
                "status": "original",
                "matched_file": "deed-2019.pdf",
                "hash": hash,
                "recordId": 4,
                "block_num": 1200,
                "timestamp": 1700000000,
                "hash_verified": hash
            })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "status": "no_match", "message": "No such file in DB.", "hash": hash })),
        )
    }
}

async fn login(Query(params): Query<HashMap<String, String>>) -> Reply {
    let username = params.get("username").map(String::as_str);
    let password = params.get("password").map(String::as_str);
    match (username, password) {
        (Some("registrar"), Some("hunter22")) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "access_token": GOOD_TOKEN,
                "token_type": "bearer",
                "admin": admin()
            })),
        ),
        (Some("dormant"), _) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "detail": "Account is inactive" })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid username or password" })),
        ),
    }
}

async fn register(Query(params): Query<HashMap<String, String>>) -> Reply {
    if params.get("username").map(String::as_str) == Some("taken") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Username already exists" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Admin registered successfully",
            "admin_id": "7a11ce"
        })),
    )
}

async fn verify_token(headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    (
        StatusCode::OK,
        Json(json!({ "status": "valid", "admin_id": "65f0c0ffee" })),
    )
}

async fn upload(State(registry): State<Registry>, headers: HeaderMap, mut multipart: Multipart) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }

    // (file name, client_ref) in arrival order
    let mut files: Vec<(String, Option<String>)> = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let part = field.name().unwrap_or_default().to_string();
        match part.as_str() {
            "files" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let _ = field.bytes().await;
                files.push((name, None));
            }
            "client_ref" => {
                let client_ref = field.text().await.unwrap_or_default();
                if let Some(last) = files.last_mut() {
                    last.1 = Some(client_ref);
                }
            }
            _ => {}
        }
    }

    let mut successful = 0;
    let mut failed = 0;
    let outcomes: Vec<Value> = files
        .iter()
        .enumerate()
        .rev()
        .map(|(i, (name, client_ref))| {
            if name.starts_with("garbled") {
                json!({ "filename": name, "client_ref": client_ref, "status": 7 })
            } else if name.starts_with("corrupt") {
                failed += 1;
                json!({
                    "filename": name,
                    "client_ref": client_ref,
                    "hash": "",
                    "recordId": "",
                    "tx_hash": "",
                    "status": "error",
                    "error": "Failed to process file",
                    "file_type": "unknown"
                })
            } else {
                successful += 1;
                let record = registry.records.fetch_add(1, Ordering::SeqCst) + 1;
                json!({
                    "filename": name,
                    "client_ref": client_ref,
                    "hash": format!("{:064x}", i),
                    "recordId": record,
                    "tx_hash": format!("0x{:064x}", record),
                    "status": "success",
                    "error": null,
                    "file_type": "binary"
                })
            }
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "uploaded_files": outcomes,
            "total": files.len(),
            "successful": successful,
            "failed": failed,
            "cleanup_status": "completed"
        })),
    )
}

async fn stats(State(registry): State<Registry>, headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let total = registry.records.load(Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({
            "total_records": total,
            "csv_entries": total,
            "upload_folder": "files"
        })),
    )
}

async fn logout(headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "message": "Logged out successfully" })),
    )
}

/// Serve the mock registry on an ephemeral port and return a client for it
async fn spawn_registry() -> Arc<HttpService> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/verify", post(verify))
        .route("/admin/login", post(login))
        .route("/admin/register", post(register))
        .route("/admin/verify-token", get(verify_token))
        .route("/admin/upload", post(upload))
        .route("/admin/stats", get(stats))
        .route("/admin/logout", post(logout))
        .with_state(Registry::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    client_for(&format!("http://{}", addr))
}

fn client_for(base_url: &str) -> Arc<HttpService> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    };
    Arc::new(HttpService::new(&config).unwrap())
}

fn file(name: &str, size: usize) -> LocalFile {
    LocalFile::new(name, vec![0x5a; size]).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let service = spawn_registry().await;
    let health = service.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service.as_deref(), Some("mock-registry"));
}

#[tokio::test]
async fn test_verify_matched_and_unmatched() {
    let service = spawn_registry().await;
    let submitter = VerificationSubmitter::new(service.clone());

    let known = LocalFile::new("deed.pdf", REGISTERED_CONTENT.to_vec()).unwrap();
    let outcome = submitter.submit(&known).await.unwrap();
    assert!(outcome.is_match());
    assert_eq!(outcome.matched_file(), Some("deed-2019.pdf"));

    let unknown = file("photo.jpg", 2048);
    let outcome = submitter.submit(&unknown).await.unwrap();
    assert!(!outcome.is_match());
    assert_eq!(outcome.hash(), format!("{:016x}", 2048));
    assert_eq!(outcome.matched_file(), None);
}

#[tokio::test]
async fn test_login_outcomes() {
    let service = spawn_registry().await;

    let session = Session::login(&*service, "registrar", "hunter22").await.unwrap();
    let identity: Identity = session.identity().unwrap();
    assert_eq!(identity.username, "registrar");
    assert!(session.verify(&*service).await.unwrap());

    let bad = Session::login(&*service, "registrar", "nope").await;
    assert_eq!(bad.unwrap_err(), Error::Auth(AuthError::BadCredentials));

    let inactive = Session::login(&*service, "dormant", "hunter22").await;
    assert_eq!(inactive.unwrap_err(), Error::Auth(AuthError::AccountInactive));
}

#[tokio::test]
async fn test_register() {
    let service = spawn_registry().await;
    let mut request = RegistrationRequest {
        username: "archivist".to_string(),
        password: "s3cret!".to_string(),
        email: "archivist@example.org".to_string(),
        full_name: "Archive Desk".to_string(),
    };

    assert_eq!(Session::register(&*service, &request).await.unwrap(), "7a11ce");

    request.username = "taken".to_string();
    assert_eq!(
        service.register(&request).await.unwrap_err(),
        Error::InvalidRegistration("Username already exists".to_string())
    );
}

#[tokio::test]
async fn test_batch_upload_end_to_end() {
    let service = spawn_registry().await;
    let session = Session::login(&*service, "registrar", "hunter22").await.unwrap();
    let orchestrator = BatchOrchestrator::new(service.clone());

    let report = orchestrator
        .submit_batch(
            &session,
            vec![file("fileA.bin", 5 * 1024), file("fileB.bin", 10 * 1024), file("corrupt.bin", 10)],
        )
        .await
        .unwrap();

    assert_eq!(report.submitted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.unmatched_outcomes, 0);
    assert_eq!(report.cleanup_status, CleanupStatus::Completed);

    let items = orchestrator.current_batch().await;
    assert_eq!(items[0].filename, "fileA.bin");
    assert_eq!(items[0].status, ItemStatus::Success);
    assert!(items[0].record_id.is_some());
    assert!(items[0].chain_ref.as_deref().unwrap().starts_with("0x"));
    assert_eq!(items[1].status, ItemStatus::Success);
    assert_eq!(items[2].status, ItemStatus::Error);
    assert_eq!(items[2].error.as_deref(), Some("Failed to process file"));
    assert_eq!(items[2].hash, None);

    // Stats were refreshed after the batch
    let stats = orchestrator.current_stats().await;
    assert_eq!(stats.server.unwrap().total_records, 2);

    session.logout(&*service).await;
    assert!(!session.is_active());
}

#[tokio::test]
async fn test_malformed_outcome_fails_only_its_file() {
    let service = spawn_registry().await;
    let session = Session::login(&*service, "registrar", "hunter22").await.unwrap();
    let orchestrator = BatchOrchestrator::new(service.clone());

    let report = orchestrator
        .submit_batch(&session, vec![file("a.txt", 10), file("garbled.txt", 10)])
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.unresolved, 0);

    let items = orchestrator.current_batch().await;
    assert_eq!(items[0].status, ItemStatus::Success);
    assert!(items[0].record_id.is_some());
    assert_eq!(items[1].status, ItemStatus::Error);
    assert!(items[1]
        .error
        .as_deref()
        .unwrap()
        .starts_with(MALFORMED_OUTCOME_MESSAGE));
    assert!(session.is_active());
}

#[tokio::test]
async fn test_login_to_unreachable_service() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let service = client_for(&format!("http://{}", addr));

    let err = Session::login(&*service, "registrar", "s3cret-passphrase")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(AuthError::Unreachable(_))));
    // The request URL carries the password in its query string
    assert!(!err.to_string().contains("s3cret-passphrase"));
    assert!(!format!("{:?}", err).contains("s3cret-passphrase"));
}

#[tokio::test]
async fn test_duplicate_names_resolve_independently() {
    let service = spawn_registry().await;
    let session = Session::login(&*service, "registrar", "hunter22").await.unwrap();
    let orchestrator = BatchOrchestrator::new(service.clone());

    orchestrator
        .submit_batch(&session, vec![file("scan.pdf", 100), file("scan.pdf", 200)])
        .await
        .unwrap();

    let items = orchestrator.current_batch().await;
    assert!(items.iter().all(|i| i.status == ItemStatus::Success));
    assert_ne!(items[0].record_id, items[1].record_id);
}

#[tokio::test]
async fn test_expired_token_fails_batch_and_session() {
    let service = spawn_registry().await;
    let identity: Identity = serde_json::from_value(admin()).unwrap();
    let session = Session::from_credential(SessionCredential::new("stale-token", identity));
    let orchestrator = BatchOrchestrator::new(service.clone());

    let result = orchestrator
        .submit_batch(&session, vec![file("a.txt", 1), file("b.txt", 1)])
        .await;

    assert_eq!(
        result.unwrap_err(),
        Error::Auth(AuthError::Rejected("Token expired".to_string()))
    );
    assert!(!session.is_active());

    let items = orchestrator.current_batch().await;
    assert!(items.iter().all(|i| i.status == ItemStatus::Error));
    assert_eq!(items[0].error, items[1].error);
}

#[tokio::test]
async fn test_unreachable_service() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let service = client_for(&format!("http://{}", addr));

    let submitter = VerificationSubmitter::new(service.clone());
    let verify = submitter.submit(&file("a.txt", 1)).await;
    assert!(matches!(verify, Err(Error::Transport(_))));

    let identity: Identity = serde_json::from_value(admin()).unwrap();
    let session = Session::from_credential(SessionCredential::new(GOOD_TOKEN, identity));
    let orchestrator = BatchOrchestrator::new(service);

    let upload = orchestrator
        .submit_batch(&session, vec![file("a.txt", 1), file("b.txt", 1), file("c.txt", 1)])
        .await;

    assert!(matches!(upload, Err(Error::Transport(_))));
    let items = orchestrator.current_batch().await;
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.status == ItemStatus::Error));
    assert!(items.iter().all(|i| i.error == items[0].error));
    // A transport failure is not a rejection
    assert!(session.is_active());
}
