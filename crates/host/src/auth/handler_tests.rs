use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::auth::PendingAuthRequest;
use crate::config::PersistedConfig;

fn temp_config_path() -> std::path::PathBuf {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("linqora-authhandler-test-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir.join("linqora_config.json")
}

fn new_manager() -> (Arc<AuthManager>, mpsc::Receiver<PendingAuthRequest>) {
    let (tx, rx) = mpsc::channel(8);
    (Arc::new(AuthManager::new(PersistedConfig::default(), temp_config_path(), tx)), rx)
}

#[tokio::test]
async fn first_time_request_replies_pending_and_starts_poller() {
    let (auth, mut rx) = new_manager();
    let scope = CancellationToken::new();
    let (session, mut out) = Session::new("10.0.0.5:1".to_owned(), &scope);

    let data = serde_json::json!({
        "deviceId": "D1", "deviceName": "Phone", "ip": "10.0.0.5", "versionClient": "0.2.0",
    });
    handle_auth_request(&auth, &session, Some(data)).await;

    let frame = out.recv().await.expect("auth_pending frame");
    assert_eq!(frame.kind, "auth_pending");
    assert_eq!(frame.data["code"], 200);

    rx.recv().await.expect("operator-approval channel receives the request");
    session.close();
}

#[tokio::test]
async fn already_authorized_device_skips_operator_prompt() {
    let (auth, mut rx) = new_manager();
    auth.request_authorization("Phone".to_owned(), "D1".to_owned(), "10.0.0.5".to_owned()).await;
    rx.recv().await;
    auth.respond("D1", true).await;

    let scope = CancellationToken::new();
    let (session, mut out) = Session::new("10.0.0.5:1".to_owned(), &scope);
    let data = serde_json::json!({
        "deviceId": "D1", "deviceName": "Phone", "ip": "10.0.0.5", "versionClient": "0.2.0",
    });
    handle_auth_request(&auth, &session, Some(data)).await;

    let frame = out.recv().await.expect("auth_response frame");
    assert_eq!(frame.kind, "auth_response");
    assert_eq!(frame.data["code"], 100);
}

#[tokio::test]
async fn unsupported_version_is_rejected_without_pending_request() {
    let (auth, mut rx) = new_manager();
    let scope = CancellationToken::new();
    let (session, mut out) = Session::new("10.0.0.5:1".to_owned(), &scope);

    let data = serde_json::json!({
        "deviceId": "D2", "deviceName": "Tablet", "ip": "10.0.0.6", "versionClient": "0.0.1",
    });
    handle_auth_request(&auth, &session, Some(data)).await;

    let frame = out.recv().await.expect("auth_response frame");
    assert_eq!(frame.data["code"], 403);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn missing_device_id_is_rejected() {
    let (auth, _rx) = new_manager();
    let scope = CancellationToken::new();
    let (session, mut out) = Session::new("10.0.0.5:1".to_owned(), &scope);

    let data = serde_json::json!({
        "deviceId": "", "deviceName": "Tablet", "ip": "10.0.0.6", "versionClient": "0.2.0",
    });
    handle_auth_request(&auth, &session, Some(data)).await;

    let frame = out.recv().await.expect("auth_response frame");
    assert_eq!(frame.data["code"], 402);
}

#[tokio::test]
async fn auth_check_without_prior_request_reports_not_authorized() {
    let (auth, _rx) = new_manager();
    let scope = CancellationToken::new();
    let (session, mut out) = Session::new("10.0.0.5:1".to_owned(), &scope);

    handle_auth_check(&auth, &session).await;

    let frame = out.recv().await.expect("auth_response frame");
    assert_eq!(frame.data["code"], 1);
}

#[tokio::test]
async fn auth_check_after_expiry_reports_timeout_not_rejection() {
    let (auth, mut rx) = new_manager();
    auth.request_authorization("Phone".to_owned(), "D1".to_owned(), "10.0.0.5".to_owned()).await;
    rx.recv().await;
    auth.expire_pending("D1").await;

    let scope = CancellationToken::new();
    let (session, mut out) = Session::new("10.0.0.5:1".to_owned(), &scope);
    session.set_identifier("D1".to_owned());

    handle_auth_check(&auth, &session).await;

    let frame = out.recv().await.expect("auth_response frame");
    assert_eq!(frame.data["code"], 500);
}
