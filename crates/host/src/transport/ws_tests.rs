use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::config::PersistedConfig;
use crate::power::LockState;
use crate::probes::NullProbes;
use crate::rooms::RoomRegistry;

fn temp_config_path() -> std::path::PathBuf {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("linqora-ws-test-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir.join("linqora_config.json")
}

fn new_router() -> Arc<Router> {
    let (tx, _rx) = mpsc::channel(8);
    Arc::new(Router {
        auth: Arc::new(crate::auth::AuthManager::new(PersistedConfig::default(), temp_config_path(), tx)),
        rooms: Arc::new(RoomRegistry::new()),
        host_info: Arc::new(NullProbes),
        privilege: Arc::new(NullProbes),
        media_control: Arc::new(NullProbes),
        power: Arc::new(NullProbes),
        lock_state: Arc::new(LockState::new()),
    })
}

#[tokio::test]
async fn a_ping_frame_touches_activity_without_dispatching() {
    let router = new_router();
    let (session, mut out) = Session::new("127.0.0.1:1".to_owned(), &CancellationToken::new());
    let before = session.last_activity_ms();

    let keep_going = handle_inbound(&session, &router, Message::Ping(Vec::new().into())).await;

    assert!(keep_going);
    assert!(session.last_activity_ms() >= before);
    assert!(out.try_recv().is_err());
}

#[tokio::test]
async fn a_close_message_tells_the_read_pump_to_stop() {
    let router = new_router();
    let (session, _out) = Session::new("127.0.0.1:1".to_owned(), &CancellationToken::new());

    let keep_going = handle_inbound(&session, &router, Message::Close(None)).await;

    assert!(!keep_going);
}

#[tokio::test]
async fn a_well_formed_text_frame_is_routed_and_replied_to() {
    let router = new_router();
    let (session, mut out) = Session::new("127.0.0.1:1".to_owned(), &CancellationToken::new());

    let keep_going = handle_inbound(&session, &router, Message::Text(r#"{"type":"ping"}"#.to_owned().into())).await;

    assert!(keep_going);
    let reply = out.recv().await.expect("pong reply");
    assert_eq!(reply.kind, "pong");
}

#[tokio::test]
async fn a_malformed_text_frame_is_ignored_without_closing_the_session() {
    let router = new_router();
    let (session, mut out) = Session::new("127.0.0.1:1".to_owned(), &CancellationToken::new());

    let keep_going = handle_inbound(&session, &router, Message::Text("not json".to_owned().into())).await;

    assert!(keep_going);
    assert!(!session.is_closed());
    assert!(out.try_recv().is_err());
}
