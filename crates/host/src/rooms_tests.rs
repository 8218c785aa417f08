use std::sync::atomic::{AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;

use super::*;

struct CountingListener {
    joins: AtomicUsize,
    leaves: AtomicUsize,
}

impl CountingListener {
    fn new() -> Arc<Self> {
        Arc::new(Self { joins: AtomicUsize::new(0), leaves: AtomicUsize::new(0) })
    }
}

impl RoomListener for CountingListener {
    fn on_first_client_joined(&self, _room: &str) {
        self.joins.fetch_add(1, Ordering::SeqCst);
    }

    fn on_last_client_left(&self, _room: &str) {
        self.leaves.fetch_add(1, Ordering::SeqCst);
    }
}

fn new_session(scope: &CancellationToken) -> (Arc<Session>, tokio::sync::mpsc::Receiver<crate::wire::OutboundFrame>) {
    Session::new("127.0.0.1:1".to_owned(), scope)
}

#[tokio::test]
async fn first_join_and_last_leave_notify_listeners_exactly_once() {
    let scope = CancellationToken::new();
    let registry = RoomRegistry::new();
    let listener = CountingListener::new();
    registry.add_listener(listener.clone()).await;

    let (a, _rx_a) = new_session(&scope);
    let (b, _rx_b) = new_session(&scope);

    registry.add_client_to_room("metrics", &a).await;
    registry.add_client_to_room("metrics", &b).await;
    assert_eq!(listener.joins.load(Ordering::SeqCst), 1);

    registry.remove_client_from_room("metrics", &a).await;
    assert_eq!(listener.leaves.load(Ordering::SeqCst), 0);
    registry.remove_client_from_room("metrics", &b).await;
    assert_eq!(listener.leaves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn join_then_leave_is_idempotent() {
    let scope = CancellationToken::new();
    let registry = RoomRegistry::new();
    let (session, _rx) = new_session(&scope);

    registry.add_client_to_room("metrics", &session).await;
    registry.add_client_to_room("metrics", &session).await;
    assert_eq!(registry.member_count("metrics").await, 1);

    registry.remove_client_from_room("metrics", &session).await;
    registry.remove_client_from_room("metrics", &session).await;
    assert_eq!(registry.member_count("metrics").await, 0);
}

#[tokio::test]
async fn broadcast_skips_excluded_and_closed_sessions() {
    let scope = CancellationToken::new();
    let registry = RoomRegistry::new();
    let (a, mut rx_a) = new_session(&scope);
    let (b, mut rx_b) = new_session(&scope);
    let (c, mut rx_c) = new_session(&scope);

    registry.add_client_to_room("metrics", &a).await;
    registry.add_client_to_room("metrics", &b).await;
    registry.add_client_to_room("metrics", &c).await;
    c.close();

    registry
        .broadcast_to_room("metrics", "metrics", serde_json::json!({"cpu": 1}), Some(&a))
        .await;

    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_ok());
    assert!(rx_c.try_recv().is_err());
}

#[tokio::test]
async fn remove_from_all_rooms_purges_every_membership() {
    let scope = CancellationToken::new();
    let registry = RoomRegistry::new();
    let (session, _rx) = new_session(&scope);

    registry.add_client_to_room("metrics", &session).await;
    registry.add_client_to_room("media", &session).await;

    registry.remove_client_from_all_rooms(&session).await;

    assert!(session.joined_rooms().is_empty());
    assert_eq!(registry.member_count("metrics").await, 0);
    assert_eq!(registry.member_count("media").await, 0);
}
