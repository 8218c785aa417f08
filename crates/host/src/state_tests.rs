use tokio_util::sync::CancellationToken;

use super::*;
use crate::session::Session;

#[tokio::test]
async fn register_and_deregister_round_trip() {
    let registry = SessionRegistry::new();
    let scope = CancellationToken::new();
    let (session, _rx) = Session::new("127.0.0.1:1".to_owned(), &scope);

    registry.register(std::sync::Arc::clone(&session)).await;
    assert_eq!(registry.len().await, 1);

    registry.deregister(&session).await;
    assert_eq!(registry.len().await, 0);
}

#[tokio::test]
async fn deregistering_an_unregistered_session_is_a_no_op() {
    let registry = SessionRegistry::new();
    let scope = CancellationToken::new();
    let (session, _rx) = Session::new("127.0.0.1:1".to_owned(), &scope);

    registry.deregister(&session).await;
    assert_eq!(registry.len().await, 0);
}

#[tokio::test]
async fn snapshot_is_independent_of_later_mutation() {
    let registry = SessionRegistry::new();
    let scope = CancellationToken::new();
    let (a, _rx_a) = Session::new("127.0.0.1:1".to_owned(), &scope);
    let (b, _rx_b) = Session::new("127.0.0.1:2".to_owned(), &scope);

    registry.register(std::sync::Arc::clone(&a)).await;
    let snapshot = registry.snapshot().await;

    registry.register(std::sync::Arc::clone(&b)).await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(registry.len().await, 2);
}

#[test]
fn epoch_ms_is_monotonically_nondecreasing_across_calls() {
    let first = epoch_ms();
    let second = epoch_ms();
    assert!(second >= first);
}
