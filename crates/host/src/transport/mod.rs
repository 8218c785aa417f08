// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport server (C1): accepts connections, upgrades the single `/ws`
//! path to the message-framed session, and owns the shutdown drain and
//! inactivity sweeper over the process-wide session set.

pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router as AxumRouter;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use crate::state::{epoch_ms, AppState};

/// Sweeper cadence (§4.1: "at a fixed cadence (≥ 30 s)").
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
/// A session quiet for longer than this is evicted by the sweeper (§5).
const INACTIVITY_THRESHOLD_MS: u64 = 120_000;
/// Bounded wait for in-flight sessions to drain during shutdown (§4.1/§5).
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(15);

/// Builds the `/ws`-only router without binding a listener, so tests (and
/// [`serve`]) can drive it directly — mirrors the teacher's own public
/// `build_router` used the same way by its own integration tests.
pub fn build_router(state: Arc<AppState>) -> AxumRouter {
    AxumRouter::new()
        .route("/ws", get(ws::ws_handler))
        .fallback(|| async { (StatusCode::NOT_FOUND, "unknown upgrade path") })
        .with_state(state)
}

/// Serves the transport until `state.shutdown` is cancelled: stops accepting
/// new upgrades, sends a "going away" close to every registered session, and
/// waits up to [`SHUTDOWN_DRAIN`] for in-flight sessions before returning
/// (§4.1's shutdown protocol, steps a-d).
pub async fn serve(state: Arc<AppState>, addr: SocketAddr, tls: Option<RustlsConfig>) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let state_for_shutdown = Arc::clone(&state);
    let app = build_router(state);

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        broadcast_going_away(&state_for_shutdown).await;
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_DRAIN));
    });

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    match tls {
        Some(cfg) => axum_server::bind_rustls(addr, cfg).handle(handle).serve(make_service).await?,
        None => axum_server::bind(addr).handle(handle).serve(make_service).await?,
    }
    Ok(())
}

/// Sends a "going away" close frame to every registered session. Delivery
/// itself happens on the write pump with its own bounded deadline, so this
/// loop never blocks on a single misbehaving peer.
async fn broadcast_going_away(state: &Arc<AppState>) {
    let sessions = state.sessions.snapshot().await;
    tracing::info!(count = sessions.len(), "shutting down, notifying connected sessions");
    for session in sessions {
        session.close_with_reason("going away");
    }
}

/// Periodic liveness sweep: evicts any session whose last inbound activity is
/// older than [`INACTIVITY_THRESHOLD_MS`] (§4.1).
pub fn spawn_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let now = epoch_ms();
            for session in state.sessions.snapshot().await {
                if session.is_closed() {
                    continue;
                }
                if now.saturating_sub(session.last_activity_ms()) > INACTIVITY_THRESHOLD_MS {
                    tracing::info!(peer = %session.peer_addr(), "evicting inactive session");
                    session.close_with_reason("inactive");
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
