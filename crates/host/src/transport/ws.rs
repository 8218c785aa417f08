// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection WebSocket session (C2): the read pump, write pump, and the
//! `/ws` upgrade handler that wires a new connection into [`AppState`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::router::Router;
use crate::session::Session;
use crate::state::AppState;
use crate::wire::{InboundFrame, OutboundFrame};

/// No inbound frame or keepalive pong for this long and the connection is
/// considered dead (§5: "read-deadline 60 s").
const READ_DEADLINE: Duration = Duration::from_secs(60);
/// Keepalive ping cadence, ~90% of [`READ_DEADLINE`] (§4.2/§5).
const PING_INTERVAL: Duration = Duration::from_secs(54);
/// Per-write deadline; a stalled peer never blocks the write pump (§5).
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
/// Deadline for the final close-frame send on teardown (§4.1's "1 s
/// per-send deadline" for the shutdown broadcast; applied uniformly to
/// every close send, including sweeper evictions).
const CLOSE_SEND_DEADLINE: Duration = Duration::from_secs(1);
/// Inbound message size cap (§4.2: "≥ 2 KiB suffices for all schemas here").
const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// `GET /ws` — the single upgrade path C1 accepts.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_BYTES).on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    let peer_addr = addr.to_string();
    let (session, outbound_rx) = Session::new(peer_addr.clone(), &state.shutdown);
    state.sessions.register(Arc::clone(&session)).await;
    tracing::info!(peer = %peer_addr, "session connected");

    let (sink, stream) = socket.split();
    let mut read_task = tokio::spawn(read_pump(Arc::clone(&session), stream, Arc::clone(&state.router)));
    let mut write_task = tokio::spawn(write_pump(Arc::clone(&session), sink, outbound_rx));

    // Whichever pump exits first (normal close, error, or a caught panic)
    // drives teardown of the other, per §4.2's panic-safety requirement.
    tokio::select! {
        _ = &mut read_task => {}
        _ = &mut write_task => {}
    }
    session.close();
    let _ = read_task.await;
    let _ = write_task.await;

    state.rooms.remove_client_from_all_rooms(&session).await;
    state.sessions.deregister(&session).await;
    tracing::info!(peer = %peer_addr, "session disconnected");
}

async fn read_pump(session: Arc<Session>, mut stream: SplitStream<WebSocket>, router: Arc<Router>) {
    loop {
        tokio::select! {
            _ = session.cancel.cancelled() => break,
            received = tokio::time::timeout(READ_DEADLINE, stream.next()) => {
                match received {
                    Ok(Some(Ok(message))) => {
                        if !handle_inbound(&session, &router, message).await {
                            break;
                        }
                    }
                    Ok(Some(Err(e))) => {
                        tracing::debug!(peer = %session.peer_addr(), err = %e, "websocket read error");
                        break;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        tracing::debug!(peer = %session.peer_addr(), "read deadline elapsed, closing");
                        break;
                    }
                }
            }
        }
    }
    session.close();
}

/// Returns `false` once the peer has signaled close and the read loop should stop.
async fn handle_inbound(session: &Arc<Session>, router: &Arc<Router>, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            session.touch();
            match serde_json::from_str::<InboundFrame>(&text) {
                Ok(frame) => router.dispatch(session, frame).await,
                Err(e) => {
                    tracing::debug!(peer = %session.peer_addr(), err = %e, "malformed inbound frame, ignoring")
                }
            }
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            session.touch();
            true
        }
        Message::Close(_) => false,
        Message::Binary(_) => true,
    }
}

async fn write_pump(
    session: Arc<Session>,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundFrame>,
) {
    let mut ping_ticker = tokio::time::interval(PING_INTERVAL);
    ping_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping_ticker.tick().await;

    loop {
        tokio::select! {
            _ = session.cancel.cancelled() => break,
            _ = ping_ticker.tick() => {
                if send_with_deadline(&mut sink, Message::Ping(Vec::new().into()), WRITE_DEADLINE).await.is_err() {
                    session.close();
                    break;
                }
            }
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => {
                        let Ok(text) = serde_json::to_string(&frame) else { continue };
                        if send_with_deadline(&mut sink, Message::Text(text.into()), WRITE_DEADLINE).await.is_err() {
                            session.close();
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let reason = session.take_close_reason().unwrap_or_default();
    let close = Message::Close(Some(CloseFrame { code: 1000, reason: reason.into() }));
    let _ = send_with_deadline(&mut sink, close, CLOSE_SEND_DEADLINE).await;
    let _ = sink.close().await;
}

async fn send_with_deadline(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    deadline: Duration,
) -> Result<(), ()> {
    match tokio::time::timeout(deadline, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) | Err(_) => Err(()),
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
