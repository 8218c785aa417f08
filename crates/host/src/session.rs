// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single client connection's state, capability set, and send queue.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::HostError;
use crate::wire::OutboundFrame;

/// Bounded send-queue depth. Backpressure policy on overflow is drop-and-close,
/// never block — the queue only needs to absorb a producer burst, not a slow
/// client indefinitely.
const SEND_QUEUE_DEPTH: usize = 64;

/// One per live client connection. The router, auth manager, and room
/// registry depend only on this capability set (get/set identifier, get/set
/// device name, send success/error, is-closed, close) — never on the
/// underlying socket.
pub struct Session {
    pub peer_addr: String,
    identifier: Mutex<String>,
    device_name: Mutex<String>,
    rooms: Mutex<HashSet<String>>,
    closed: AtomicBool,
    last_activity_ms: AtomicU64,
    outbound_tx: mpsc::Sender<OutboundFrame>,
    close_reason: Mutex<Option<String>>,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(
        peer_addr: String,
        parent_scope: &CancellationToken,
    ) -> (std::sync::Arc<Self>, mpsc::Receiver<OutboundFrame>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(SEND_QUEUE_DEPTH);
        let session = Self {
            peer_addr,
            identifier: Mutex::new(String::new()),
            device_name: Mutex::new(String::new()),
            rooms: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            last_activity_ms: AtomicU64::new(crate::state::epoch_ms()),
            outbound_tx,
            close_reason: Mutex::new(None),
            cancel: parent_scope.child_token(),
        };
        (std::sync::Arc::new(session), outbound_rx)
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn identifier(&self) -> String {
        self.identifier.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set_identifier(&self, id: impl Into<String>) {
        *self.identifier.lock().unwrap_or_else(|p| p.into_inner()) = id.into();
    }

    pub fn device_name(&self) -> String {
        self.device_name.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set_device_name(&self, name: impl Into<String>) {
        *self.device_name.lock().unwrap_or_else(|p| p.into_inner()) = name.into();
    }

    /// Snapshot of rooms this session currently believes it has joined.
    pub fn joined_rooms(&self) -> Vec<String> {
        self.rooms.lock().unwrap_or_else(|p| p.into_inner()).iter().cloned().collect()
    }

    /// Called only by the room registry, under its own critical section.
    pub(crate) fn mark_joined(&self, room: &str) {
        self.rooms.lock().unwrap_or_else(|p| p.into_inner()).insert(room.to_owned());
    }

    /// Called only by the room registry, under its own critical section.
    pub(crate) fn mark_left(&self, room: &str) {
        self.rooms.lock().unwrap_or_else(|p| p.into_inner()).remove(room);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent. Marks the session closed and cancels its scope; the write
    /// pump observes the cancellation and tears down the connection.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.cancel.cancel();
        }
    }

    /// Idempotent. Like [`Self::close`], but records `reason` first so the
    /// write pump's final close frame carries it (§4.1's "going away" /
    /// "inactive" close reasons). The reason is set before cancellation so
    /// there is no race between recording it and the write pump observing
    /// the cancelled scope.
    pub fn close_with_reason(&self, reason: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        *self.close_reason.lock().unwrap_or_else(|p| p.into_inner()) = Some(reason.into());
        self.close();
    }

    /// Consumes the close reason recorded by [`Self::close_with_reason`], if any.
    pub(crate) fn take_close_reason(&self) -> Option<String> {
        self.close_reason.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    pub fn touch(&self) {
        self.last_activity_ms.store(crate::state::epoch_ms(), Ordering::Relaxed);
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Enqueue a success frame. Never blocks; drops and closes on overflow.
    pub fn send_success(&self, kind: impl Into<String>, data: serde_json::Value) {
        self.enqueue(OutboundFrame::success(kind, data));
    }

    /// Enqueue an error frame. Never blocks; drops and closes on overflow.
    pub fn send_error(&self, kind: impl Into<String>, err: HostError, message: impl Into<String>) {
        self.enqueue(OutboundFrame::error(kind, err, message));
    }

    fn enqueue(&self, frame: OutboundFrame) {
        if self.is_closed() {
            return;
        }
        if self.outbound_tx.try_send(frame).is_err() {
            tracing::warn!(peer = %self.peer_addr, "send queue full or closed, closing session");
            self.close();
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
