// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide session set (C1's registry) and the bundle of shared
//! collaborators handed to every connection and background task.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::rooms::RoomRegistry;
use crate::router::Router;
use crate::session::Session;

/// Every currently-registered connection. A single owned value constructed at
/// startup and destroyed at shutdown (§9: "avoid module-level singletons").
/// Membership mirrors live connections, not room membership — a session is
/// registered here the moment it upgrades and removed once its pumps exit.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<Vec<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session: Arc<Session>) {
        self.sessions.write().await.push(session);
    }

    /// Idempotent: removing a session that isn't registered is a no-op.
    pub async fn deregister(&self, session: &Arc<Session>) {
        self.sessions.write().await.retain(|s| !Arc::ptr_eq(s, session));
    }

    /// A point-in-time copy, safe to iterate without holding the registry
    /// lock across any per-session operation (sweeper, shutdown broadcast).
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Shared collaborators every connection task and background task needs a
/// handle to. Constructed once in [`crate::run`] and destroyed at shutdown.
pub struct AppState {
    pub sessions: SessionRegistry,
    pub rooms: Arc<RoomRegistry>,
    pub router: Arc<Router>,
    pub shutdown: CancellationToken,
}

/// Current wall-clock time in epoch milliseconds. Used for session activity
/// timestamps and the power lock clock; never for scheduling decisions that
/// need monotonic time (those use `tokio::time::Instant`).
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
