// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named topic membership with first-joined/last-left notifications.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::Session;

/// Notified when a room transitions between empty and non-empty.
pub trait RoomListener: Send + Sync {
    fn on_first_client_joined(&self, room: &str);
    fn on_last_client_left(&self, room: &str);
}

/// Mapping from room name to member sessions, plus registered listeners.
///
/// Invariant: a session appears in a room's member list iff that room's name
/// is in the session's own joined-set (`Session::joined_rooms`); the two are
/// kept in lockstep by every method here.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Vec<Arc<Session>>>>,
    listeners: RwLock<Vec<Arc<dyn RoomListener>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self { rooms: RwLock::new(HashMap::new()), listeners: RwLock::new(Vec::new()) }
    }

    pub async fn add_listener(&self, listener: Arc<dyn RoomListener>) {
        self.listeners.write().await.push(listener);
    }

    /// Create the room if absent, add the session. Idempotent: a session
    /// already in the room is left untouched. Fires `on_first_client_joined`
    /// to every listener if this insertion created the first member.
    pub async fn add_client_to_room(&self, room: &str, session: &Arc<Session>) {
        let became_first = {
            let mut rooms = self.rooms.write().await;
            let members = rooms.entry(room.to_owned()).or_default();
            if members.iter().any(|m| Arc::ptr_eq(m, session)) {
                return;
            }
            let was_empty = members.is_empty();
            members.push(Arc::clone(session));
            was_empty
        };

        session.mark_joined(room);
        tracing::debug!(room, peer = %session.peer_addr(), "joined room");

        if became_first {
            self.notify_first_joined(room).await;
        }
    }

    /// Remove the session from the room. Idempotent: removing a session that
    /// isn't a member is a no-op. Deletes the room and fires
    /// `on_last_client_left` if this removal emptied it.
    pub async fn remove_client_from_room(&self, room: &str, session: &Arc<Session>) {
        let became_empty = {
            let mut rooms = self.rooms.write().await;
            let Some(members) = rooms.get_mut(room) else {
                return;
            };
            let before = members.len();
            members.retain(|m| !Arc::ptr_eq(m, session));
            if members.len() == before {
                return;
            }
            let empty = members.is_empty();
            if empty {
                rooms.remove(room);
            }
            empty
        };

        session.mark_left(room);
        tracing::debug!(room, peer = %session.peer_addr(), "left room");

        if became_empty {
            self.notify_last_left(room).await;
        }
    }

    /// Remove the session from every room it currently believes it has
    /// joined, releasing the registry lock between removals so this never
    /// nests under a session mutex.
    pub async fn remove_client_from_all_rooms(&self, session: &Arc<Session>) {
        for room in session.joined_rooms() {
            self.remove_client_from_room(&room, session).await;
        }
    }

    pub async fn is_client_in_room(&self, room: &str, session: &Arc<Session>) -> bool {
        let rooms = self.rooms.read().await;
        rooms.get(room).is_some_and(|members| members.iter().any(|m| Arc::ptr_eq(m, session)))
    }

    /// Send `payload` as a `kind` success frame to every member except
    /// `exclude`. Closed sessions are skipped. The registry lock is released
    /// before any session is touched.
    pub async fn broadcast_to_room(
        &self,
        room: &str,
        kind: &str,
        payload: serde_json::Value,
        exclude: Option<&Arc<Session>>,
    ) {
        let members = {
            let rooms = self.rooms.read().await;
            match rooms.get(room) {
                Some(members) => members.clone(),
                None => return,
            }
        };

        for member in &members {
            if let Some(exclude) = exclude {
                if Arc::ptr_eq(member, exclude) {
                    continue;
                }
            }
            if member.is_closed() {
                continue;
            }
            member.send_success(kind.to_owned(), payload.clone());
        }
    }

    pub async fn member_count(&self, room: &str) -> usize {
        self.rooms.read().await.get(room).map_or(0, Vec::len)
    }

    async fn notify_first_joined(&self, room: &str) {
        let listeners = self.listeners.read().await.clone();
        for listener in listeners {
            listener.on_first_client_joined(room);
        }
    }

    async fn notify_last_left(&self, room: &str) {
        let listeners = self.listeners.read().await.clone();
        for listener in listeners {
            listener.on_last_client_left(room);
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "rooms_tests.rs"]
mod tests;
