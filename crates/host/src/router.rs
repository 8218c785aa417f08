// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound frame dispatch and the authorization gate (C3).

use std::sync::Arc;

use crate::auth::handler::{handle_auth_check, handle_auth_request};
use crate::auth::AuthManager;
use crate::commands::{handle_host_info, handle_media_command, handle_power_command};
use crate::error::HostError;
use crate::power::LockState;
use crate::probes::{HostInfoProbe, MediaControlProbe, PowerProbe, PrivilegeProbe};
use crate::rooms::RoomRegistry;
use crate::session::Session;
use crate::wire::InboundFrame;

const KIND_PING: &str = "ping";
const KIND_PONG: &str = "pong";
const KIND_AUTH_REQUEST: &str = "auth_request";
const KIND_AUTH_CHECK: &str = "auth_check";
const KIND_HOST_INFO: &str = "host_info";
const KIND_JOIN_ROOM: &str = "join_room";
const KIND_LEAVE_ROOM: &str = "leave_room";
const KIND_MEDIA: &str = "media";
const KIND_POWER: &str = "power";

/// Bundles every collaborator a dispatched frame might need.
pub struct Router {
    pub auth: Arc<AuthManager>,
    pub rooms: Arc<RoomRegistry>,
    pub host_info: Arc<dyn HostInfoProbe>,
    pub privilege: Arc<dyn PrivilegeProbe>,
    pub media_control: Arc<dyn MediaControlProbe>,
    pub power: Arc<dyn PowerProbe>,
    pub lock_state: Arc<LockState>,
}

impl Router {
    /// Exempt from the authorization gate: the handshake itself, and a bare
    /// liveness probe.
    fn is_exempt(kind: &str) -> bool {
        matches!(kind, KIND_AUTH_REQUEST | KIND_AUTH_CHECK | KIND_PING)
    }

    pub async fn dispatch(&self, session: &Arc<Session>, frame: InboundFrame) {
        if !Self::is_exempt(&frame.kind) && !self.auth.is_authorized(&session.identifier()).await {
            session.send_error(&frame.kind, HostError::Unauthorized, "device is not authorized");
            return;
        }

        match frame.kind.as_str() {
            KIND_PING => self.pong(session, frame.data),
            KIND_AUTH_REQUEST => handle_auth_request(&self.auth, session, frame.data).await,
            KIND_AUTH_CHECK => handle_auth_check(&self.auth, session).await,
            KIND_HOST_INFO => handle_host_info(session, &self.host_info, &self.privilege),
            KIND_JOIN_ROOM => self.join_room(session, frame.room).await,
            KIND_LEAVE_ROOM => self.leave_room(session, frame.room).await,
            KIND_MEDIA => handle_media_command(session, &self.rooms, &self.media_control, frame.data).await,
            KIND_POWER => handle_power_command(session, &self.power, &self.lock_state, frame.data).await,
            other => {
                tracing::debug!(kind = other, peer = %session.peer_addr(), "ignoring unknown frame type");
            }
        }
    }

    /// Echoes the request's `timestamp`, falling back to server time if the
    /// client omitted it (§4.3/§6).
    fn pong(&self, session: &Arc<Session>, data: Option<serde_json::Value>) {
        let timestamp = data
            .as_ref()
            .and_then(|d| d.get("timestamp"))
            .cloned()
            .unwrap_or_else(|| serde_json::json!(crate::state::epoch_ms() / 1000));
        session.send_success(KIND_PONG, serde_json::json!({ "timestamp": timestamp }));
    }

    async fn join_room(&self, session: &Arc<Session>, room: Option<String>) {
        let Some(room) = room.filter(|r| !r.is_empty()) else {
            session.send_error(KIND_JOIN_ROOM, HostError::BadRequest, "room name is required");
            return;
        };
        self.rooms.add_client_to_room(&room, session).await;
        session.send_success(KIND_JOIN_ROOM, serde_json::json!({ "room": room }));
    }

    async fn leave_room(&self, session: &Arc<Session>, room: Option<String>) {
        let Some(room) = room.filter(|r| !r.is_empty()) else {
            session.send_error(KIND_LEAVE_ROOM, HostError::BadRequest, "room name is required");
            return;
        };
        self.rooms.remove_client_from_room(&room, session).await;
        session.send_success(KIND_LEAVE_ROOM, serde_json::json!({ "room": room }));
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
