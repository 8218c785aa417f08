// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `host_info`, `media`, and `power` command handlers (C10).

use std::sync::Arc;

use serde::Deserialize;

use crate::error::HostError;
use crate::power::{handle_power_action, LockState, PowerOutcome};
use crate::probes::{HostInfoProbe, MediaAction, MediaControlProbe, PowerAction, PowerProbe, PrivilegeProbe};
use crate::rooms::RoomRegistry;
use crate::session::Session;

const KIND_HOST_INFO: &str = "host_info";
const KIND_MEDIA: &str = "media";
const KIND_POWER: &str = "power";
const ROOM_MEDIA: &str = "media";

/// Collects static host facts. A fact a probe cannot determine falls back to
/// its documented safe default rather than failing the whole request.
pub fn handle_host_info(
    session: &Session,
    host_info: &Arc<dyn HostInfoProbe>,
    privilege: &Arc<dyn PrivilegeProbe>,
) {
    let (physical_cores, logical_cores) = host_info.cpu_cores();
    session.send_success(
        KIND_HOST_INFO,
        serde_json::json!({
            "os": host_info.os_label(),
            "hostname": host_info.hostname(),
            "cpuModel": host_info.cpu_model(),
            "cpuFrequencyMhz": host_info.cpu_frequency_mhz(),
            "cpuCoresPhysical": physical_cores,
            "cpuCoresLogical": logical_cores,
            "ramTotalBytes": host_info.ram_total_bytes(),
            "elevated": privilege.is_elevated(),
        }),
    );
}

#[derive(Debug, Deserialize)]
struct MediaCommandData {
    action: i64,
    #[serde(default)]
    value: i64,
}

/// Requires room membership (`403` otherwise), validates the action
/// (`400`), and reports probe failures as `500`. Membership is checked
/// before the payload is parsed, so a non-member gets `403` even when the
/// payload itself is malformed.
pub async fn handle_media_command(
    session: &Arc<Session>,
    rooms: &RoomRegistry,
    media_control: &Arc<dyn MediaControlProbe>,
    data: Option<serde_json::Value>,
) {
    if !rooms.is_client_in_room(ROOM_MEDIA, session).await {
        session.send_error(KIND_MEDIA, HostError::Forbidden, "Client not in media room");
        return;
    }

    let Some(data) = data else {
        session.send_error(KIND_MEDIA, HostError::BadRequest, "missing media command data");
        return;
    };
    let command: MediaCommandData = match serde_json::from_value(data) {
        Ok(c) => c,
        Err(e) => {
            session.send_error(KIND_MEDIA, HostError::BadRequest, format!("invalid media command: {e}"));
            return;
        }
    };

    let Ok(action) = MediaAction::try_from(command.action) else {
        session.send_error(KIND_MEDIA, HostError::BadRequest, "unknown media action");
        return;
    };

    match media_control.invoke(action, command.value) {
        Ok(()) => session.send_success(
            KIND_MEDIA,
            serde_json::json!({ "action": command.action, "value": command.value, "status": "success" }),
        ),
        Err(e) => {
            tracing::warn!(err = %e, ?action, "media control probe failed");
            session.send_error(KIND_MEDIA, HostError::Internal, "media action failed");
        }
    }
}

#[derive(Debug, Deserialize)]
struct PowerCommandData {
    action: i64,
}

/// Delegates the lock/shutdown/restart decision to [`handle_power_action`]
/// and translates its outcome into a wire reply.
pub async fn handle_power_command(
    session: &Session,
    power_probe: &Arc<dyn PowerProbe>,
    lock_state: &Arc<LockState>,
    data: Option<serde_json::Value>,
) {
    let Some(data) = data else {
        session.send_error(KIND_POWER, HostError::BadRequest, "missing power command data");
        return;
    };
    let command: PowerCommandData = match serde_json::from_value(data) {
        Ok(c) => c,
        Err(e) => {
            session.send_error(KIND_POWER, HostError::BadRequest, format!("invalid power command: {e}"));
            return;
        }
    };

    let Ok(action) = PowerAction::try_from(command.action) else {
        session.send_error(KIND_POWER, HostError::BadRequest, "unknown power action");
        return;
    };

    match handle_power_action(power_probe, lock_state, action).await {
        PowerOutcome::ExecutingAsync => {
            session.send_success(KIND_POWER, serde_json::json!({ "action": command.action, "status": "executing" }));
        }
        PowerOutcome::Locked { locked_at_ms } => {
            session.send_error(
                KIND_POWER,
                HostError::Forbidden,
                format!("system has been locked since {locked_at_ms}"),
            );
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
