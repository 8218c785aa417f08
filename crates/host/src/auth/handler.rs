// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level handling of `auth_request`/`auth_check`, including the
//! bounded (30 s, 1 s tick) poller that delivers a delayed operator decision.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::{AuthManager, AuthStatus, PendingOutcome, PENDING_AUTH_TIMEOUT};
use crate::session::Session;

const KIND_AUTH_RESPONSE: &str = "auth_response";
const KIND_AUTH_PENDING: &str = "auth_pending";

#[derive(Debug, Deserialize)]
struct AuthRequestData {
    #[serde(rename = "deviceId")]
    device_id: String,
    #[serde(rename = "deviceName")]
    device_name: String,
    ip: String,
    #[serde(rename = "versionClient")]
    version_client: String,
}

fn send_status(session: &Session, kind: &str, status: AuthStatus, success: bool) {
    session.send_success(
        kind,
        serde_json::json!({
            "success": success,
            "code": status.code(),
            "message": status.message(),
        }),
    );
}

/// Handle an inbound `auth_request` frame.
pub async fn handle_auth_request(
    auth: &Arc<AuthManager>,
    session: &Arc<Session>,
    data: Option<serde_json::Value>,
) {
    let auth_data = match data.map(serde_json::from_value::<AuthRequestData>) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            tracing::warn!(err = %e, "malformed auth_request data");
            send_status(session, KIND_AUTH_RESPONSE, AuthStatus::InvalidFormat, false);
            return;
        }
        None => {
            send_status(session, KIND_AUTH_RESPONSE, AuthStatus::InvalidFormat, false);
            return;
        }
    };

    if auth_data.device_id.is_empty() {
        send_status(session, KIND_AUTH_RESPONSE, AuthStatus::MissingDeviceId, false);
        return;
    }

    if !AuthManager::is_version_supported(&auth_data.version_client) {
        send_status(session, KIND_AUTH_RESPONSE, AuthStatus::UnsupportedVersion, false);
        return;
    }

    if auth.is_authorized(&auth_data.device_id).await {
        session.set_identifier(auth_data.device_id);
        session.set_device_name(auth_data.device_name);
        send_status(session, KIND_AUTH_RESPONSE, AuthStatus::Authorized, true);
        return;
    }

    session.set_identifier(auth_data.device_id.clone());
    session.set_device_name(auth_data.device_name.clone());

    auth.request_authorization(auth_data.device_name, auth_data.device_id.clone(), auth_data.ip).await;
    send_status(session, KIND_AUTH_PENDING, AuthStatus::Pending, false);

    spawn_poller(Arc::clone(auth), Arc::clone(session), auth_data.device_id);
}

/// Handle an inbound `auth_check` frame: report current status without
/// starting a new request.
pub async fn handle_auth_check(auth: &Arc<AuthManager>, session: &Arc<Session>) {
    let device_id = session.identifier();
    if device_id.is_empty() {
        send_status(session, KIND_AUTH_RESPONSE, AuthStatus::NotAuthorized, false);
        return;
    }

    if auth.is_authorized(&device_id).await {
        send_status(session, KIND_AUTH_RESPONSE, AuthStatus::Authorized, true);
        return;
    }

    match auth.check_pending_result(&device_id).await {
        Some(PendingOutcome::Approved) => send_status(session, KIND_AUTH_RESPONSE, AuthStatus::Approved, true),
        Some(PendingOutcome::Rejected) => send_status(session, KIND_AUTH_RESPONSE, AuthStatus::Rejected, false),
        Some(PendingOutcome::TimedOut) => send_status(session, KIND_AUTH_RESPONSE, AuthStatus::Timeout, false),
        None => send_status(session, KIND_AUTH_PENDING, AuthStatus::Pending, false),
    }
}

/// Ticks every second for up to 30 s watching for a decision on `device_id`,
/// exits early if the session closes.
fn spawn_poller(auth: Arc<AuthManager>, session: Arc<Session>, device_id: String) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let deadline = tokio::time::Instant::now() + PENDING_AUTH_TIMEOUT;

        loop {
            tokio::select! {
                _ = session.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            if let Some(result) = auth.check_pending_result(&device_id).await {
                match result {
                    PendingOutcome::Approved => send_status(&session, KIND_AUTH_RESPONSE, AuthStatus::Approved, true),
                    PendingOutcome::Rejected => send_status(&session, KIND_AUTH_RESPONSE, AuthStatus::Rejected, false),
                    PendingOutcome::TimedOut => send_status(&session, KIND_AUTH_RESPONSE, AuthStatus::Timeout, false),
                }
                return;
            }

            if tokio::time::Instant::now() >= deadline {
                send_status(&session, KIND_AUTH_RESPONSE, AuthStatus::Timeout, false);
                return;
            }
        }
    });
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
