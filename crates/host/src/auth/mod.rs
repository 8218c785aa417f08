// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorization manager: tracks approved identifiers, pending requests, and
//! drives the operator-approval handshake with a 30 s timeout.

pub mod handler;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, Mutex};

use crate::config::{DeviceAuth, PersistedConfig};

/// Hard timeout on a pending authorization, per §4.4/§5.
pub const PENDING_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Floor below which a claimed client version is rejected, per §4.4.2.
pub const MIN_VERSION_CLIENT: &str = "0.1.0";

/// A not-yet-decided request awaiting operator input.
#[derive(Debug, Clone)]
pub struct PendingAuthRequest {
    pub device_name: String,
    pub device_id: String,
    pub ip: String,
    pub requested_at: SystemTime,
}

/// Outcome of a decided (or expired) pending request, kept distinct so a
/// timeout is never reported to the client as an operator rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    Approved,
    Rejected,
    TimedOut,
}

/// Closed enumeration of authorization status codes (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    NotAuthorized,
    Authorized,
    Approved,
    Pending,
    Rejected,
    InvalidFormat,
    MissingDeviceId,
    UnsupportedVersion,
    Timeout,
    RequestFailed,
}

impl AuthStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::NotAuthorized => 1,
            Self::Authorized => 100,
            Self::Approved => 101,
            Self::Pending => 200,
            Self::Rejected => 400,
            Self::InvalidFormat => 401,
            Self::MissingDeviceId => 402,
            Self::UnsupportedVersion => 403,
            Self::Timeout => 500,
            Self::RequestFailed => 501,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotAuthorized => "Device not authorized",
            Self::Authorized => "Device authorized",
            Self::Approved => "Authorization approved",
            Self::Rejected => "Authorization rejected",
            Self::Pending => "Waiting for authorization",
            Self::InvalidFormat => "Invalid authorization data format",
            Self::MissingDeviceId => "Device ID is missing",
            Self::UnsupportedVersion => "Unsupported client version",
            Self::Timeout => "Authorization timeout",
            Self::RequestFailed => "Authorization request failed",
        }
    }
}

/// Per-identifier state machine: `unknown` -> `pending` -> `approved`, plus
/// the approved-device list persisted to the operator's config file.
pub struct AuthManager {
    persisted: Mutex<PersistedConfig>,
    config_path: PathBuf,
    pending: Mutex<HashMap<String, PendingAuthRequest>>,
    pending_results: Mutex<HashMap<String, PendingOutcome>>,
    pending_tx: mpsc::Sender<PendingAuthRequest>,
}

impl AuthManager {
    pub fn new(
        persisted: PersistedConfig,
        config_path: PathBuf,
        pending_tx: mpsc::Sender<PendingAuthRequest>,
    ) -> Self {
        Self {
            persisted: Mutex::new(persisted),
            config_path,
            pending: Mutex::new(HashMap::new()),
            pending_results: Mutex::new(HashMap::new()),
            pending_tx,
        }
    }

    pub async fn is_authorized(&self, device_id: &str) -> bool {
        if device_id.is_empty() {
            return false;
        }
        self.persisted.lock().await.authorized_devices.iter().any(|d| d.device_id == device_id)
    }

    /// Returns `true` if an unknown-identifier request was newly created
    /// (caller should enter `pending`); `false` if one was already pending
    /// for this identifier (caller should treat that as idempotent, not an
    /// error).
    pub async fn request_authorization(
        self: &std::sync::Arc<Self>,
        device_name: String,
        device_id: String,
        ip: String,
    ) -> bool {
        {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(&device_id) {
                tracing::debug!(device_id, "authorization request already pending");
                return false;
            }
            pending.insert(
                device_id.clone(),
                PendingAuthRequest {
                    device_name: device_name.clone(),
                    device_id: device_id.clone(),
                    ip: ip.clone(),
                    requested_at: SystemTime::now(),
                },
            );
        }

        let request =
            PendingAuthRequest { device_name, device_id: device_id.clone(), ip, requested_at: SystemTime::now() };

        let tx = self.pending_tx.clone();
        let enqueue_id = device_id.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(Duration::from_secs(1), tx.send(request)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => tracing::warn!(device_id = %enqueue_id, "operator-approval channel closed"),
                Err(_) => {
                    tracing::warn!(device_id = %enqueue_id, "operator-approval channel full; request may be delayed")
                }
            }
        });

        let this = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(PENDING_AUTH_TIMEOUT).await;
            this.expire_pending(&device_id).await;
        });

        true
    }

    async fn expire_pending(&self, device_id: &str) {
        let removed = self.pending.lock().await.remove(device_id).is_some();
        if removed {
            self.pending_results.lock().await.insert(device_id.to_owned(), PendingOutcome::TimedOut);
            tracing::info!(device_id, "authorization request timed out");
        }
    }

    /// A decision for an unknown (already-decided, or never-requested)
    /// identifier is a harmless no-op — the 30 s window may have already
    /// closed it out from under the caller.
    pub async fn respond(&self, device_id: &str, approved: bool) {
        let request = {
            let mut pending = self.pending.lock().await;
            match pending.remove(device_id) {
                Some(request) => request,
                None => {
                    tracing::debug!(device_id, "RespondToAuthRequest for unknown device, ignoring");
                    return;
                }
            }
        };

        let outcome = if approved { PendingOutcome::Approved } else { PendingOutcome::Rejected };
        self.pending_results.lock().await.insert(device_id.to_owned(), outcome);

        if approved {
            let record = DeviceAuth {
                device_name: request.device_name,
                device_id: device_id.to_owned(),
                last_auth: format_timestamp(),
            };

            let mut persisted = self.persisted.lock().await;
            persisted.authorized_devices.retain(|d| d.device_id != device_id);
            persisted.authorized_devices.push(record);
            drop(persisted);

            self.persist().await;
        }
    }

    /// Consumes (removes) any observed result for `device_id`.
    pub async fn check_pending_result(&self, device_id: &str) -> Option<PendingOutcome> {
        self.pending_results.lock().await.remove(device_id)
    }

    pub async fn revoke(&self, device_id: &str) {
        let mut persisted = self.persisted.lock().await;
        let before = persisted.authorized_devices.len();
        persisted.authorized_devices.retain(|d| d.device_id != device_id);
        let changed = persisted.authorized_devices.len() != before;
        drop(persisted);

        if changed {
            tracing::info!(device_id, "authorization revoked");
            self.persist().await;
        }
    }

    pub async fn list_devices(&self) -> Vec<DeviceAuth> {
        self.persisted.lock().await.authorized_devices.clone()
    }

    pub fn is_version_supported(version: &str) -> bool {
        match (semver::Version::parse(version), semver::Version::parse(MIN_VERSION_CLIENT)) {
            (Ok(client), Ok(floor)) => client >= floor,
            _ => false,
        }
    }

    async fn persist(&self) {
        let snapshot = self.persisted.lock().await.clone();
        let path = self.config_path.clone();
        let result = tokio::task::spawn_blocking(move || snapshot.save(&path)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(err = %e, "failed to persist config"),
            Err(e) => tracing::warn!(err = %e, "config persistence task panicked"),
        }
    }
}

fn format_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
#[path = "../auth_tests.rs"]
mod tests;
