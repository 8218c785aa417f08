// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic CPU/RAM metrics, broadcast into the `metrics` room while occupied.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::probes::MetricsProbe;
use crate::rooms::RoomRegistry;

use super::COLLECTOR_INTERVAL;

const ROOM: &str = "metrics";
const KIND: &str = "metrics";

pub struct MetricsCollector {
    probe: Arc<dyn MetricsProbe>,
    rooms: Arc<RoomRegistry>,
    parent_scope: CancellationToken,
    running: std::sync::Mutex<Option<CancellationToken>>,
}

impl MetricsCollector {
    pub fn new(probe: Arc<dyn MetricsProbe>, rooms: Arc<RoomRegistry>, parent_scope: CancellationToken) -> Arc<Self> {
        Arc::new(Self { probe, rooms, parent_scope, running: std::sync::Mutex::new(None) })
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    /// Idempotent: a second call while already running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut guard = self.running.lock().unwrap_or_else(|p| p.into_inner());
        if guard.is_some() {
            return;
        }
        let token = self.parent_scope.child_token();
        *guard = Some(token.clone());
        drop(guard);

        tracing::debug!("starting metrics collector");
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(token).await });
    }

    /// Idempotent: stopping an already-stopped collector is a no-op.
    pub fn stop(&self) {
        let mut guard = self.running.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(token) = guard.take() {
            tracing::debug!("stopping metrics collector");
            token.cancel();
        }
    }

    async fn run(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(COLLECTOR_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.emit().await,
            }
        }
    }

    async fn emit(&self) {
        let cpu = match self.probe.cpu_metrics() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(err = %e, "metrics probe failed to read cpu metrics");
                return;
            }
        };
        let ram = match self.probe.ram_metrics() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(err = %e, "metrics probe failed to read ram metrics");
                return;
            }
        };

        let payload = serde_json::json!({
            "cpuMetrics": cpu,
            "ramMetrics": ram,
            "timestamp": crate::state::epoch_ms() / 1000,
        });
        self.rooms.broadcast_to_room(ROOM, KIND, payload, None).await;
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
