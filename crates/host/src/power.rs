// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide lock-state tracking and power-action dispatch (§4.10).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::probes::{PowerAction, PowerProbe};

/// Tracks whether this process believes the session is locked, as a fallback
/// for platforms where the OS-level lock state cannot be queried.
pub struct LockState {
    locked: AtomicBool,
    locked_at_ms: AtomicU64,
}

impl LockState {
    pub fn new() -> Self {
        Self { locked: AtomicBool::new(false), locked_at_ms: AtomicU64::new(0) }
    }

    pub fn mark_locked(&self) {
        self.locked.store(true, Ordering::Release);
        self.locked_at_ms.store(crate::state::epoch_ms(), Ordering::Release);
    }

    pub fn mark_unlocked(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn locked_at_ms(&self) -> u64 {
        self.locked_at_ms.load(Ordering::Acquire)
    }
}

impl Default for LockState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a power command, already shaped for a wire reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOutcome {
    /// Invocation was handed off to a background task; reply with `executing`.
    ExecutingAsync,
    /// Refused: the system is locked. Carries the lock timestamp in ms.
    Locked { locked_at_ms: u64 },
}

/// Decides how to handle `action` given the OS-reported (or process-fallback)
/// lock state, then hands the actual invocation to a blocking background task
/// when the decision allows it. The caller should send its wire reply as soon
/// as this returns, without waiting on the background task.
pub async fn handle_power_action(
    probe: &Arc<dyn PowerProbe>,
    lock_state: &Arc<LockState>,
    action: PowerAction,
) -> PowerOutcome {
    match action {
        PowerAction::Lock => {
            let probe = Arc::clone(probe);
            let lock_state = Arc::clone(lock_state);
            tokio::task::spawn_blocking(move || match probe.execute(PowerAction::Lock) {
                Ok(()) => lock_state.mark_locked(),
                Err(e) => tracing::warn!(err = %e, "lock action failed"),
            });
            PowerOutcome::ExecutingAsync
        }
        PowerAction::Shutdown | PowerAction::Restart => {
            let is_locked = probe.is_system_locked().unwrap_or_else(|e| {
                tracing::debug!(err = %e, "OS lock-state probe failed, falling back to process flag");
                lock_state.is_locked()
            });
            if is_locked {
                return PowerOutcome::Locked { locked_at_ms: lock_state.locked_at_ms() };
            }

            let probe = Arc::clone(probe);
            tokio::task::spawn_blocking(move || {
                if let Err(e) = probe.execute(action) {
                    tracing::warn!(err = %e, ?action, "power action failed");
                }
            });
            PowerOutcome::ExecutingAsync
        }
    }
}

#[cfg(test)]
#[path = "power_tests.rs"]
mod tests;
