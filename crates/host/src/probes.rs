// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed contracts for OS-specific collaborators.
//!
//! None of these are implemented against a real OS here — a concrete probe is
//! a platform-specific crate feature this workspace does not carry. Every
//! trait method either returns a documented safe default or an error the
//! caller is expected to log and skip, per the "missing facts are safe
//! defaults, not errors" rule for host facts and the "probe failures are
//! logged and skipped" rule for collectors.

use serde::{Deserialize, Serialize};

/// Static host facts, as reported by [`HostInfoProbe`]. Default trait methods
/// double as the safe-default fallback when a probe cannot determine a fact.
pub trait HostInfoProbe: Send + Sync {
    fn os_label(&self) -> String {
        "unknown".to_owned()
    }
    fn hostname(&self) -> String {
        "unknown".to_owned()
    }
    fn cpu_model(&self) -> String {
        "unknown".to_owned()
    }
    fn cpu_frequency_mhz(&self) -> f64 {
        0.0
    }
    /// (physical cores, logical cores).
    fn cpu_cores(&self) -> (u32, u32) {
        (0, 0)
    }
    fn ram_total_bytes(&self) -> f64 {
        0.0
    }
}

/// Reports whether the current process holds elevated (root/admin) rights.
pub trait PrivilegeProbe: Send + Sync {
    fn is_elevated(&self) -> bool {
        false
    }
}

/// Periodic system metrics probe backing the `metrics` collector.
pub trait MetricsProbe: Send + Sync {
    fn cpu_metrics(&self) -> anyhow::Result<serde_json::Value>;
    fn ram_metrics(&self) -> anyhow::Result<serde_json::Value>;
}

/// A snapshot of the currently playing media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub application: String,
    pub is_playing: bool,
    /// Track duration in seconds; 0 when unknown.
    pub duration: i64,
    /// Playback position in seconds.
    pub position: i64,
}

/// Audio output capabilities (volume control, mute state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCapabilities {
    pub volume: Option<f64>,
    pub muted: Option<bool>,
}

/// Periodic media/now-playing probe backing the `media` collector.
pub trait MediaProbe: Send + Sync {
    fn now_playing(&self) -> anyhow::Result<NowPlaying>;
    fn audio_capabilities(&self) -> anyhow::Result<MediaCapabilities>;
}

/// Closed enumeration of media commands accepted over the wire (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    SetVolume,
    Mute,
    IncreaseVolume,
    DecreaseVolume,
    PlayPause,
    Next,
    Previous,
    GetInfo,
}

impl TryFrom<i64> for MediaAction {
    type Error = ();

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SetVolume),
            1 => Ok(Self::Mute),
            2 => Ok(Self::IncreaseVolume),
            3 => Ok(Self::DecreaseVolume),
            10 => Ok(Self::PlayPause),
            12 => Ok(Self::Next),
            13 => Ok(Self::Previous),
            14 => Ok(Self::GetInfo),
            _ => Err(()),
        }
    }
}

/// Invokes OS-level media/volume control actions.
pub trait MediaControlProbe: Send + Sync {
    fn invoke(&self, action: MediaAction, value: i64) -> anyhow::Result<()>;
}

/// Closed enumeration of power actions accepted over the wire (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
    Lock,
}

impl TryFrom<i64> for PowerAction {
    type Error = ();

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Shutdown),
            1 => Ok(Self::Restart),
            2 => Ok(Self::Lock),
            _ => Err(()),
        }
    }
}

/// Invokes OS-level power actions and reports the OS-level lock state.
pub trait PowerProbe: Send + Sync {
    fn is_system_locked(&self) -> anyhow::Result<bool>;
    fn execute(&self, action: PowerAction) -> anyhow::Result<()>;
}

/// Stub probe set used when no platform-specific collaborator is wired in.
/// Host facts fall back to their safe defaults; metrics/media/power calls
/// fail with a descriptive error for the caller to log and skip.
pub struct NullProbes;

impl HostInfoProbe for NullProbes {}
impl PrivilegeProbe for NullProbes {}

impl MetricsProbe for NullProbes {
    fn cpu_metrics(&self) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("no metrics probe configured for this platform")
    }

    fn ram_metrics(&self) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("no metrics probe configured for this platform")
    }
}

impl MediaProbe for NullProbes {
    fn now_playing(&self) -> anyhow::Result<NowPlaying> {
        anyhow::bail!("no media probe configured for this platform")
    }

    fn audio_capabilities(&self) -> anyhow::Result<MediaCapabilities> {
        anyhow::bail!("no media probe configured for this platform")
    }
}

impl MediaControlProbe for NullProbes {
    fn invoke(&self, _action: MediaAction, _value: i64) -> anyhow::Result<()> {
        anyhow::bail!("no media control probe configured for this platform")
    }
}

impl PowerProbe for NullProbes {
    fn is_system_locked(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn execute(&self, _action: PowerAction) -> anyhow::Result<()> {
        anyhow::bail!("no power probe configured for this platform")
    }
}

#[cfg(test)]
#[path = "probes_tests.rs"]
mod tests;
