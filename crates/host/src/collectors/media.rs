// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic now-playing/volume state, broadcast into the `media` room while
//! occupied. Redundant now-playing emissions are suppressed (§4.8).

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::probes::{MediaCapabilities, MediaProbe, NowPlaying};
use crate::rooms::RoomRegistry;

use super::COLLECTOR_INTERVAL;

const ROOM: &str = "media";
const KIND: &str = "media";

#[derive(Serialize)]
struct MediaPayload {
    #[serde(rename = "nowPlaying", skip_serializing_if = "Option::is_none")]
    now_playing: Option<NowPlaying>,
    #[serde(rename = "mediaCapabilities", skip_serializing_if = "Option::is_none")]
    media_capabilities: Option<MediaCapabilities>,
}

/// True when `next` would be an indistinguishable restatement of `prev`: same
/// identity fields and playing flag, and — when either reports a finite
/// duration — a playback position drift under 2 s.
fn now_playing_unchanged(prev: &NowPlaying, next: &NowPlaying) -> bool {
    if prev.title != next.title
        || prev.artist != next.artist
        || prev.album != next.album
        || prev.application != next.application
        || prev.is_playing != next.is_playing
    {
        return false;
    }
    if prev.duration > 0 || next.duration > 0 {
        if prev.duration != next.duration {
            return false;
        }
        return (prev.position - next.position).abs() < 2;
    }
    true
}

pub struct MediaCollector {
    probe: Arc<dyn MediaProbe>,
    rooms: Arc<RoomRegistry>,
    parent_scope: CancellationToken,
    running: std::sync::Mutex<Option<CancellationToken>>,
    last_now_playing: std::sync::Mutex<Option<NowPlaying>>,
}

impl MediaCollector {
    pub fn new(probe: Arc<dyn MediaProbe>, rooms: Arc<RoomRegistry>, parent_scope: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            probe,
            rooms,
            parent_scope,
            running: std::sync::Mutex::new(None),
            last_now_playing: std::sync::Mutex::new(None),
        })
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

        *self.last_now_playing.lock().unwrap_or_else(|p| p.into_inner()) = None;

        tracing::debug!("starting media collector");
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(token).await });
    }

    /// Idempotent: stopping an already-stopped collector is a no-op.
    pub fn stop(&self) {
        let mut guard = self.running.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(token) = guard.take() {
            tracing::debug!("stopping media collector");
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
        let now_playing = match self.probe.now_playing() {
            Ok(np) => Some(np),
            Err(e) => {
                tracing::warn!(err = %e, "media probe failed to read now-playing state");
                None
            }
        };
        let media_capabilities = match self.probe.audio_capabilities() {
            Ok(caps) => Some(caps),
            Err(e) => {
                tracing::warn!(err = %e, "media probe failed to read audio capabilities");
                None
            }
        };

        if now_playing.is_none() && media_capabilities.is_none() {
            return;
        }

        let now_playing_to_send = match &now_playing {
            Some(next) => {
                let mut last = self.last_now_playing.lock().unwrap_or_else(|p| p.into_inner());
                let unchanged = last.as_ref().is_some_and(|prev| now_playing_unchanged(prev, next));
                *last = Some(next.clone());
                if unchanged { None } else { Some(next.clone()) }
            }
            None => None,
        };

        let payload = MediaPayload { now_playing: now_playing_to_send, media_capabilities };
        let value = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(err = %e, "failed to serialize media payload");
                return;
            }
        };
        self.rooms.broadcast_to_room(ROOM, KIND, value, None).await;
    }
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
