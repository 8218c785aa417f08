// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room-gated periodic data producers: start when a room's first member
//! joins, stop when its last member leaves (§4.7).

pub mod media;
pub mod metrics;

use std::sync::Arc;
use std::time::Duration;

use crate::rooms::RoomListener;

/// Tick cadence shared by all collectors.
pub const COLLECTOR_INTERVAL: Duration = Duration::from_secs(2);

const ROOM_METRICS: &str = "metrics";
const ROOM_MEDIA: &str = "media";

/// Bridges room membership transitions to collector start/stop (C7).
pub struct CollectorManager {
    metrics: Arc<metrics::MetricsCollector>,
    media: Arc<media::MediaCollector>,
}

impl CollectorManager {
    pub fn new(metrics: Arc<metrics::MetricsCollector>, media: Arc<media::MediaCollector>) -> Self {
        Self { metrics, media }
    }
}

impl RoomListener for CollectorManager {
    fn on_first_client_joined(&self, room: &str) {
        match room {
            ROOM_METRICS => self.metrics.start(),
            ROOM_MEDIA => self.media.start(),
            _ => {}
        }
    }

    fn on_last_client_left(&self, room: &str) {
        match room {
            ROOM_METRICS => self.metrics.stop(),
            ROOM_MEDIA => self.media.stop(),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
