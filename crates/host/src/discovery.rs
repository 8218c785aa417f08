// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mDNS advertisement of this host under `_linqora._tcp` (C9).

use mdns_sd::{ServiceDaemon, ServiceInfo};

const SERVICE_TYPE: &str = "_linqora._tcp.local.";

/// Lowercases `hostname` and replaces spaces with underscores, per §6's
/// service-name derivation rule.
fn normalize_instance_name(hostname: &str) -> String {
    hostname.to_lowercase().replace(' ', "_")
}

/// Wraps the mDNS daemon for the lifetime of the advertisement. The core
/// never depends on clients actually using discovery; failures here are
/// logged, not propagated as a server-startup error.
pub struct DiscoveryPublisher {
    daemon: ServiceDaemon,
    fullname: String,
}

impl DiscoveryPublisher {
    /// Advertises this host's WebSocket endpoint. `hostname` is used both as
    /// the mDNS instance name (normalized) and in the `hostname` TXT record.
    pub fn start(hostname: &str, port: u16, enable_tls: bool) -> anyhow::Result<Self> {
        let daemon = ServiceDaemon::new()?;
        let instance_name = normalize_instance_name(hostname);
        let host_label = format!("{instance_name}.local.");
        let tls_flag = if enable_tls { "true" } else { "false" };
        let properties = [("hostname", hostname), ("tls", tls_flag)];

        let service_info =
            ServiceInfo::new(SERVICE_TYPE, &instance_name, &host_label, "", port, &properties[..])?
                .enable_addr_auto();
        let fullname = service_info.get_fullname().to_owned();

        daemon.register(service_info)?;
        tracing::info!(instance_name, port, tls = enable_tls, "advertising via mDNS");

        Ok(Self { daemon, fullname })
    }

    /// Unregisters the service and shuts the daemon's background thread down.
    pub fn stop(self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            tracing::warn!(err = %e, "failed to unregister mDNS service");
        }
        if let Err(e) = self.daemon.shutdown() {
            tracing::warn!(err = %e, "failed to shut down mDNS daemon");
        }
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
