// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI flags layered over a persisted JSON configuration file.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "linqora_config.json";
const DEFAULT_PORT: u16 = 8070;

/// `linqora-host` command-line surface.
#[derive(Debug, Clone, Parser)]
#[command(name = "linqora-host", version, about = "Host agent for Linqora remote clients")]
pub struct HostConfig {
    /// Port to listen on.
    #[arg(long, env = "LINQORA_PORT")]
    pub port: Option<u16>,

    /// Disable TLS even if certificate material is configured.
    #[arg(long, env = "LINQORA_NOTLS")]
    pub notls: bool,

    /// Path to the TLS certificate (PEM).
    #[arg(long, env = "LINQORA_CERT")]
    pub cert: Option<PathBuf>,

    /// Path to the TLS private key (PEM).
    #[arg(long, env = "LINQORA_KEY")]
    pub key: Option<PathBuf>,

    /// Override the config file path (default: platform user-config dir).
    #[arg(long, env = "LINQORA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Clear all approved devices on startup.
    #[arg(long, env = "LINQORA_RESET_AUTH")]
    pub reset_auth: bool,
}

/// An approved client device, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuth {
    pub device_name: String,
    pub device_id: String,
    /// Formatted `%Y-%m-%d %H:%M:%S`, matching the original host's timestamp style.
    pub last_auth: String,
}

/// On-disk configuration, read at startup and rewritten on every approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedConfig {
    pub port: u16,
    pub enable_tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub authorized_devices: Vec<DeviceAuth>,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            enable_tls: false,
            cert_file: None,
            key_file: None,
            authorized_devices: Vec::new(),
        }
    }
}

impl PersistedConfig {
    /// Load from `path`, creating a default file there if none exists yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!(err = %e, "failed to write initial config");
            }
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save atomically (write to a temp file, then rename over the target).
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Resolve the config file path: `--config`/`LINQORA_CONFIG_DIR` override, else the
/// platform user-config directory, else the current directory.
pub fn config_path(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }

    let base = std::env::var_os("LINQORA_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("linqora").join(CONFIG_FILE_NAME)
}

/// Effective runtime configuration: CLI flags layered over the persisted file.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub port: u16,
    pub enable_tls: bool,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub config_path: PathBuf,
}

impl RuntimeConfig {
    pub fn resolve(cli: &HostConfig, persisted: &PersistedConfig, config_path: PathBuf) -> Self {
        Self {
            port: cli.port.unwrap_or(persisted.port),
            enable_tls: !cli.notls && (persisted.enable_tls || cli.cert.is_some()),
            cert_file: cli.cert.clone().or_else(|| persisted.cert_file.clone()),
            key_file: cli.key.clone().or_else(|| persisted.key_file.clone()),
            config_path,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
