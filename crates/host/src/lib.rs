// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linqora host agent: exposes this machine's telemetry and controls to
//! authorized remote clients over a single persistent WebSocket connection.

pub mod auth;
pub mod collectors;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod power;
pub mod probes;
pub mod rooms;
pub mod router;
pub mod session;
pub mod state;
pub mod tls;
pub mod transport;
pub mod wire;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::auth::AuthManager;
use crate::collectors::media::MediaCollector;
use crate::collectors::metrics::MetricsCollector;
use crate::collectors::CollectorManager;
use crate::config::{HostConfig, PersistedConfig, RuntimeConfig};
use crate::power::LockState;
use crate::probes::{HostInfoProbe, NullProbes};
use crate::rooms::RoomRegistry;
use crate::router::Router;
use crate::state::AppState;

/// Run the host agent until shutdown (SIGINT/SIGTERM).
pub async fn run(cli: HostConfig) -> anyhow::Result<()> {
    let config_path = config::config_path(cli.config.as_deref());
    let mut persisted = PersistedConfig::load(&config_path)?;

    if cli.reset_auth {
        info!("--reset-auth: clearing all approved devices");
        persisted.authorized_devices.clear();
        persisted.save(&config_path)?;
    }

    let runtime = RuntimeConfig::resolve(&cli, &persisted, config_path.clone());
    let addr: SocketAddr = format!("0.0.0.0:{}", runtime.port).parse()?;
    let shutdown = CancellationToken::new();

    let tls_config = if runtime.enable_tls {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let (cert_path, key_path) = default_cert_paths(&runtime);
        let material = tls::resolve(&cert_path, &key_path)?;
        if !tls::is_not_expired(&material.cert_path)? {
            warn!("configured certificate is expired or not yet valid; generating a fresh development certificate");
            std::fs::remove_file(&material.cert_path).ok();
            std::fs::remove_file(&material.key_path).ok();
            let material = tls::resolve(&cert_path, &key_path)?;
            Some(tls::load_rustls_config(&material).await?)
        } else {
            Some(tls::load_rustls_config(&material).await?)
        }
    } else {
        None
    };

    let (pending_tx, pending_rx) = tokio::sync::mpsc::channel(32);
    let auth = Arc::new(AuthManager::new(persisted, config_path, pending_tx));
    spawn_pending_auth_logger(pending_rx);

    let rooms = Arc::new(RoomRegistry::new());

    let metrics = MetricsCollector::new(Arc::new(NullProbes), Arc::clone(&rooms), shutdown.clone());
    let media = MediaCollector::new(Arc::new(NullProbes), Arc::clone(&rooms), shutdown.clone());
    let collectors = Arc::new(CollectorManager::new(metrics, media));
    rooms.add_listener(collectors).await;

    let router = Arc::new(Router {
        auth: Arc::clone(&auth),
        rooms: Arc::clone(&rooms),
        host_info: Arc::new(NullProbes),
        privilege: Arc::new(NullProbes),
        media_control: Arc::new(NullProbes),
        power: Arc::new(NullProbes),
        lock_state: Arc::new(LockState::new()),
    });

    let state = Arc::new(AppState {
        sessions: state::SessionRegistry::new(),
        rooms: Arc::clone(&rooms),
        router,
        shutdown: shutdown.clone(),
    });

    transport::spawn_sweeper(Arc::clone(&state));
    spawn_signal_handler(shutdown.clone());

    let hostname = NullProbes.hostname();
    let discovery = match discovery::DiscoveryPublisher::start(&hostname, runtime.port, runtime.enable_tls) {
        Ok(publisher) => Some(publisher),
        Err(e) => {
            warn!(err = %e, "mDNS advertisement failed to start; continuing without discovery");
            None
        }
    };

    info!(addr = %addr, tls = runtime.enable_tls, "linqora-host listening");
    let result = transport::serve(state, addr, tls_config).await;

    if let Some(publisher) = discovery {
        publisher.stop();
    }

    result
}

fn default_cert_paths(runtime: &RuntimeConfig) -> (std::path::PathBuf, std::path::PathBuf) {
    let default_dir = runtime.config_path.parent().map(Path::to_owned).unwrap_or_else(|| Path::new(".").to_owned());
    let cert = runtime.cert_file.clone().unwrap_or_else(|| default_dir.join("cert.pem"));
    let key = runtime.key_file.clone().unwrap_or_else(|| default_dir.join("key.pem"));
    (cert, key)
}


/// The operator-facing approval surface is out of scope here; pending
/// requests are logged so an operator-console integration can be layered on
/// top of this channel without changing [`AuthManager`].
fn spawn_pending_auth_logger(mut pending_rx: tokio::sync::mpsc::Receiver<auth::PendingAuthRequest>) {
    tokio::spawn(async move {
        while let Some(request) = pending_rx.recv().await {
            info!(
                device_id = %request.device_id,
                device_name = %request.device_name,
                ip = %request.ip,
                "authorization request pending operator approval"
            );
        }
    });
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                error!(err = %e, "failed to install SIGTERM handler");
                None
            }
        };
        let mut sigint = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()) {
            Ok(s) => Some(s),
            Err(e) => {
                error!(err = %e, "failed to install SIGINT handler");
                None
            }
        };

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGTERM"),
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGINT"),
        }
        shutdown.cancel();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGTERM again, forcing exit"),
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGINT again, forcing exit"),
        }
        std::process::exit(130);
    });
}
