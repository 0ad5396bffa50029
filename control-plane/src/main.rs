//! # control-plane
//!
//! Polls the service registry, turns every poll into a versioned snapshot and
//! applies it to the serving cache for one node.
//!
//! Exits non-zero when the pipeline hits a fatal error (an inconsistent
//! snapshot, a rejected snapshot, a bad configuration). Transient registry
//! failures are logged and retried on the next poll.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use subset_xds::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::Args;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("{}", subset_xds::version::version_string());

    let config = args.control_plane_config().context("invalid flags")?;
    let dns = args.dns_config().context("invalid DNS server")?;
    info!(
        port = args.port,
        node_id = %config.node_id,
        dns = ?dns.server,
        interval = ?config.poller.interval,
        "starting control plane"
    );

    let cache = Arc::new(ShardedCache::new());
    let resolver = Arc::new(DnsResolver::new(dns));

    let running = tokio::select! {
        started = ControlPlane::new(config, resolver, cache).start() => {
            started.context("failed to publish the first snapshot")?
        }
        signal = wait_for_signal() => {
            signal.context("failed to listen for shutdown signals")?;
            info!("shutdown before the first snapshot");
            return Ok(());
        }
    };

    info!(node = %running.node(), "first snapshot applied; serving updates");

    let shutdown = running.shutdown_controller().clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                if !shutdown.shutdown(SHUTDOWN_GRACE_PERIOD).await {
                    warn!("snapshot apply still in flight at exit");
                }
            }
            Err(e) => error!(error = %e, "failed to listen for shutdown signals"),
        }
    });

    running.wait().await.context("control plane stopped")?;
    info!("control plane stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C off Unix).
async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl+C");
        Ok(())
    }
}
