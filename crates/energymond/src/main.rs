//! Energy Monitoring Daemon
//!
//! Main entry point for energymond. Polls connected switches for energy
//! statistics over the experimenter stats extension, maintains current
//! and delta readings per device and per port, and notifies registered
//! listeners on every committed update.

use anyhow::Context;
use energymon_store::EnergyStatsStore;
use energymond::{
    DeviceInventory, EnergymonConfig, ProviderBridge, StatsListener, StatsManager,
};
use energymon_types::{DeviceId, EnergyStatsEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("energymond: Starting energy monitoring daemon");
    run_daemon().await?;
    info!("energymond: Graceful shutdown complete");
    Ok(())
}

fn init_logging() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global logger")?;
    Ok(())
}

async fn run_daemon() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            EnergymonConfig::load(&path)
                .with_context(|| format!("loading config from {}", path.display()))?
        }
        None => {
            info!("energymond: No config file given, using defaults");
            EnergymonConfig::default()
        }
    };

    let store = Arc::new(EnergyStatsStore::new());
    let manager = StatsManager::new(
        store.clone(),
        Arc::new(NoInventory),
        config.purge_policy()?,
    );
    manager.add_listener(Arc::new(LogListener));

    let bridge = Arc::new(ProviderBridge::new(store, config.poll_interval()));
    info!(
        poll_interval_secs = config.poll_interval_secs,
        "energymond: Provider bridge ready, awaiting switch connections"
    );
    // Transport integration hands sessions to `bridge` as switches
    // connect; the daemon itself just runs until signalled.
    let _ = &bridge;

    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("energymond: Received SIGINT, shutting down");
    drop(manager);
    Ok(())
}

/// Inventory used until a transport is wired in: no device is ever
/// reported available, so purge decisions fall through to policy alone.
struct NoInventory;

impl DeviceInventory for NoInventory {
    fn is_available(&self, _device: DeviceId) -> bool {
        false
    }
}

/// Logs every committed stats update.
struct LogListener;

impl StatsListener for LogListener {
    fn on_event(&self, event: &EnergyStatsEvent) {
        info!(kind = %event.kind, device = %event.device, "energymond: Stats updated");
    }
}
