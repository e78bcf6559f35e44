//! Bridge between switch sessions and the stats store.
//!
//! Owns one polling collector per connected switch and routes inbound
//! telemetry replies into the store: global readings commit directly,
//! port replies go through the fragment assembler first.

use crate::assembler::ReplyAssembler;
use crate::collector::PollingCollector;
use crate::switch::SwitchHandle;
use crate::wire::{self, StatsReply};
use energymon_store::EnergyStatsStore;
use energymon_types::{Dpid, EnergyReading};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connects switch sessions to polling and the store.
pub struct ProviderBridge {
    store: Arc<EnergyStatsStore>,
    poll_interval: Mutex<Duration>,
    collectors: Mutex<HashMap<Dpid, PollingCollector>>,
    assembler: Mutex<ReplyAssembler>,
    xids: Arc<AtomicU64>,
}

impl ProviderBridge {
    pub fn new(store: Arc<EnergyStatsStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval: Mutex::new(poll_interval),
            collectors: Mutex::new(HashMap::new()),
            assembler: Mutex::new(ReplyAssembler::new()),
            xids: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers a newly connected switch and starts polling it. A
    /// collector left over from an earlier session of the same datapath
    /// is stopped and replaced.
    pub fn switch_added(&self, switch: Arc<dyn SwitchHandle>) {
        let dpid = switch.dpid();
        let interval = *self.poll_interval.lock();
        let mut collector = PollingCollector::new(switch, interval, self.xids.clone());
        // A freshly created collector is stopped.
        let _ = collector.start();

        let mut collectors = self.collectors.lock();
        if let Some(mut stale) = collectors.insert(dpid, collector) {
            warn!(%dpid, "replacing collector from a previous session");
            let _ = stale.stop();
        } else {
            info!(%dpid, "switch connected, polling started");
        }
    }

    /// Stops polling a departed switch and drops any partially
    /// assembled reply from it.
    pub fn switch_removed(&self, dpid: Dpid) {
        if let Some(mut collector) = self.collectors.lock().remove(&dpid) {
            let _ = collector.stop();
            info!(%dpid, "switch disconnected, polling stopped");
        }
        self.assembler.lock().discard(dpid);
    }

    /// Handles one inbound message from a switch session. Traffic that
    /// is not an energy telemetry reply is ignored; malformed telemetry
    /// is logged and dropped.
    pub fn handle_message(&self, dpid: Dpid, bytes: &[u8]) {
        let reply = match wire::decode_reply(bytes) {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(err) => {
                warn!(%dpid, %err, "discarding malformed telemetry reply");
                return;
            }
        };

        match reply {
            StatsReply::GlobalEnergy {
                xid,
                current_consumption,
                power_drawn,
            } => {
                debug!(%dpid, xid, "global energy reply");
                self.store.update_global(
                    dpid.device_id(),
                    EnergyReading::new(current_consumption, power_drawn),
                );
            }
            StatsReply::PortEnergy { xid, more, entries } => {
                debug!(%dpid, xid, more, entries = entries.len(), "port energy fragment");
                let batch = self.assembler.lock().absorb(dpid, entries, more);
                if let Some(batch) = batch {
                    let readings = batch
                        .iter()
                        .filter_map(|entry| Some((entry.port()?, entry.reading())))
                        .collect();
                    if let Err(err) = self.store.update_ports(dpid.device_id(), readings) {
                        warn!(%dpid, %err, "rejected port batch");
                    }
                }
            }
        }
    }

    /// Changes the polling interval for every connected switch. New
    /// switches pick up the interval as they connect.
    pub fn set_poll_interval(&self, interval: Duration) {
        *self.poll_interval.lock() = interval;
        let mut collectors = self.collectors.lock();
        info!(count = collectors.len(), ?interval, "applying poll interval");
        for collector in collectors.values_mut() {
            let _ = collector.adjust_interval(interval);
        }
    }

    /// Current default polling interval.
    pub fn poll_interval(&self) -> Duration {
        *self.poll_interval.lock()
    }

    /// Number of switches currently being polled.
    pub fn polled_switches(&self) -> usize {
        self.collectors.lock().len()
    }
}
