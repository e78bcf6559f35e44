//! Energy statistics service frontend.
//!
//! Ties the store, the notification fanout and device lifecycle handling
//! together, and exposes the query surface applications read stats
//! through. Device lifecycle events are processed on a single task so
//! purges never race each other.

use crate::fanout::{ListenerId, NotificationFanout, StatsListener};
use energymon_store::EnergyStatsStore;
use energymon_types::{DeviceId, EnergyReading, PortNumber};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lifecycle transitions the stats service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Device left the network permanently.
    Removed(DeviceId),
    /// Device is administratively suspended.
    Suspended(DeviceId),
}

impl DeviceEvent {
    pub fn device(&self) -> DeviceId {
        match self {
            DeviceEvent::Removed(device) | DeviceEvent::Suspended(device) => *device,
        }
    }
}

/// Availability oracle for devices. A device can flap: a removal event
/// may arrive while the device has already reconnected, in which case
/// its stats must survive.
pub trait DeviceInventory: Send + Sync {
    fn is_available(&self, device: DeviceId) -> bool;
}

/// Whether stats are purged when a device disconnects.
///
/// A network-wide default with optional per-device overrides.
#[derive(Debug, Clone, Default)]
pub struct PurgePolicy {
    default: bool,
    overrides: HashMap<DeviceId, bool>,
}

impl PurgePolicy {
    pub fn new(default: bool) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Sets a per-device override of the network-wide default.
    pub fn set_override(&mut self, device: DeviceId, purge: bool) {
        self.overrides.insert(device, purge);
    }

    /// Resolves the policy for one device.
    pub fn purge_on_disconnect(&self, device: DeviceId) -> bool {
        self.overrides.get(&device).copied().unwrap_or(self.default)
    }
}

/// The energy statistics service.
pub struct StatsManager {
    store: Arc<EnergyStatsStore>,
    fanout: Arc<NotificationFanout>,
    events: mpsc::UnboundedSender<DeviceEvent>,
    lifecycle: JoinHandle<()>,
}

impl StatsManager {
    /// Wires the service together and spawns its lifecycle task. Must
    /// run inside a tokio runtime.
    ///
    /// The store's delegate slot is claimed by this manager; events flow
    /// store -> fanout -> listeners from here on.
    pub fn new(
        store: Arc<EnergyStatsStore>,
        inventory: Arc<dyn DeviceInventory>,
        policy: PurgePolicy,
    ) -> Self {
        let fanout = Arc::new(NotificationFanout::new());
        store.set_delegate(fanout.clone());

        let (events, mut rx) = mpsc::unbounded_channel::<DeviceEvent>();
        let lifecycle_store = store.clone();
        let lifecycle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let device = event.device();
                if !policy.purge_on_disconnect(device) {
                    debug!(%device, ?event, "retaining stats per policy");
                    continue;
                }
                if inventory.is_available(device) {
                    debug!(%device, ?event, "device already back, retaining stats");
                    continue;
                }
                info!(%device, ?event, "purging stats for disconnected device");
                lifecycle_store.purge(device);
            }
        });

        Self {
            store,
            fanout,
            events,
            lifecycle,
        }
    }

    /// Sender for feeding device lifecycle events into the service.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<DeviceEvent> {
        self.events.clone()
    }

    /// Registers a stats listener.
    pub fn add_listener(&self, listener: Arc<dyn StatsListener>) -> ListenerId {
        self.fanout.add_listener(listener)
    }

    /// Deregisters a stats listener.
    pub fn remove_listener(&self, id: ListenerId) {
        self.fanout.remove_listener(id);
    }

    /// Latest device-global reading.
    pub fn power(&self, device: DeviceId) -> Option<EnergyReading> {
        self.store.global(device)
    }

    /// Change between the last two device-global readings.
    pub fn power_delta(&self, device: DeviceId) -> Option<EnergyReading> {
        self.store.global_delta(device)
    }

    /// Latest per-port readings of a device.
    pub fn port_power(&self, device: DeviceId) -> Vec<(PortNumber, EnergyReading)> {
        self.store.ports(device)
    }

    /// Latest per-port deltas of a device.
    pub fn port_power_deltas(&self, device: DeviceId) -> Vec<(PortNumber, EnergyReading)> {
        self.store.port_deltas(device)
    }

    /// Latest reading of one port.
    pub fn port_power_of(&self, device: DeviceId, port: PortNumber) -> Option<EnergyReading> {
        self.store.port(device, port)
    }

    /// Latest delta of one port.
    pub fn port_power_delta_of(
        &self,
        device: DeviceId,
        port: PortNumber,
    ) -> Option<EnergyReading> {
        self.store.port_delta(device, port)
    }

    /// Global readings for every known device.
    pub fn all_power(&self) -> Vec<(DeviceId, EnergyReading)> {
        self.store.all_globals()
    }

    /// Global deltas for every known device.
    pub fn all_power_deltas(&self) -> Vec<(DeviceId, EnergyReading)> {
        self.store.all_global_deltas()
    }

    /// Port readings across every known device.
    pub fn all_port_power(&self) -> Vec<(DeviceId, PortNumber, EnergyReading)> {
        self.store.all_ports()
    }

    /// Port deltas across every known device.
    pub fn all_port_power_deltas(&self) -> Vec<(DeviceId, PortNumber, EnergyReading)> {
        self.store.all_port_deltas()
    }
}

impl Drop for StatsManager {
    fn drop(&mut self) {
        self.lifecycle.abort();
        self.store.unset_delegate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use energymon_types::Dpid;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::time::Duration;

    struct FakeInventory {
        available: Mutex<HashSet<DeviceId>>,
    }

    impl FakeInventory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                available: Mutex::new(HashSet::new()),
            })
        }

        fn mark_available(&self, device: DeviceId) {
            self.available.lock().insert(device);
        }
    }

    impl DeviceInventory for FakeInventory {
        fn is_available(&self, device: DeviceId) -> bool {
            self.available.lock().contains(&device)
        }
    }

    fn device(n: u64) -> DeviceId {
        Dpid::new(n).device_id()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn seeded_store(devices: &[DeviceId]) -> Arc<EnergyStatsStore> {
        let store = Arc::new(EnergyStatsStore::new());
        for device in devices {
            store.update_global(*device, EnergyReading::new(10.0, 5.0));
        }
        store
    }

    #[tokio::test]
    async fn test_purge_on_removal_when_policy_says_so() {
        let target = device(1);
        let store = seeded_store(&[target]);
        let manager = StatsManager::new(store, FakeInventory::new(), PurgePolicy::new(true));

        manager.event_sender().send(DeviceEvent::Removed(target)).unwrap();
        settle().await;

        assert_eq!(manager.power(target), None);
        assert_eq!(manager.power_delta(target), None);
    }

    #[tokio::test]
    async fn test_stats_retained_when_policy_says_keep() {
        let target = device(1);
        let store = seeded_store(&[target]);
        let manager = StatsManager::new(store, FakeInventory::new(), PurgePolicy::new(false));

        manager.event_sender().send(DeviceEvent::Suspended(target)).unwrap();
        settle().await;

        assert_eq!(manager.power(target), Some(EnergyReading::new(10.0, 5.0)));
    }

    #[tokio::test]
    async fn test_per_device_override_beats_default() {
        let purged = device(1);
        let kept = device(2);
        let store = seeded_store(&[purged, kept]);

        let mut policy = PurgePolicy::new(true);
        policy.set_override(kept, false);
        let manager = StatsManager::new(store, FakeInventory::new(), policy);

        let sender = manager.event_sender();
        sender.send(DeviceEvent::Removed(purged)).unwrap();
        sender.send(DeviceEvent::Removed(kept)).unwrap();
        settle().await;

        assert_eq!(manager.power(purged), None);
        assert_eq!(manager.power(kept), Some(EnergyReading::new(10.0, 5.0)));
    }

    #[tokio::test]
    async fn test_flapping_device_keeps_its_stats() {
        let target = device(1);
        let store = seeded_store(&[target]);
        let inventory = FakeInventory::new();
        inventory.mark_available(target);
        let manager = StatsManager::new(store, inventory, PurgePolicy::new(true));

        manager.event_sender().send(DeviceEvent::Removed(target)).unwrap();
        settle().await;

        assert_eq!(manager.power(target), Some(EnergyReading::new(10.0, 5.0)));
    }

    #[tokio::test]
    async fn test_queries_pass_through_to_store() {
        let a = device(1);
        let b = device(2);
        let store = seeded_store(&[a, b]);
        store
            .update_ports(a, vec![(PortNumber::new(3).unwrap(), EnergyReading::new(2.0, 1.0))])
            .unwrap();
        let manager = StatsManager::new(store, FakeInventory::new(), PurgePolicy::default());

        assert_eq!(manager.all_power().len(), 2);
        assert_eq!(
            manager.port_power_of(a, PortNumber::new(3).unwrap()),
            Some(EnergyReading::new(2.0, 1.0))
        );
        assert_eq!(
            manager.port_power_delta_of(a, PortNumber::new(3).unwrap()),
            Some(EnergyReading::new(0.0, 0.0))
        );
        assert_eq!(manager.all_port_power(), vec![(
            a,
            PortNumber::new(3).unwrap(),
            EnergyReading::new(2.0, 1.0)
        )]);
        assert!(manager.port_power(b).is_empty());
    }
}
