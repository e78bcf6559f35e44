//! The four-table energy statistics store.

use crate::{MapEvent, ReplicatedMap, Result, StoreError};
use energymon_types::{
    delta, DeviceId, EnergyReading, EnergyStatsEvent, EnergyStatsEventKind, PortNumber,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Per-device port readings, keyed by port number.
pub type PortMap = BTreeMap<PortNumber, EnergyReading>;

/// Receiver of store change notifications.
///
/// Exactly one notification is delivered per committed update: one per
/// `update_global` call and one per complete port batch.
pub trait StoreDelegate: Send + Sync {
    /// Called after an update has committed.
    fn notify(&self, event: EnergyStatsEvent);
}

type Delegate = Arc<RwLock<Option<Arc<dyn StoreDelegate>>>>;

/// Statistics store holding current and delta readings per device and per
/// port.
///
/// All mutation goes through [`update_global`](Self::update_global),
/// [`update_ports`](Self::update_ports) and [`purge`](Self::purge); the
/// backing maps are never exposed. Every write commits the delta slot
/// before the current slot, and change notifications are derived from
/// commits to the two current tables only, so one logical update yields
/// one event.
pub struct EnergyStatsStore {
    global: Arc<dyn ReplicatedMap<DeviceId, EnergyReading>>,
    global_delta: Arc<dyn ReplicatedMap<DeviceId, EnergyReading>>,
    ports: Arc<dyn ReplicatedMap<DeviceId, PortMap>>,
    port_deltas: Arc<dyn ReplicatedMap<DeviceId, PortMap>>,
    delegate: Delegate,
}

impl EnergyStatsStore {
    /// Creates a store backed by process-local in-memory maps.
    pub fn new() -> Self {
        Self::with_maps(
            Arc::new(crate::InMemoryMap::new()),
            Arc::new(crate::InMemoryMap::new()),
            Arc::new(crate::InMemoryMap::new()),
            Arc::new(crate::InMemoryMap::new()),
        )
    }

    /// Creates a store over caller-supplied map backings.
    ///
    /// The four maps must be dedicated to this store; the store registers
    /// change listeners on the two current maps to drive notifications.
    pub fn with_maps(
        global: Arc<dyn ReplicatedMap<DeviceId, EnergyReading>>,
        global_delta: Arc<dyn ReplicatedMap<DeviceId, EnergyReading>>,
        ports: Arc<dyn ReplicatedMap<DeviceId, PortMap>>,
        port_deltas: Arc<dyn ReplicatedMap<DeviceId, PortMap>>,
    ) -> Self {
        let delegate: Delegate = Arc::new(RwLock::new(None));

        let slot = Arc::clone(&delegate);
        global.add_listener(Arc::new(move |event: &MapEvent<DeviceId>| {
            if let MapEvent::Put { key } = event {
                notify_delegate(&slot, EnergyStatsEventKind::GlobalStatsUpdated, *key);
            }
        }));

        let slot = Arc::clone(&delegate);
        ports.add_listener(Arc::new(move |event: &MapEvent<DeviceId>| {
            if let MapEvent::Put { key } = event {
                notify_delegate(&slot, EnergyStatsEventKind::PortStatsUpdated, *key);
            }
        }));

        Self {
            global,
            global_delta,
            ports,
            port_deltas,
            delegate,
        }
    }

    /// Sets the delegate receiving change notifications.
    pub fn set_delegate(&self, delegate: Arc<dyn StoreDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    /// Clears the change notification delegate.
    pub fn unset_delegate(&self) {
        *self.delegate.write() = None;
    }

    /// Commits a new device-global reading.
    ///
    /// The delta against the previous reading (baseline-zero on the first
    /// sample) is written before the new current value; the delegate is
    /// notified once after both commit.
    pub fn update_global(&self, device: DeviceId, reading: EnergyReading) {
        let previous = self.global.get(&device);
        let delta_reading = delta(previous.as_ref(), &reading);

        debug!(%device, "committing global reading");
        self.global_delta.put(device, delta_reading);
        self.global.put(device, reading);
    }

    /// Commits a complete port batch for a device, replacing the current
    /// port map wholesale.
    ///
    /// Ports absent from the batch drop out of the current map silently;
    /// their previous delta entries persist until overwritten. Each port
    /// present gets a delta against the previous map's entry for that
    /// port, baseline-zero when there was none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WildcardPort`] if the batch contains the
    /// `ANY` wildcard; nothing is committed in that case.
    pub fn update_ports(
        &self,
        device: DeviceId,
        readings: Vec<(PortNumber, EnergyReading)>,
    ) -> Result<()> {
        if readings.iter().any(|(port, _)| port.is_wildcard()) {
            return Err(StoreError::WildcardPort);
        }

        let previous = self.ports.get(&device).unwrap_or_default();
        let mut current = PortMap::new();
        // Only the current map is replaced wholesale; delta entries for
        // ports absent from this batch persist until overwritten.
        let mut deltas = self.port_deltas.get(&device).unwrap_or_default();

        for (port, reading) in readings {
            deltas.insert(port, delta(previous.get(&port), &reading));
            current.insert(port, reading);
        }

        debug!(%device, ports = current.len(), "committing port batch");
        self.port_deltas.put(device, deltas);
        self.ports.put(device, current);
        Ok(())
    }

    /// Returns the current global reading for a device.
    pub fn global(&self, device: DeviceId) -> Option<EnergyReading> {
        self.global.get(&device)
    }

    /// Returns the latest global delta for a device.
    pub fn global_delta(&self, device: DeviceId) -> Option<EnergyReading> {
        self.global_delta.get(&device)
    }

    /// Returns the current port readings for a device, sorted by port.
    /// Empty when the device has no data.
    pub fn ports(&self, device: DeviceId) -> Vec<(PortNumber, EnergyReading)> {
        self.ports
            .get(&device)
            .map(|map| map.into_iter().collect())
            .unwrap_or_default()
    }

    /// Returns the latest port deltas for a device, sorted by port.
    pub fn port_deltas(&self, device: DeviceId) -> Vec<(PortNumber, EnergyReading)> {
        self.port_deltas
            .get(&device)
            .map(|map| map.into_iter().collect())
            .unwrap_or_default()
    }

    /// Returns the current reading for one port of a device.
    pub fn port(&self, device: DeviceId, port: PortNumber) -> Option<EnergyReading> {
        self.ports.get(&device).and_then(|map| map.get(&port).cloned())
    }

    /// Returns the latest delta for one port of a device.
    pub fn port_delta(&self, device: DeviceId, port: PortNumber) -> Option<EnergyReading> {
        self.port_deltas
            .get(&device)
            .and_then(|map| map.get(&port).cloned())
    }

    /// Returns the current global readings of all devices.
    pub fn all_globals(&self) -> Vec<(DeviceId, EnergyReading)> {
        self.global.entries()
    }

    /// Returns the latest global deltas of all devices.
    pub fn all_global_deltas(&self) -> Vec<(DeviceId, EnergyReading)> {
        self.global_delta.entries()
    }

    /// Returns the current port readings of all devices, flattened.
    pub fn all_ports(&self) -> Vec<(DeviceId, PortNumber, EnergyReading)> {
        flatten_port_maps(self.ports.entries())
    }

    /// Returns the latest port deltas of all devices, flattened.
    pub fn all_port_deltas(&self) -> Vec<(DeviceId, PortNumber, EnergyReading)> {
        flatten_port_maps(self.port_deltas.entries())
    }

    /// Removes all four slots for a device. No-op for a device that was
    /// never stored.
    pub fn purge(&self, device: DeviceId) {
        debug!(%device, "purging statistics");
        self.global.remove(&device);
        self.global_delta.remove(&device);
        self.ports.remove(&device);
        self.port_deltas.remove(&device);
    }
}

impl Default for EnergyStatsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn notify_delegate(delegate: &Delegate, kind: EnergyStatsEventKind, device: DeviceId) {
    let delegate = delegate.read().clone();
    if let Some(delegate) = delegate {
        delegate.notify(EnergyStatsEvent::new(kind, device));
    }
}

fn flatten_port_maps(
    entries: Vec<(DeviceId, PortMap)>,
) -> Vec<(DeviceId, PortNumber, EnergyReading)> {
    entries
        .into_iter()
        .flat_map(|(device, map)| {
            map.into_iter()
                .map(move |(port, reading)| (device, port, reading))
        })
        .collect()
}
