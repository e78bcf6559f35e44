//! Change events raised on committed statistics updates.

use crate::DeviceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a statistics change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyStatsEventKind {
    /// The device-global reading and delta for a device were replaced.
    GlobalStatsUpdated,
    /// The per-port maps for a device were replaced.
    PortStatsUpdated,
}

impl fmt::Display for EnergyStatsEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalStatsUpdated => write!(f, "GLOBAL_STATS_UPDATED"),
            Self::PortStatsUpdated => write!(f, "PORT_STATS_UPDATED"),
        }
    }
}

/// A statistics change event.
///
/// Exactly one event is raised per committed store update: one per
/// `update_global` call and one per complete port batch, regardless of how
/// many reply fragments the batch arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyStatsEvent {
    /// What changed.
    pub kind: EnergyStatsEventKind,
    /// The device whose statistics changed.
    pub device: DeviceId,
    /// Commit time of the update.
    pub time: DateTime<Utc>,
}

impl EnergyStatsEvent {
    /// Creates an event stamped with the current wall-clock time.
    pub fn new(kind: EnergyStatsEventKind, device: DeviceId) -> Self {
        Self {
            kind,
            device,
            time: Utc::now(),
        }
    }
}

impl fmt::Display for EnergyStatsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dpid;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_display() {
        let device = DeviceId::from_dpid(Dpid::new(1));
        let event = EnergyStatsEvent::new(EnergyStatsEventKind::GlobalStatsUpdated, device);
        assert_eq!(
            event.to_string(),
            "GLOBAL_STATS_UPDATED of:0000000000000001"
        );
    }

    #[test]
    fn test_event_kind_equality() {
        assert_eq!(
            EnergyStatsEventKind::PortStatsUpdated,
            EnergyStatsEventKind::PortStatsUpdated
        );
        assert_ne!(
            EnergyStatsEventKind::PortStatsUpdated,
            EnergyStatsEventKind::GlobalStatsUpdated
        );
    }
}
