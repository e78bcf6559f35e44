//! Common types for switch energy telemetry.
//!
//! This crate provides the value layer shared by the energymon store and
//! daemon:
//!
//! - [`Dpid`] / [`DeviceId`]: switch identities derived from a datapath id
//! - [`PortNumber`]: bounded switch port numbers with the `ANY` wildcard
//! - [`EnergyReading`]: an immutable energy/power sample
//! - [`delta`]: the delta computation between consecutive readings
//! - [`EnergyStatsEvent`]: change events raised on committed updates

mod delta;
mod device;
mod event;
mod reading;

pub use delta::delta;
pub use device::{DeviceId, Dpid, PortNumber};
pub use event::{EnergyStatsEvent, EnergyStatsEventKind};
pub use reading::EnergyReading;

/// Common error type for parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid device id format: {0}")]
    InvalidDeviceId(String),

    #[error("invalid port number: {0} (reserved or out of range)")]
    InvalidPortNumber(u32),
}
