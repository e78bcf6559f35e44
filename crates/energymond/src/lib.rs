//! # energymond - Switch Energy Telemetry Daemon
//!
//! Polls connected OpenFlow switches for vendor-specific energy telemetry
//! (device-global and per-port), keeps the latest absolute reading and its
//! delta in the statistics store, and fans committed updates out to
//! registered listeners.
//!
//! ## Responsibilities
//! - One [`PollingCollector`] per connected switch, firing at a
//!   configurable interval and only while this controller holds mastery
//! - Reassembly of multi-fragment port telemetry replies
//! - Decoding of the experimenter stats messages into readings
//! - Device lifecycle handling with a configurable purge-on-disconnect
//!   policy
//! - Ordered change-event delivery through the [`NotificationFanout`]
//!
//! ## External boundaries
//! The control-channel transport (session setup, framing, role
//! negotiation) lives outside this crate; it hands connected switches to
//! the [`ProviderBridge`] and delivers received messages to
//! [`ProviderBridge::handle_message`]. The REST exposition layer reads
//! through [`StatsManager`] queries and events.

pub mod assembler;
pub mod collector;
pub mod config;
pub mod fanout;
pub mod manager;
pub mod provider;
pub mod switch;
pub mod wire;

pub use assembler::ReplyAssembler;
pub use collector::{CollectorError, PollingCollector};
pub use config::{ConfigError, EnergymonConfig};
pub use fanout::{ListenerId, NotificationFanout, StatsListener};
pub use manager::{DeviceEvent, DeviceInventory, PurgePolicy, StatsManager};
pub use provider::ProviderBridge;
pub use switch::{RoleState, SwitchHandle};
