//! Energy statistics storage.
//!
//! Two layers live here:
//!
//! - [`ReplicatedMap`]: the per-key get/put contract the store runs on.
//!   The bundled [`InMemoryMap`] is a process-local backing; a distributed,
//!   eventually-consistent implementation plugs in behind the same trait.
//! - [`EnergyStatsStore`]: four keyed tables (global current/delta and
//!   per-device port-map current/delta) with delta computation on every
//!   write and change notification through a [`StoreDelegate`].
//!
//! The store never assumes strong consistency across its four tables; each
//! logical update commits the delta slot before the current slot so a
//! reader following a change notification observes both.

mod error;
mod map;
mod store;

pub use error::{Result, StoreError};
pub use map::{InMemoryMap, MapEvent, MapListener, ReplicatedMap};
pub use store::{EnergyStatsStore, PortMap, StoreDelegate};
