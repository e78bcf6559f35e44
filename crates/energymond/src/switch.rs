//! Abstraction over a connected switch control session.

use crate::wire::StatsRequest;
use async_trait::async_trait;
use energymon_types::Dpid;

/// Controller role for a switch session. Only the master role is allowed
/// to poll; readings written by multiple controllers would race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    Master,
    Equal,
    Slave,
}

/// A live control session to one switch.
///
/// The transport owns connection setup, framing and retransmission; the
/// polling layer only needs the datapath id, the current role and a way
/// to send a batch of requests.
#[async_trait]
pub trait SwitchHandle: Send + Sync {
    /// Datapath id of the connected switch.
    fn dpid(&self) -> Dpid;

    /// Current controller role for this session.
    fn role(&self) -> RoleState;

    /// Sends a batch of stats requests down the session. Delivery is
    /// best-effort; a lost request simply means the poll round produces
    /// no reply.
    async fn send(&self, batch: Vec<StatsRequest>);
}
