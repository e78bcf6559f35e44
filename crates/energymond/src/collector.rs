//! Per-switch polling task.
//!
//! Each connected switch gets one collector. The collector fires on a
//! fixed schedule, first after a short settle delay and then once per
//! configured interval, and on every fire sends a global energy request
//! and a wildcard port energy request as a single batch. Fires are
//! skipped entirely while this controller is not master for the session.

use crate::switch::{RoleState, SwitchHandle};
use crate::wire::StatsRequest;
use energymon_types::PortNumber;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Delay before the first fire of a freshly started collector, giving
/// the session time to finish its handshake.
const INITIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    #[error("collector is already started")]
    AlreadyStarted,
    #[error("collector is not started")]
    NotStarted,
}

/// Polls one switch for energy statistics on a fixed interval.
pub struct PollingCollector {
    switch: Arc<dyn SwitchHandle>,
    interval: Duration,
    xids: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl PollingCollector {
    /// Creates a stopped collector. `xids` is the process-wide request id
    /// counter, shared so correlation ids stay unique across switches.
    pub fn new(switch: Arc<dyn SwitchHandle>, interval: Duration, xids: Arc<AtomicU64>) -> Self {
        Self {
            switch,
            interval,
            xids,
            task: None,
        }
    }

    /// Returns the current polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the polling task is running.
    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    /// Starts the polling task.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.task.is_some() {
            return Err(CollectorError::AlreadyStarted);
        }
        debug!(dpid = %self.switch.dpid(), interval = ?self.interval, "starting collector");
        self.task = Some(spawn_poll_loop(
            self.switch.clone(),
            INITIAL_DELAY,
            self.interval,
            self.xids.clone(),
        ));
        Ok(())
    }

    /// Stops the polling task.
    pub fn stop(&mut self) -> Result<(), CollectorError> {
        match self.task.take() {
            Some(task) => {
                debug!(dpid = %self.switch.dpid(), "stopping collector");
                task.abort();
                Ok(())
            }
            None => Err(CollectorError::NotStarted),
        }
    }

    /// Replaces the schedule of a running collector. The old task is
    /// cancelled and the next fire happens one full `interval` from now.
    pub fn adjust_interval(&mut self, interval: Duration) -> Result<(), CollectorError> {
        let task = self.task.take().ok_or(CollectorError::NotStarted)?;
        task.abort();
        debug!(
            dpid = %self.switch.dpid(),
            old = ?self.interval,
            new = ?interval,
            "adjusting poll interval"
        );
        self.interval = interval;
        self.task = Some(spawn_poll_loop(
            self.switch.clone(),
            interval,
            interval,
            self.xids.clone(),
        ));
        Ok(())
    }
}

impl Drop for PollingCollector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn spawn_poll_loop(
    switch: Arc<dyn SwitchHandle>,
    initial_delay: Duration,
    period: Duration,
    xids: Arc<AtomicU64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(initial_delay).await;
        let mut ticker = tokio::time::interval(period);
        // The first tick of an interval completes immediately.
        ticker.tick().await;
        loop {
            fire(switch.as_ref(), &xids).await;
            ticker.tick().await;
        }
    })
}

async fn fire(switch: &dyn SwitchHandle, xids: &AtomicU64) {
    if switch.role() != RoleState::Master {
        trace!(dpid = %switch.dpid(), "not master, skipping poll");
        return;
    }
    let global_xid = xids.fetch_add(1, Ordering::Relaxed) as u32;
    let port_xid = xids.fetch_add(1, Ordering::Relaxed) as u32;
    trace!(dpid = %switch.dpid(), global_xid, port_xid, "polling energy stats");
    switch
        .send(vec![
            StatsRequest::GlobalEnergy { xid: global_xid },
            StatsRequest::PortEnergy {
                xid: port_xid,
                port: PortNumber::ANY,
            },
        ])
        .await;
}
