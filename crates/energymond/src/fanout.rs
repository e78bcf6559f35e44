//! Ordered delivery of store events to registered listeners.
//!
//! Store commits can happen on any task, but listeners must observe
//! events in commit order. The fanout funnels every event through one
//! unbounded channel and dispatches from a single task, so listeners
//! never see reordered or concurrent callbacks.

use energymon_store::StoreDelegate;
use energymon_types::EnergyStatsEvent;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Receiver of energy statistics events.
pub trait StatsListener: Send + Sync {
    fn on_event(&self, event: &EnergyStatsEvent);
}

/// Handle for deregistering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Registry = Arc<RwLock<Vec<(ListenerId, Arc<dyn StatsListener>)>>>;

/// Funnels store events through a single dispatch task.
pub struct NotificationFanout {
    tx: mpsc::UnboundedSender<EnergyStatsEvent>,
    listeners: Registry,
    next_id: AtomicU64,
    dispatcher: JoinHandle<()>,
}

impl NotificationFanout {
    /// Creates the fanout and spawns its dispatch task. Must run inside
    /// a tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<EnergyStatsEvent>();
        let listeners: Registry = Arc::new(RwLock::new(Vec::new()));

        let registry = Arc::clone(&listeners);
        let dispatcher = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                trace!(kind = %event.kind, device = %event.device, "dispatching event");
                let listeners = registry.read().clone();
                for (_, listener) in &listeners {
                    listener.on_event(&event);
                }
            }
        });

        Self {
            tx,
            listeners,
            next_id: AtomicU64::new(0),
            dispatcher,
        }
    }

    /// Registers a listener. Events are delivered in commit order, one
    /// at a time.
    pub fn add_listener(&self, listener: Arc<dyn StatsListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        debug!(id = id.0, "listener registered");
        id
    }

    /// Deregisters a listener. Removing an unknown id is a no-op.
    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners.write().retain(|(lid, _)| *lid != id);
    }
}

impl Default for NotificationFanout {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreDelegate for NotificationFanout {
    fn notify(&self, event: EnergyStatsEvent) {
        // Send fails only after the dispatcher is gone, which means the
        // fanout itself is being torn down.
        let _ = self.tx.send(event);
    }
}

impl Drop for NotificationFanout {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
