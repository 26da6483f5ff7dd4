//! In-process change notifications.
//!
//! Consumers subscribe and re-query the store's getters when an event arrives.
//! Events carry which collection changed but never record data.

use tokio::sync::broadcast;

use crate::types::Collection;

/// Buffered events per subscriber before the slowest one starts lagging
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A local mutation was applied and saved.
    Updated(Collection),
    /// State was re-hydrated from the durable slot after another context wrote it.
    Reloaded,
}

/// Fan-out for [`StoreEvent`]s. Sending never blocks and never fails the caller.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        // No subscribers is the normal headless case
        if self.tx.send(event).is_err() {
            log::trace!("Store: no subscribers for {:?}", event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
