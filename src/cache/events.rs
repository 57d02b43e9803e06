//! Operation Event Queue
//!
//! Bounded queue carrying committed operations from the engine worker to the
//! maintenance loop. Producers never block: when the queue is full the event
//! is dropped and counted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::cache::{CacheOperation, CacheStats};

/// Creates a connected sender/receiver pair bounded at `capacity` events.
pub fn event_queue(capacity: usize, stats: Arc<CacheStats>) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx, stats }, EventReceiver { rx })
}

// == Event Sender ==
/// Producer half, owned by the engine worker.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<CacheOperation>,
    stats: Arc<CacheStats>,
}

impl EventSender {
    // == Submit ==
    /// Offers an event without waiting.
    ///
    /// Returns `false` when the event was dropped because the queue is full
    /// or the consumer is gone.
    pub fn submit(&self, operation: CacheOperation) -> bool {
        match self.tx.try_send(operation) {
            Ok(()) => true,
            Err(TrySendError::Full(operation)) => {
                self.stats.record_dropped_event();
                warn!(
                    key = %operation.key,
                    op = %operation.op_type,
                    "Event queue full, dropping operation event"
                );
                false
            }
            Err(TrySendError::Closed(operation)) => {
                debug!(
                    key = %operation.key,
                    op = %operation.op_type,
                    "Event queue closed, discarding operation event"
                );
                false
            }
        }
    }
}

// == Event Receiver ==
/// Consumer half, owned by the maintenance loop.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<CacheOperation>,
}

impl EventReceiver {
    // == Poll ==
    /// Waits up to `timeout` for the next event.
    ///
    /// Once every sender is gone this still waits out the timeout so callers
    /// looping on it keep their cadence instead of spinning.
    pub async fn poll(&mut self, timeout: Duration) -> Option<CacheOperation> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(operation)) => Some(operation),
            Ok(None) => {
                tokio::time::sleep(timeout).await;
                None
            }
            Err(_) => None,
        }
    }

    /// Takes the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<CacheOperation> {
        self.rx.try_recv().ok()
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
