//! Maintenance Loop
//!
//! Background task that keeps the eviction policy and TTL index in step with
//! the engine's store. It consumes operation events, deletes keys whose TTL
//! has passed and evicts keys while the store is above its size ceiling.
//!
//! The loop never touches the store itself. Every removal goes through
//! [`CacheEngine::submit_delete`], so the worker stays the only writer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{
    CacheEngine, CacheOperation, CacheStats, Completion, EventReceiver, OperationType, TtlIndex,
};
use crate::clock::SharedClock;
use crate::eviction::EvictionPolicy;

/// How long one iteration waits for an event before sweeping anyway.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events taken per iteration beyond the first one waited for.
const DRAIN_BATCH: usize = 1024;

/// Upper bound on waiting for the deletes of one sweep to be applied.
const DELETE_SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

// == Maintenance Gauges ==
/// Loop-side sizes published after every iteration for the stats endpoint.
#[derive(Debug, Default)]
pub struct MaintenanceGauges {
    tracked_keys: AtomicUsize,
    ttl_buckets: AtomicUsize,
    ttl_keys: AtomicUsize,
    event_queue_depth: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeSnapshot {
    pub tracked_keys: usize,
    pub ttl_buckets: usize,
    pub ttl_keys: usize,
    pub event_queue_depth: usize,
}

impl MaintenanceGauges {
    pub fn snapshot(&self) -> GaugeSnapshot {
        GaugeSnapshot {
            tracked_keys: self.tracked_keys.load(Ordering::Relaxed),
            ttl_buckets: self.ttl_buckets.load(Ordering::Relaxed),
            ttl_keys: self.ttl_keys.load(Ordering::Relaxed),
            event_queue_depth: self.event_queue_depth.load(Ordering::Relaxed),
        }
    }
}

// == Maintenance Loop ==
pub struct MaintenanceLoop {
    events: EventReceiver,
    policy: Box<dyn EvictionPolicy>,
    ttl: TtlIndex,
    engine: CacheEngine,
    clock: SharedClock,
    stats: Arc<CacheStats>,
    gauges: Arc<MaintenanceGauges>,
    maximum_size: usize,
    poll_interval: Duration,
}

impl MaintenanceLoop {
    /// Creates a loop that owns `policy` and a fresh TTL index.
    ///
    /// # Arguments
    /// * `events` - Consumer half of the engine's event queue
    /// * `policy` - Eviction policy chosen by configuration
    /// * `engine` - Handle used to issue deletes and read the store size
    /// * `clock` - Time source for TTL decisions
    /// * `stats` - Shared counters for evictions and expirations
    /// * `maximum_size` - Resident entry count above which keys are evicted
    pub fn new(
        events: EventReceiver,
        policy: Box<dyn EvictionPolicy>,
        engine: CacheEngine,
        clock: SharedClock,
        stats: Arc<CacheStats>,
        maximum_size: usize,
    ) -> Self {
        Self {
            events,
            policy,
            ttl: TtlIndex::new(),
            engine,
            clock,
            stats,
            gauges: Arc::new(MaintenanceGauges::default()),
            maximum_size,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Gauges this loop publishes to.
    pub fn gauges(&self) -> Arc<MaintenanceGauges> {
        self.gauges.clone()
    }

    // == Spawn ==
    /// Starts the loop on `runtime` and returns the handle used to stop it.
    pub fn spawn(self, runtime: &Handle) -> MaintenanceHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = runtime.spawn(self.run(stop_rx));
        MaintenanceHandle { stop_tx, task }
    }

    async fn run(mut self, stop: watch::Receiver<bool>) {
        info!(
            policy = self.policy.name(),
            maximum_size = self.maximum_size,
            "Maintenance loop started"
        );
        loop {
            let stopped = *stop.borrow();
            if stopped {
                break;
            }
            self.run_once().await;
        }
        info!("Maintenance loop stopped");
    }

    // == Iteration ==
    /// Runs one pass: drain events, expire due keys, enforce capacity.
    pub async fn run_once(&mut self) {
        if let Some(first) = self.events.poll(self.poll_interval).await {
            self.dispatch(first);
            for _ in 0..DRAIN_BATCH {
                match self.events.try_recv() {
                    Some(operation) => self.dispatch(operation),
                    None => break,
                }
            }
        }

        self.expire_due().await;
        self.enforce_capacity().await;
        self.publish_gauges();
    }

    fn dispatch(&mut self, operation: CacheOperation) {
        let key = operation.key.as_str();
        match operation.op_type {
            OperationType::Put => {
                self.policy.on_put(key);
                match &operation.entry {
                    Some(entry) => self.ttl.add(entry.expiration_time(), key),
                    None => warn!(key, "PUT event without entry, TTL not indexed"),
                }
            }
            OperationType::Get => self.policy.on_get(key),
            OperationType::Delete => {
                self.policy.on_delete(key);
                self.ttl.remove(key);
            }
        }
    }

    async fn expire_due(&mut self) {
        let now = self.clock.now_secs();
        let mut pending = Vec::new();

        'sweep: while let Some(expires_at) = self.ttl.peek().filter(|at| *at <= now) {
            let Some(keys) = self.ttl.poll() else {
                break;
            };
            let mut keys = keys.into_iter();
            while let Some(key) = keys.next() {
                let Some(completion) = self.issue_delete(&key, "ttl") else {
                    // Rejected deletes stay indexed and are retried next pass.
                    self.ttl.add(expires_at, key);
                    for rest in keys {
                        self.ttl.add(expires_at, rest);
                    }
                    break 'sweep;
                };
                pending.push(completion);
                self.policy.on_delete(&key);
                self.stats.record_ttl_expiration();
            }
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "Expired keys deleted");
        }
        settle(pending).await;
    }

    async fn enforce_capacity(&mut self) {
        let mut pending = Vec::new();

        while self.engine.size().saturating_sub(pending.len()) > self.maximum_size {
            let Some(victim) = self.policy.evict() else {
                error!(
                    size = self.engine.size(),
                    maximum_size = self.maximum_size,
                    tracked = self.policy.len(),
                    "Store and eviction policy have diverged, no victim available"
                );
                break;
            };
            match self.issue_delete(&victim, "eviction") {
                Some(completion) => pending.push(completion),
                None => {
                    // Worker gone or saturated; retry on the next pass.
                    break;
                }
            }
            self.policy.on_delete(&victim);
            self.ttl.remove(&victim);
            self.stats.record_eviction();
            debug!(key = %victim, policy = self.policy.name(), "Evicted");
        }

        settle(pending).await;
    }

    fn issue_delete(&self, key: &str, reason: &'static str) -> Option<Completion<()>> {
        match self.engine.submit_delete(key) {
            Ok(completion) => Some(completion),
            Err(e) => {
                warn!(key, reason, error = %e, "Failed to submit maintenance delete");
                None
            }
        }
    }

    fn publish_gauges(&self) {
        let gauges = &self.gauges;
        gauges.tracked_keys.store(self.policy.len(), Ordering::Relaxed);
        gauges.ttl_buckets.store(self.ttl.size(), Ordering::Relaxed);
        gauges.ttl_keys.store(self.ttl.key_count(), Ordering::Relaxed);
        gauges
            .event_queue_depth
            .store(self.events.len(), Ordering::Relaxed);
    }
}

/// Waits until every delete of a sweep has been applied, so the next size
/// reading reflects them.
async fn settle(pending: Vec<Completion<()>>) {
    for completion in pending {
        if let Err(e) = completion.with_timeout(DELETE_SETTLE_TIMEOUT).await {
            warn!(error = %e, "Maintenance delete did not complete");
        }
    }
}

// == Maintenance Handle ==
/// Stop signal plus join handle of a spawned [`MaintenanceLoop`].
#[derive(Debug)]
pub struct MaintenanceHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    // == Stop ==
    /// Signals the loop and waits up to `grace` for it to finish its current
    /// iteration. Aborts the task if it does not.
    ///
    /// Returns `true` when the loop exited on its own.
    pub async fn stop(mut self, grace: Duration) -> bool {
        let _ = self.stop_tx.send(true);
        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "Maintenance loop task failed");
                false
            }
            Err(_) => {
                warn!(?grace, "Maintenance loop did not stop in time, aborting");
                self.task.abort();
                false
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
