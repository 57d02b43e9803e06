//! Single-Writer Cache Engine
//!
//! All reads and writes of the store run on one worker task that drains a
//! bounded request queue in submission order, so the store needs no lock.
//! Callers get a [`Completion`] back as soon as their request is queued.
//!
//! For each request the worker first asks the [`ClusterRouter`] who owns the
//! key. Requests for keys owned elsewhere are handed to the [`Forwarder`] and
//! completed from a spawned task once the owner answers; the worker never
//! waits on the network.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheOperation, CacheStats, EventSender};
use crate::clock::SharedClock;
use crate::cluster::{ClusterRouter, Forwarder};
use crate::error::{CacheError, Result};

// == Completion ==
/// Pending result of a submitted request.
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    /// Waits at most `timeout` for the result.
    ///
    /// Timing out only abandons the wait; the queued request still runs.
    pub async fn with_timeout(self, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CacheError::WorkerUnavailable)))
    }
}

enum Command {
    Put {
        value: String,
        ttl_secs: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    Get {
        reply: oneshot::Sender<Result<Option<String>>>,
    },
    Delete {
        reply: oneshot::Sender<Result<()>>,
    },
}

struct CacheTask {
    key: String,
    command: Command,
}

// == Cache Engine ==
/// Cloneable handle to the engine worker.
#[derive(Clone)]
pub struct CacheEngine {
    tx: mpsc::Sender<CacheTask>,
    size: Arc<AtomicUsize>,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("size", &self.size())
            .finish()
    }
}

/// Collaborators the worker needs.
pub struct EngineParts {
    pub router: Arc<ClusterRouter>,
    pub forwarder: Arc<dyn Forwarder>,
    pub events: EventSender,
    pub clock: SharedClock,
    pub stats: Arc<CacheStats>,
}

impl CacheEngine {
    // == Start ==
    /// Spawns the worker on the current tokio runtime and returns a handle.
    ///
    /// The worker exits once every handle has been dropped.
    ///
    /// # Arguments
    /// * `parts` - Router, forwarder, event queue, clock and stats
    /// * `queue_capacity` - Bound on requests waiting for the worker
    pub fn start(parts: EngineParts, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let size = Arc::new(AtomicUsize::new(0));
        let worker = Worker {
            store: HashMap::new(),
            rx,
            size: size.clone(),
            router: parts.router,
            forwarder: parts.forwarder,
            events: parts.events,
            clock: parts.clock,
            stats: parts.stats,
        };
        tokio::spawn(worker.run());
        Self { tx, size }
    }

    // == Submit Put ==
    /// Queues a PUT of `value` under `key`, expiring `ttl_secs` from execution.
    pub fn submit_put(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_secs: u64,
    ) -> Result<Completion<()>> {
        let key = validate_key(key.into(), "PUT")?;
        let (reply, rx) = oneshot::channel();
        self.enqueue(CacheTask {
            key,
            command: Command::Put {
                value: value.into(),
                ttl_secs,
                reply,
            },
        })?;
        Ok(Completion { rx })
    }

    // == Submit Get ==
    /// Queues a GET; resolves to `None` on a miss.
    pub fn submit_get(&self, key: impl Into<String>) -> Result<Completion<Option<String>>> {
        let key = validate_key(key.into(), "GET")?;
        let (reply, rx) = oneshot::channel();
        self.enqueue(CacheTask {
            key,
            command: Command::Get { reply },
        })?;
        Ok(Completion { rx })
    }

    // == Submit Delete ==
    /// Queues a DELETE. Deleting an absent key succeeds.
    pub fn submit_delete(&self, key: impl Into<String>) -> Result<Completion<()>> {
        let key = validate_key(key.into(), "DELETE")?;
        let (reply, rx) = oneshot::channel();
        self.enqueue(CacheTask {
            key,
            command: Command::Delete { reply },
        })?;
        Ok(Completion { rx })
    }

    // == Size ==
    /// Number of entries in the local store as last published by the worker.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn enqueue(&self, task: CacheTask) -> Result<()> {
        self.tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(task) => {
                warn!(key = %task.key, "Request queue full, rejecting request");
                CacheError::Overloaded
            }
            TrySendError::Closed(_) => CacheError::WorkerUnavailable,
        })
    }
}

fn validate_key(key: String, op: &str) -> Result<String> {
    if key.is_empty() {
        error!(op, "Rejecting request with empty key");
        return Err(CacheError::InvalidArgument(
            "Key cannot be empty".to_string(),
        ));
    }
    Ok(key)
}

// == Worker ==
struct Worker {
    store: HashMap<String, CacheEntry>,
    rx: mpsc::Receiver<CacheTask>,
    size: Arc<AtomicUsize>,
    router: Arc<ClusterRouter>,
    forwarder: Arc<dyn Forwarder>,
    events: EventSender,
    clock: SharedClock,
    stats: Arc<CacheStats>,
}

impl Worker {
    async fn run(mut self) {
        info!(node = %self.router.local_node_id(), "Cache engine worker started");
        while let Some(task) = self.rx.recv().await {
            self.execute(task);
        }
        info!("Cache engine worker stopped");
    }

    fn execute(&mut self, task: CacheTask) {
        let owner = self.router.find_owner(&task.key);
        if owner != self.router.local_node_id() {
            warn!(
                key = %task.key,
                owner = %owner,
                local = %self.router.local_node_id(),
                "Not owner, forwarding request"
            );
            self.forward(owner, task);
            return;
        }

        let now = self.clock.now_secs();
        let CacheTask { key, command } = task;
        match command {
            Command::Put {
                value,
                ttl_secs,
                reply,
            } => {
                self.put(key, value, now, ttl_secs);
                let _ = reply.send(Ok(()));
            }
            Command::Get { reply } => {
                let value = self.get(key, now);
                let _ = reply.send(Ok(value));
            }
            Command::Delete { reply } => {
                self.delete(key);
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn put(&mut self, key: String, value: String, now: u64, ttl_secs: u64) {
        let entry = CacheEntry::new(value, now, ttl_secs);
        debug!(key = %key, expires_at = entry.expiration_time(), "PUT");
        self.store.insert(key.clone(), entry.clone());
        self.publish_size();
        self.stats.record_put();
        self.events.submit(CacheOperation::put(key, entry));
    }

    fn get(&mut self, key: String, now: u64) -> Option<String> {
        let (value, expired) = match self.store.get(&key) {
            None => (None, false),
            Some(entry) if entry.is_expired(now) => (None, true),
            Some(entry) => (Some(entry.value().to_string()), false),
        };

        match value {
            Some(value) => {
                debug!(key = %key, "GET hit");
                self.stats.record_hit();
                self.events.submit(CacheOperation::get(key));
                Some(value)
            }
            None => {
                if expired {
                    debug!(key = %key, "GET found expired entry");
                    self.store.remove(&key);
                    self.publish_size();
                    self.stats.record_ttl_expiration();
                    self.events.submit(CacheOperation::delete(key));
                }
                self.stats.record_miss();
                None
            }
        }
    }

    fn delete(&mut self, key: String) {
        if self.store.remove(&key).is_some() {
            self.publish_size();
            self.stats.record_remove();
        }
        debug!(key = %key, "DELETE");
        self.events.submit(CacheOperation::delete(key));
    }

    fn publish_size(&self) {
        self.size.store(self.store.len(), Ordering::Release);
    }

    fn forward(&self, owner: String, task: CacheTask) {
        let Some(address) = self.router.address_of(&owner) else {
            error!(owner = %owner, key = %task.key, "No address found for owner node");
            let err = CacheError::AddressNotFound { node: owner };
            match task.command {
                Command::Put { reply, .. } | Command::Delete { reply } => {
                    let _ = reply.send(Err(err));
                }
                Command::Get { reply } => {
                    let _ = reply.send(Err(err));
                }
            }
            return;
        };

        debug!(owner = %owner, address = %address, key = %task.key, "Forwarding request");
        let key = task.key;
        match task.command {
            Command::Put {
                value,
                ttl_secs,
                reply,
            } => {
                let call = self.forwarder.forward_put(&address, &key, &value, ttl_secs);
                complete_later(call, reply);
            }
            Command::Get { reply } => {
                let call = self.forwarder.forward_get(&address, &key);
                complete_later(call, reply);
            }
            Command::Delete { reply } => {
                let call = self.forwarder.forward_delete(&address, &key);
                complete_later(call, reply);
            }
        }
    }
}

fn complete_later<T, F>(call: F, reply: oneshot::Sender<Result<T>>)
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        let _ = reply.send(call.await);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{event_queue, EventReceiver, OperationType};
    use crate::clock::ManualClock;
    use crate::cluster::ForwardFuture;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingForwarder {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingForwarder {
        fn record(&self, op: &str, address: &str, key: &str) {
            self.calls
                .lock()
                .push((op.to_string(), address.to_string(), key.to_string()));
        }
    }

    impl Forwarder for RecordingForwarder {
        fn forward_put(&self, address: &str, key: &str, _v: &str, _t: u64) -> ForwardFuture<()> {
            self.record("put", address, key);
            Box::pin(async { Ok(()) })
        }

        fn forward_get(&self, address: &str, key: &str) -> ForwardFuture<Option<String>> {
            self.record("get", address, key);
            let value = format!("remote:{}", key);
            Box::pin(async move { Ok(Some(value)) })
        }

        fn forward_delete(&self, address: &str, key: &str) -> ForwardFuture<()> {
            self.record("delete", address, key);
            Box::pin(async { Ok(()) })
        }
    }

    struct Harness {
        engine: CacheEngine,
        events: EventReceiver,
        clock: Arc<ManualClock>,
        stats: Arc<CacheStats>,
        forwarder: Arc<RecordingForwarder>,
    }

    fn harness(router: ClusterRouter) -> Harness {
        let clock = Arc::new(ManualClock::new(1_000));
        let stats = Arc::new(CacheStats::new());
        let forwarder = Arc::new(RecordingForwarder::default());
        let (tx, events) = event_queue(1024, stats.clone());
        let engine = CacheEngine::start(
            EngineParts {
                router: Arc::new(router),
                forwarder: forwarder.clone(),
                events: tx,
                clock: clock.clone(),
                stats: stats.clone(),
            },
            1024,
        );
        Harness {
            engine,
            events,
            clock,
            stats,
            forwarder,
        }
    }

    fn local_harness() -> Harness {
        let router = ClusterRouter::new("node-1", 10);
        router.add_node("node-1", "127.0.0.1:3001");
        harness(router)
    }

    fn remote_only_harness() -> Harness {
        let router = ClusterRouter::new("node-1", 10);
        router.add_node("node-2", "10.0.0.2:3000");
        harness(router)
    }

    fn drain(events: &mut EventReceiver) -> Vec<(OperationType, String)> {
        let mut seen = Vec::new();
        while let Some(op) = events.try_recv() {
            seen.push((op.op_type, op.key));
        }
        seen
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let h = local_harness();
        h.engine.submit_put("k", "v", 60).unwrap().await.unwrap();

        assert_eq!(h.engine.submit_get("k").unwrap().await.unwrap(), Some("v".to_string()));
        assert_eq!(h.engine.size(), 1);
        assert_eq!(h.stats.snapshot().hits, 1);
        assert_eq!(h.stats.snapshot().puts, 1);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let h = local_harness();
        assert_eq!(h.engine.submit_get("nope").unwrap().await.unwrap(), None);
        assert_eq!(h.stats.snapshot().misses, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_misses_on_next_get() {
        let mut h = local_harness();
        h.engine.submit_put("k", "v", 0).unwrap().await.unwrap();

        assert_eq!(h.engine.submit_get("k").unwrap().await.unwrap(), None);
        assert_eq!(h.engine.size(), 0);
        assert_eq!(
            drain(&mut h.events),
            vec![
                (OperationType::Put, "k".to_string()),
                (OperationType::Delete, "k".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let h = local_harness();
        h.engine.submit_put("k", "v", 10).unwrap().await.unwrap();

        h.clock.advance(9);
        assert!(h.engine.submit_get("k").unwrap().await.unwrap().is_some());

        h.clock.advance(1);
        assert!(h.engine.submit_get("k").unwrap().await.unwrap().is_none());
        assert_eq!(h.engine.size(), 0, "expired entry is removed on read");
        assert_eq!(h.stats.snapshot().ttl_expirations, 1);
    }

    #[tokio::test]
    async fn test_re_put_replaces_entry() {
        let h = local_harness();
        h.engine.submit_put("k", "old", 5).unwrap().await.unwrap();
        h.engine.submit_put("k", "new", 100).unwrap().await.unwrap();

        h.clock.advance(50);
        assert_eq!(h.engine.submit_get("k").unwrap().await.unwrap(), Some("new".to_string()));
        assert_eq!(h.engine.size(), 1);
    }

    #[tokio::test]
    async fn test_delete_emits_event_even_when_absent() {
        let mut h = local_harness();
        h.engine.submit_put("k", "v", 60).unwrap().await.unwrap();
        h.engine.submit_delete("k").unwrap().await.unwrap();
        h.engine.submit_delete("absent").unwrap().await.unwrap();

        assert_eq!(h.engine.size(), 0);
        assert_eq!(h.stats.snapshot().removes, 1);
        assert_eq!(
            drain(&mut h.events),
            vec![
                (OperationType::Put, "k".to_string()),
                (OperationType::Delete, "k".to_string()),
                (OperationType::Delete, "absent".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_key_rejected_synchronously() {
        let h = local_harness();
        assert!(matches!(
            h.engine.submit_put("", "v", 1),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(h.engine.submit_get(""), Err(CacheError::InvalidArgument(_))));
        assert!(matches!(
            h.engine.submit_delete(""),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_not_owner_forwards_to_owner_address() {
        let mut h = remote_only_harness();
        h.engine.submit_put("k", "v", 60).unwrap().await.unwrap();
        let value = h.engine.submit_get("k").unwrap().await.unwrap();
        h.engine.submit_delete("k").unwrap().await.unwrap();

        assert_eq!(value, Some("remote:k".to_string()));
        assert_eq!(h.engine.size(), 0, "forwarded requests never touch the local store");
        assert!(drain(&mut h.events).is_empty());

        let calls = h.forwarder.calls.lock().clone();
        assert_eq!(calls.len(), 3);
        for (_, address, key) in &calls {
            assert_eq!(address, "10.0.0.2:3000", "forward must use the resolved owner address");
            assert_eq!(key, "k");
        }
    }

    #[tokio::test]
    async fn test_unresolved_owner_address_fails() {
        let router = ClusterRouter::new("node-1", 10);
        router.add_node("node-2", "");
        let h = harness(router);

        let result = h.engine.submit_get("k").unwrap().await;
        assert!(matches!(result, Err(CacheError::AddressNotFound { node }) if node == "node-2"));
        assert!(h.forwarder.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_puts_distinct_keys() {
        let h = local_harness();
        let mut handles = Vec::new();
        for i in 0..100 {
            let engine = h.engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .submit_put(format!("key-{}", i), format!("v{}", i), 60)
                    .unwrap()
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(h.engine.size(), 100);
    }

    #[tokio::test]
    async fn test_concurrent_puts_same_key() {
        let h = local_harness();
        let mut handles = Vec::new();
        for i in 0..50 {
            let engine = h.engine.clone();
            handles.push(tokio::spawn(async move {
                engine.submit_put("shared", format!("value-{}", i), 60).unwrap().await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.engine.size(), 1);
        let value = h.engine.submit_get("shared").unwrap().await.unwrap().unwrap();
        let index: usize = value.strip_prefix("value-").unwrap().parse().unwrap();
        assert!(index < 50);
    }

    #[tokio::test]
    async fn test_timeout_reports_timeout() {
        let (reply, rx) = oneshot::channel::<Result<()>>();
        let completion = Completion { rx };
        let result = completion.with_timeout(Duration::from_millis(10)).await;
        assert_eq!(result, Err(CacheError::Timeout));
        drop(reply);
    }

    #[tokio::test]
    async fn test_dropped_reply_reports_worker_unavailable() {
        let (reply, rx) = oneshot::channel::<Result<()>>();
        drop(reply);
        assert_eq!(Completion { rx }.await, Err(CacheError::WorkerUnavailable));
    }
}
