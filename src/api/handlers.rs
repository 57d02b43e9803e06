//! API Handlers
//!
//! HTTP request handlers for the public `/cache` surface, the node-to-node
//! `/rpc` surface and the operational endpoints. Handlers only translate
//! between DTOs and [`CacheEngine`] submissions; every request waits at most
//! the configured request timeout for its result.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::cache::{event_queue, CacheEngine, CacheStats, Completion, EngineParts};
use crate::clock::SharedClock;
use crate::cluster::{ClusterRouter, Forwarder};
use crate::config::Config;
use crate::error::Result;
use crate::eviction::EvictionKind;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, KeyQuery, PutRequest, PutResponse,
    RpcDeleteRequest, RpcDeleteResponse, RpcGetRequest, RpcGetResponse, RpcPutRequest,
    RpcPutResponse, StatsResponse,
};
use crate::tasks::{MaintenanceGauges, MaintenanceLoop};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: CacheEngine,
    pub router: Arc<ClusterRouter>,
    pub stats: Arc<CacheStats>,
    pub gauges: Arc<MaintenanceGauges>,
    pub request_timeout: Duration,
    pub eviction_policy: EvictionKind,
    pub maximum_size: usize,
}

impl AppState {
    /// Wires a node from configuration.
    ///
    /// Builds the ring from the static membership list, starts the engine
    /// worker on the current runtime and returns the maintenance loop
    /// unstarted so the caller picks the runtime it runs on.
    ///
    /// # Arguments
    /// * `config` - Node configuration
    /// * `forwarder` - Client used to reach other owners
    /// * `clock` - Time source shared by the engine and the maintenance loop
    pub fn from_config(
        config: &Config,
        forwarder: Arc<dyn Forwarder>,
        clock: SharedClock,
    ) -> (Self, MaintenanceLoop) {
        let router = Arc::new(build_ring(config));
        let stats = Arc::new(CacheStats::new());
        let (events_tx, events_rx) = event_queue(config.event_queue_capacity, stats.clone());

        let engine = CacheEngine::start(
            EngineParts {
                router: router.clone(),
                forwarder,
                events: events_tx,
                clock: clock.clone(),
                stats: stats.clone(),
            },
            config.request_queue_capacity,
        );

        let maintenance = MaintenanceLoop::new(
            events_rx,
            config.eviction_policy.build(),
            engine.clone(),
            clock,
            stats.clone(),
            config.maximum_size(),
        );

        let state = Self {
            engine,
            router,
            stats,
            gauges: maintenance.gauges(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            eviction_policy: config.eviction_policy,
            maximum_size: config.maximum_size(),
        };
        (state, maintenance)
    }

    async fn wait<T>(&self, submitted: Result<Completion<T>>) -> Result<T> {
        submitted?.with_timeout(self.request_timeout).await
    }
}

/// Places every configured node on the ring, adding the local node when the
/// membership list leaves it out.
fn build_ring(config: &Config) -> ClusterRouter {
    let router = ClusterRouter::new(config.node_id.clone(), config.virtual_nodes);
    for node in &config.cluster_nodes {
        router.add_node(node.id.clone(), node.address.clone());
    }
    if !router.all_node_ids().contains(&config.node_id) {
        warn!(
            node = %config.node_id,
            "Local node missing from cluster membership, adding it"
        );
        router.add_node(
            config.node_id.clone(),
            format!("127.0.0.1:{}", config.server_port),
        );
    }
    info!(
        nodes = router.all_node_ids().len(),
        positions = router.ring_size(),
        "Hash ring initialized"
    );
    router
}

// == Public Cache Surface ==

/// Handler for `PUT /cache`
pub async fn put_handler(
    State(state): State<AppState>,
    Json(req): Json<PutRequest>,
) -> (StatusCode, Json<PutResponse>) {
    let result = match req.validate() {
        Ok(value) => {
            let submitted = state.engine.submit_put(req.key.as_str(), value, req.ttl_in_sec);
            state.wait(submitted).await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => (StatusCode::OK, Json(PutResponse::ok())),
        Err(e) => {
            warn!(key = %req.key, error = %e, "PUT failed");
            (e.status_code(), Json(PutResponse::failed(&e)))
        }
    }
}

/// Handler for `GET /cache?key=...`
///
/// A miss answers 200 with neither `value` nor an error.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> (StatusCode, Json<GetResponse>) {
    let submitted = state.engine.submit_get(query.key.as_str());
    match state.wait(submitted).await {
        Ok(value) => (StatusCode::OK, Json(GetResponse::value(value))),
        Err(e) => {
            warn!(key = %query.key, error = %e, "GET failed");
            (e.status_code(), Json(GetResponse::failed(&e)))
        }
    }
}

/// Handler for `DELETE /cache?key=...`
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> (StatusCode, Json<DeleteResponse>) {
    let submitted = state.engine.submit_delete(query.key.as_str());
    match state.wait(submitted).await {
        Ok(()) => (StatusCode::OK, Json(DeleteResponse::ok())),
        Err(e) => {
            warn!(key = %query.key, error = %e, "DELETE failed");
            (e.status_code(), Json(DeleteResponse::failed(&e)))
        }
    }
}

// == Node-to-Node RPC Surface ==

/// Handler for `POST /rpc/put`
pub async fn rpc_put_handler(
    State(state): State<AppState>,
    Json(req): Json<RpcPutRequest>,
) -> Result<Json<RpcPutResponse>> {
    let submitted = state.engine.submit_put(req.key, req.value, req.ttl_in_sec);
    state.wait(submitted).await?;
    Ok(Json(RpcPutResponse { success: true }))
}

/// Handler for `POST /rpc/get`
pub async fn rpc_get_handler(
    State(state): State<AppState>,
    Json(req): Json<RpcGetRequest>,
) -> Result<Json<RpcGetResponse>> {
    let submitted = state.engine.submit_get(req.key);
    let value = state.wait(submitted).await?;
    Ok(Json(RpcGetResponse {
        found: value.is_some(),
        value: value.unwrap_or_default(),
    }))
}

/// Handler for `POST /rpc/delete`
pub async fn rpc_delete_handler(
    State(state): State<AppState>,
    Json(req): Json<RpcDeleteRequest>,
) -> Result<Json<RpcDeleteResponse>> {
    let submitted = state.engine.submit_delete(req.key);
    state.wait(submitted).await?;
    Ok(Json(RpcDeleteResponse { success: true }))
}

// == Operational Endpoints ==

/// Handler for `GET /stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let counters = state.stats.snapshot();
    Json(StatsResponse {
        node_id: state.router.local_node_id().to_string(),
        eviction_policy: state.eviction_policy.to_string(),
        size: state.engine.size(),
        maximum_size: state.maximum_size,
        hit_rate: counters.hit_rate(),
        counters,
        maintenance: state.gauges.snapshot(),
    })
}

/// Handler for `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.router.local_node_id(),
        state.router.is_ready(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cluster::UnreachableForwarder;
    use crate::config::NodeSpec;
    use crate::error::CacheError;

    fn test_state(config: &Config) -> AppState {
        let clock = Arc::new(ManualClock::new(10_000));
        let (state, _maintenance) =
            AppState::from_config(config, Arc::new(UnreachableForwarder), clock);
        state
    }

    fn single_node() -> Config {
        Config::default()
    }

    fn put_request(key: &str, value: Option<&str>, ttl: u64) -> PutRequest {
        PutRequest {
            key: key.to_string(),
            value: value.map(str::to_string),
            ttl_in_sec: ttl,
        }
    }

    fn key(key: &str) -> Query<KeyQuery> {
        Query(KeyQuery {
            key: key.to_string(),
        })
    }

    #[tokio::test]
    async fn test_put_and_get_handler() {
        let state = test_state(&single_node());

        let (status, Json(resp)) =
            put_handler(State(state.clone()), Json(put_request("k", Some("v"), 60))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(resp.put_status);

        let (status, Json(resp)) = get_handler(State(state), key("k")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_get_miss_has_no_value() {
        let state = test_state(&single_node());
        let (status, Json(resp)) = get_handler(State(state), key("nonexistent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp, GetResponse::value(None));
    }

    #[tokio::test]
    async fn test_put_missing_value_rejected() {
        let state = test_state(&single_node());
        let (status, Json(resp)) =
            put_handler(State(state.clone()), Json(put_request("k", None, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!resp.put_status);
        assert_eq!(resp.error_code.as_deref(), Some("INVALID_ARGUMENT"));
        assert_eq!(state.stats.snapshot().puts, 0);
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state(&single_node());
        put_handler(State(state.clone()), Json(put_request("gone", Some("v"), 60))).await;

        let (status, Json(resp)) = delete_handler(State(state.clone()), key("gone")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(resp.remove_status);

        let (_, Json(resp)) = get_handler(State(state), key("gone")).await;
        assert_eq!(resp.value, None);
    }

    #[tokio::test]
    async fn test_rpc_handlers_use_local_engine() {
        let state = test_state(&single_node());

        let Json(put) = rpc_put_handler(
            State(state.clone()),
            Json(RpcPutRequest {
                key: "r".to_string(),
                value: "1".to_string(),
                ttl_in_sec: 30,
            }),
        )
        .await
        .unwrap();
        assert!(put.success);

        let Json(got) = rpc_get_handler(
            State(state.clone()),
            Json(RpcGetRequest {
                key: "r".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            got,
            RpcGetResponse {
                found: true,
                value: "1".to_string()
            }
        );

        let err = rpc_get_handler(
            State(state),
            Json(RpcGetRequest {
                key: String::new(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CacheError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_stats_handler_reports_size_and_policy() {
        let state = test_state(&single_node());
        put_handler(State(state.clone()), Json(put_request("a", Some("1"), 60))).await;
        get_handler(State(state.clone()), key("a")).await;
        get_handler(State(state.clone()), key("b")).await;

        let Json(stats) = stats_handler(State(state)).await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.maximum_size, 900);
        assert_eq!(stats.eviction_policy, "lfu");
        assert_eq!(stats.counters.hits, 1);
        assert_eq!(stats.counters.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = test_state(&single_node());
        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.node_id, "node-1");
        assert!(health.cluster_ready);
    }

    #[tokio::test]
    async fn test_local_node_added_when_missing_from_membership() {
        let config = Config {
            node_id: "node-9".to_string(),
            cluster_nodes: vec![NodeSpec {
                id: "node-1".to_string(),
                address: "10.0.0.1:3000".to_string(),
            }],
            ..Config::default()
        };
        let state = test_state(&config);

        assert!(state.router.all_node_ids().contains("node-9"));
        assert_eq!(
            state.router.address_of("node-9").as_deref(),
            Some("127.0.0.1:3000")
        );
    }
}
