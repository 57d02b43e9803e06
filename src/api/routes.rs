//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, put_handler, rpc_delete_handler,
    rpc_get_handler, rpc_put_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a value with a TTL
/// - `GET /cache?key=` - Read a value
/// - `DELETE /cache?key=` - Delete a key
/// - `POST /rpc/put`, `POST /rpc/get`, `POST /rpc/delete` - Forwarded requests from peers
/// - `GET /stats` - Counters and maintenance gauges
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let rpc = Router::new()
        .route("/put", post(rpc_put_handler))
        .route("/get", post(rpc_get_handler))
        .route("/delete", post(rpc_delete_handler));

    Router::new()
        .route(
            "/cache",
            get(get_handler).put(put_handler).delete(delete_handler),
        )
        .nest("/rpc", rpc)
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
