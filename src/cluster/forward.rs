//! Request Forwarding
//!
//! Narrow client interface the engine uses to hand a request to the node
//! that owns its key. Returned futures are `'static` so the engine worker can
//! spawn them and move on without waiting for the remote answer.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::error::{CacheError, Result};
use crate::models::{
    RpcDeleteRequest, RpcDeleteResponse, RpcGetRequest, RpcGetResponse, RpcPutRequest,
    RpcPutResponse,
};

/// Boxed future produced by a [`Forwarder`].
pub type ForwardFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

// == Forwarder Trait ==
pub trait Forwarder: Send + Sync {
    /// Stores `key` on the node at `address`.
    fn forward_put(&self, address: &str, key: &str, value: &str, ttl_secs: u64)
        -> ForwardFuture<()>;

    /// Reads `key` from the node at `address`.
    fn forward_get(&self, address: &str, key: &str) -> ForwardFuture<Option<String>>;

    /// Deletes `key` on the node at `address`.
    fn forward_delete(&self, address: &str, key: &str) -> ForwardFuture<()>;
}

// == HTTP Forwarder ==
/// Calls the owner's `/rpc/*` routes with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Creates a forwarder whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build RPC client: {}", e)))?;
        Ok(Self { client })
    }

    fn call<Req, Resp>(&self, address: &str, route: &'static str, body: Req) -> ForwardFuture<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned + Send + 'static,
    {
        // Body is serialized here; the future only owns the built request.
        let request = self
            .client
            .post(format!("http://{}/rpc/{}", address, route))
            .json(&body);
        let address = address.to_string();
        Box::pin(async move {
            let result = async move {
                request
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Resp>()
                    .await
            }
            .await;
            result.map_err(|e| {
                error!(address = %address, route, error = %e, "Forward call failed");
                CacheError::Forwarding(format!("{} {}: {}", route, address, e))
            })
        })
    }
}

impl Forwarder for HttpForwarder {
    fn forward_put(
        &self,
        address: &str,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> ForwardFuture<()> {
        let request = RpcPutRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl_in_sec: ttl_secs,
        };
        let call = self.call::<_, RpcPutResponse>(address, "put", request);
        Box::pin(async move {
            if call.await?.success {
                Ok(())
            } else {
                Err(CacheError::Forwarding("remote PUT reported failure".to_string()))
            }
        })
    }

    fn forward_get(&self, address: &str, key: &str) -> ForwardFuture<Option<String>> {
        let request = RpcGetRequest {
            key: key.to_string(),
        };
        let call = self.call::<_, RpcGetResponse>(address, "get", request);
        Box::pin(async move {
            let response = call.await?;
            Ok(response.found.then_some(response.value))
        })
    }

    fn forward_delete(&self, address: &str, key: &str) -> ForwardFuture<()> {
        let request = RpcDeleteRequest {
            key: key.to_string(),
        };
        let call = self.call::<_, RpcDeleteResponse>(address, "delete", request);
        Box::pin(async move {
            if call.await?.success {
                Ok(())
            } else {
                Err(CacheError::Forwarding(
                    "remote DELETE reported failure".to_string(),
                ))
            }
        })
    }
}

// == Unreachable Forwarder ==
/// Forwarder for single-node deployments: every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnreachableForwarder;

impl UnreachableForwarder {
    fn fail<T: Send + 'static>(address: &str) -> ForwardFuture<T> {
        let message = format!("no route to {}", address);
        Box::pin(async move { Err(CacheError::Forwarding(message)) })
    }
}

impl Forwarder for UnreachableForwarder {
    fn forward_put(&self, address: &str, _key: &str, _value: &str, _ttl: u64) -> ForwardFuture<()> {
        Self::fail(address)
    }

    fn forward_get(&self, address: &str, _key: &str) -> ForwardFuture<Option<String>> {
        Self::fail(address)
    }

    fn forward_delete(&self, address: &str, _key: &str) -> ForwardFuture<()> {
        Self::fail(address)
    }
}
