//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::cluster::DEFAULT_VIRTUAL_NODES;
use crate::eviction::EvictionKind;

// == Node Spec ==
/// One member of the static cluster membership list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Node identifier placed on the hash ring
    pub id: String,
    /// `host:port` the node's RPC surface listens on
    pub address: String,
}

impl NodeSpec {
    /// Parses a comma-separated `id=address` list.
    ///
    /// An entry without `=` uses its id as the address. Empty ids are skipped.
    pub fn parse_list(raw: &str) -> Vec<NodeSpec> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let (id, address) = match entry.split_once('=') {
                    Some((id, address)) => (id.trim(), address.trim()),
                    None => (entry, entry),
                };
                if id.is_empty() {
                    warn!(entry, "Skipping cluster node entry with empty id");
                    return None;
                }
                Some(NodeSpec {
                    id: id.to_string(),
                    address: address.to_string(),
                })
            })
            .collect()
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier of this node on the ring
    pub node_id: String,
    /// Ring positions per physical node
    pub virtual_nodes: usize,
    /// Initial static membership
    pub cluster_nodes: Vec<NodeSpec>,
    /// Configured maximum number of resident entries
    pub max_cache_size: usize,
    /// Margin subtracted from `max_cache_size` before eviction kicks in
    pub headroom: usize,
    /// Policy used to choose eviction victims
    pub eviction_policy: EvictionKind,
    /// Worker threads dedicated to the maintenance loop
    pub cleaner_threads: usize,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Capacity of the engine's request queue
    pub request_queue_capacity: usize,
    /// Capacity of the operation event queue
    pub event_queue_capacity: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NODE_ID` - Local node id (default: node-1)
    /// - `VIRTUAL_NODES` - Ring positions per node (default: 10)
    /// - `CLUSTER_NODES` - `id=address` list (default: node-1=127.0.0.1:3000)
    /// - `MAX_CACHE_SIZE` - Maximum cache entries (default: 1000)
    /// - `HEADROOM` - Reserved margin below the maximum (default: 100)
    /// - `EVICTION_POLICY` - fifo, lru or lfu (default: lfu)
    /// - `CLEANER_THREADS` - Maintenance threads (default: 1)
    /// - `REQUEST_TIMEOUT_MS` - Per-request timeout (default: 500)
    /// - `REQUEST_QUEUE_CAPACITY` - Engine queue bound (default: 10000)
    /// - `EVENT_QUEUE_CAPACITY` - Event queue bound (default: 10000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node_id: env::var("NODE_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.node_id),
            virtual_nodes: parse_env("VIRTUAL_NODES").unwrap_or(defaults.virtual_nodes),
            cluster_nodes: env::var("CLUSTER_NODES")
                .ok()
                .map(|raw| NodeSpec::parse_list(&raw))
                .filter(|nodes| !nodes.is_empty())
                .unwrap_or(defaults.cluster_nodes),
            max_cache_size: parse_env("MAX_CACHE_SIZE").unwrap_or(defaults.max_cache_size),
            headroom: parse_env("HEADROOM").unwrap_or(defaults.headroom),
            eviction_policy: parse_env("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
            cleaner_threads: parse_env("CLEANER_THREADS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.cleaner_threads),
            request_timeout_ms: parse_env("REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            request_queue_capacity: parse_env("REQUEST_QUEUE_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.request_queue_capacity),
            event_queue_capacity: parse_env("EVENT_QUEUE_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.event_queue_capacity),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    // == Maximum Size ==
    /// Resident entry count above which the maintenance loop evicts.
    pub fn maximum_size(&self) -> usize {
        self.max_cache_size.saturating_sub(self.headroom)
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            cluster_nodes: vec![NodeSpec {
                id: "node-1".to_string(),
                address: "127.0.0.1:3000".to_string(),
            }],
            max_cache_size: 1000,
            headroom: 100,
            eviction_policy: EvictionKind::Lfu,
            cleaner_threads: 1,
            request_timeout_ms: 500,
            request_queue_capacity: 10_000,
            event_queue_capacity: 10_000,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.node_id, "node-1");
        assert_eq!(config.virtual_nodes, 10);
        assert_eq!(config.max_cache_size, 1000);
        assert_eq!(config.headroom, 100);
        assert_eq!(config.maximum_size(), 900);
        assert_eq!(config.eviction_policy, EvictionKind::Lfu);
        assert_eq!(config.request_timeout_ms, 500);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "NODE_ID",
            "VIRTUAL_NODES",
            "CLUSTER_NODES",
            "MAX_CACHE_SIZE",
            "HEADROOM",
            "EVICTION_POLICY",
            "CLEANER_THREADS",
            "REQUEST_TIMEOUT_MS",
            "SERVER_PORT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.node_id, "node-1");
        assert_eq!(config.virtual_nodes, 10);
        assert_eq!(config.cluster_nodes.len(), 1);
        assert_eq!(config.cleaner_threads, 1);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_maximum_size_saturates() {
        let config = Config {
            max_cache_size: 10,
            headroom: 50,
            ..Config::default()
        };
        assert_eq!(config.maximum_size(), 0);
    }

    #[test]
    fn test_parse_node_list() {
        let nodes = NodeSpec::parse_list("node-1=10.0.0.1:3000, node-2=10.0.0.2:3000,node-3");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].id, "node-1");
        assert_eq!(nodes[0].address, "10.0.0.1:3000");
        assert_eq!(nodes[1].address, "10.0.0.2:3000");
        assert_eq!(nodes[2].id, "node-3");
        assert_eq!(nodes[2].address, "node-3");
    }

    #[test]
    fn test_parse_node_list_skips_empty_entries() {
        let nodes = NodeSpec::parse_list(",=10.0.0.9:1, ,node-1=a:1,");
        assert_eq!(
            nodes,
            vec![NodeSpec {
                id: "node-1".to_string(),
                address: "a:1".to_string()
            }]
        );
    }
}
