//! Consistent-Hash Cluster Router
//!
//! Maps keys to owning nodes. Every physical node owns `virtual_nodes`
//! positions on a 64-bit ring, position `i` being `hash("{node_id}-{i}")`.
//! A key belongs to the node at the first position at or after the key's
//! hash, wrapping to the lowest position. Adding or removing a node only
//! moves the keys between its positions and their predecessors.
//!
//! Lookups take a shared lock for the duration of one ordered-map probe;
//! membership changes hash outside the lock and hold the exclusive lock only
//! while splicing positions in or out.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Default ring positions per physical node.
pub const DEFAULT_VIRTUAL_NODES: usize = 10;

#[derive(Debug, Default)]
struct RingState {
    /// position -> node id
    ring: BTreeMap<u64, String>,
    /// active node id -> address
    nodes: HashMap<String, String>,
}

// == Cluster Router ==
#[derive(Debug)]
pub struct ClusterRouter {
    local_node_id: String,
    virtual_nodes: usize,
    state: RwLock<RingState>,
}

impl ClusterRouter {
    // == Constructor ==
    /// Creates an empty ring for `local_node_id`.
    ///
    /// An empty ring routes every key to the local node.
    pub fn new(local_node_id: impl Into<String>, virtual_nodes: usize) -> Self {
        let local_node_id = local_node_id.into();
        let virtual_nodes = virtual_nodes.max(1);
        info!(
            local_node_id = %local_node_id,
            virtual_nodes,
            "Cluster router initialized"
        );
        Self {
            local_node_id,
            virtual_nodes,
            state: RwLock::new(RingState::default()),
        }
    }

    pub fn local_node_id(&self) -> &str {
        &self.local_node_id
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }

    // == Find Owner ==
    /// Returns the id of the node owning `key`.
    pub fn find_owner(&self, key: &str) -> String {
        let key_hash = hash(key);
        let state = self.state.read();
        state
            .ring
            .range(key_hash..)
            .next()
            .or_else(|| state.ring.iter().next())
            .map(|(_, node)| node.clone())
            .unwrap_or_else(|| self.local_node_id.clone())
    }

    /// Returns `true` if the local node owns `key`.
    pub fn is_local(&self, key: &str) -> bool {
        self.find_owner(key) == self.local_node_id
    }

    // == All Node Ids ==
    pub fn all_node_ids(&self) -> BTreeSet<String> {
        self.state.read().nodes.keys().cloned().collect()
    }

    // == Address Of ==
    /// Returns the address registered for `node_id`, if it is non-empty.
    pub fn address_of(&self, node_id: &str) -> Option<String> {
        let address = self.state.read().nodes.get(node_id).cloned();
        match address {
            Some(address) if !address.is_empty() => Some(address),
            _ => {
                warn!(node_id, "Address for node is empty");
                None
            }
        }
    }

    // == Add Node ==
    /// Adds `node_id` at `address`. Adding a present node is a no-op.
    ///
    /// Returns `true` if the node was added.
    pub fn add_node(&self, node_id: impl Into<String>, address: impl Into<String>) -> bool {
        let node_id = node_id.into();
        let positions = self.positions(&node_id);

        let mut state = self.state.write();
        if state.nodes.contains_key(&node_id) {
            return false;
        }
        for position in positions {
            if let Some(previous) = state.ring.insert(position, node_id.clone()) {
                warn!(
                    position,
                    previous = %previous,
                    node_id = %node_id,
                    "Ring position collision, later node takes the position"
                );
            }
        }
        let address = address.into();
        state.nodes.insert(node_id.clone(), address.clone());
        let total_nodes = state.nodes.len();
        drop(state);

        info!(
            node_id = %node_id,
            address = %address,
            virtual_nodes = self.virtual_nodes,
            total_nodes,
            "Node added to ring"
        );
        true
    }

    /// Adds `node_id` using the id itself as its address.
    pub fn add_node_id(&self, node_id: impl Into<String>) -> bool {
        let node_id = node_id.into();
        self.add_node(node_id.clone(), node_id)
    }

    // == Remove Node ==
    /// Removes `node_id` and exactly its ring positions. Removing an absent
    /// node is a no-op.
    ///
    /// Returns `true` if the node was removed.
    pub fn remove_node(&self, node_id: &str) -> bool {
        let positions = self.positions(node_id);

        let mut state = self.state.write();
        if state.nodes.remove(node_id).is_none() {
            return false;
        }
        for position in positions {
            if state.ring.get(&position).map(String::as_str) == Some(node_id) {
                state.ring.remove(&position);
            }
        }
        let total_nodes = state.nodes.len();
        drop(state);

        warn!(
            node_id,
            virtual_nodes = self.virtual_nodes,
            total_nodes,
            "Node removed from ring"
        );
        true
    }

    // == Is Ready ==
    /// Returns `true` once the ring holds at least one position.
    pub fn is_ready(&self) -> bool {
        !self.state.read().ring.is_empty()
    }

    /// Number of occupied ring positions.
    pub fn ring_size(&self) -> usize {
        self.state.read().ring.len()
    }

    fn positions(&self, node_id: &str) -> Vec<u64> {
        (0..self.virtual_nodes)
            .map(|i| hash(&format!("{}-{}", node_id, i)))
            .collect()
    }
}

// == Hash ==
/// 64-bit ring hash: the first 8 bytes of the SHA-256 digest, big-endian.
pub fn hash(value: &str) -> u64 {
    let digest = Sha256::digest(value.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
