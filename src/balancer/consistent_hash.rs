//! Consistent hashing with virtual replicas: the same key keeps landing on
//! the same node as long as the node set is stable, and only the keys that
//! hashed near a removed/added node move when the set changes.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use super::{KeyedBalancer, Node};
use crate::config::defaults::default_consistent_hash_replicas;

fn hash_u64(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is at least 8 bytes"))
}

/// Ring of virtual replicas. Rebuilt from the node slice on every pick,
/// since node sets only change on registry updates (seconds-scale), not on
/// the message-dispatch hot path.
pub struct ConsistentHashBalancer {
    replicas: u32,
}

impl ConsistentHashBalancer {
    #[must_use]
    pub fn new(replicas: u32) -> Self {
        Self {
            replicas: replicas.max(1),
        }
    }

    fn build_ring(&self, nodes: &[Node]) -> BTreeMap<u64, &Node> {
        let mut ring = BTreeMap::new();
        for node in nodes {
            for replica in 0..self.replicas {
                let point = hash_u64(&format!("{}#{replica}", node.id));
                ring.insert(point, node);
            }
        }
        ring
    }
}

impl Default for ConsistentHashBalancer {
    fn default() -> Self {
        Self::new(u32::try_from(default_consistent_hash_replicas()).unwrap_or(150))
    }
}

impl KeyedBalancer for ConsistentHashBalancer {
    fn pick_for_key(&self, nodes: &[Node], key: &str) -> Option<Node> {
        if nodes.is_empty() {
            return None;
        }
        let ring = self.build_ring(nodes);
        let target = hash_u64(key);

        let picked = ring
            .range(target..)
            .next()
            .or_else(|| ring.iter().next())
            .map(|(_, node)| (*node).clone());
        picked
    }
}
