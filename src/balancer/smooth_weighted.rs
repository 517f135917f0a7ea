//! Smooth weighted round robin (the algorithm Nginx uses for upstream
//! weighting): each node accumulates `current_weight += weight` every pick,
//! the highest accumulator wins and is knocked back down by the total
//! weight. Spreads picks evenly over time instead of bursting through a
//! high-weight node before moving on, unlike a naive weighted round robin.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Balancer, Node};

#[derive(Default)]
pub struct SmoothWeightedRoundRobin {
    current_weights: Mutex<HashMap<String, i64>>,
}

impl SmoothWeightedRoundRobin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Balancer for SmoothWeightedRoundRobin {
    fn pick(&self, nodes: &[Node]) -> Option<Node> {
        if nodes.is_empty() {
            return None;
        }

        let total_weight: i64 = nodes.iter().map(|n| i64::from(n.weight)).sum();
        let mut current = self.current_weights.lock().unwrap_or_else(|e| e.into_inner());

        // Drop entries for nodes no longer in the set so a later re-join
        // starts from zero rather than an accumulator frozen mid-cycle.
        current.retain(|id, _| nodes.iter().any(|n| &n.id == id));

        let mut best_idx = 0;
        let mut best_weight = i64::MIN;
        for (idx, node) in nodes.iter().enumerate() {
            let entry = current.entry(node.id.clone()).or_insert(0);
            *entry += i64::from(node.weight);
            if *entry > best_weight {
                best_weight = *entry;
                best_idx = idx;
            }
        }

        if let Some(entry) = current.get_mut(&nodes[best_idx].id) {
            *entry -= total_weight;
        }

        Some(nodes[best_idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributes_picks_proportional_to_weight() {
        let balancer = SmoothWeightedRoundRobin::new();
        let nodes = vec![Node::new("a", "1", 5), Node::new("b", "2", 1)];

        let mut counts = HashMap::new();
        for _ in 0..60 {
            let picked = balancer.pick(&nodes).unwrap();
            *counts.entry(picked.id).or_insert(0) += 1;
        }

        // 5:1 weight ratio over 60 picks should land close to 50/10.
        let a = *counts.get("a").unwrap_or(&0);
        let b = *counts.get("b").unwrap_or(&0);
        assert_eq!(a + b, 60);
        assert!(a > b * 3);
    }

    #[test]
    fn never_picks_the_same_node_twice_in_a_row_when_evenly_weighted() {
        let balancer = SmoothWeightedRoundRobin::new();
        let nodes = vec![Node::new("a", "1", 1), Node::new("b", "2", 1)];

        let picks: Vec<_> = (0..4).map(|_| balancer.pick(&nodes).unwrap().id).collect();
        for window in picks.windows(2) {
            assert_ne!(window[0], window[1]);
        }
    }

    #[test]
    fn empty_set_yields_none() {
        assert!(SmoothWeightedRoundRobin::new().pick(&[]).is_none());
    }
}
