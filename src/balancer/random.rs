//! Uniform random pick, ignoring weight.

use rand::Rng;

use super::{Balancer, Node};

#[derive(Debug, Default)]
pub struct RandomBalancer;

impl Balancer for RandomBalancer {
    fn pick(&self, nodes: &[Node]) -> Option<Node> {
        if nodes.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..nodes.len());
        Some(nodes[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_yields_none() {
        assert!(RandomBalancer.pick(&[]).is_none());
    }

    #[test]
    fn single_node_always_picked() {
        let nodes = vec![Node::new("a", "127.0.0.1:1", 1)];
        for _ in 0..10 {
            assert_eq!(RandomBalancer.pick(&nodes).unwrap().id, "a");
        }
    }
}
