//! Dependency ordering of pipeline graphs
//!
//! Two traversals are provided. [`topological_sort`] uses Kahn's algorithm and
//! reports a cycle as an error. [`depth_first_order`] walks upstream in
//! post-order and silently skips back-edges, which always yields every node
//! but gives no guarantee about nodes caught in a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::types::{GraphEdge, GraphNode, NodeId};

/// The graph contains at least one cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cycle detected in graph; {} node(s) could not be ordered", unsorted.len())]
pub struct CycleDetected {
    /// Nodes that never reached in-degree zero, in original order
    pub unsorted: Vec<NodeId>,
}

/// Order nodes so every edge's source precedes its target
///
/// Ties are broken by original node order. Edges with an endpoint outside
/// `nodes` are ignored. No partial order is returned when a cycle exists.
pub fn topological_sort(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
) -> Result<Vec<NodeId>, CycleDetected> {
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let mut downstream: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in edges {
        if !in_degree.contains_key(edge.source.as_str()) {
            continue;
        }
        if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
            *deg += 1;
            downstream
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut order: Vec<NodeId> = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        if let Some(targets) = downstream.get(id) {
            for target in targets {
                if let Some(deg) = in_degree.get_mut(target) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let sorted: HashSet<&str> = order.iter().map(String::as_str).collect();
        let unsorted = nodes
            .iter()
            .filter(|n| !sorted.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect();
        return Err(CycleDetected { unsorted });
    }

    Ok(order)
}

/// Upstream-first post-order traversal
///
/// A node reached again while it is still being visited ends that branch
/// without error, so every node appears exactly once even in a cyclic graph.
pub fn depth_first_order(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<NodeId> {
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut upstream: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if known.contains(edge.source.as_str()) && known.contains(edge.target.as_str()) {
            upstream
                .entry(edge.target.as_str())
                .or_default()
                .push(edge.source.as_str());
        }
    }

    let mut walk = DepthFirst {
        upstream: &upstream,
        visiting: HashSet::new(),
        visited: HashSet::new(),
        order: Vec::with_capacity(nodes.len()),
    };
    for node in nodes {
        walk.visit(&node.id);
    }
    walk.order
}

struct DepthFirst<'a> {
    upstream: &'a HashMap<&'a str, Vec<&'a str>>,
    visiting: HashSet<&'a str>,
    visited: HashSet<&'a str>,
    order: Vec<NodeId>,
}

impl<'a> DepthFirst<'a> {
    fn visit(&mut self, id: &'a str) {
        if self.visited.contains(id) {
            return;
        }
        if self.visiting.contains(id) {
            log::debug!("Depth-first walk hit a back-edge at node '{}'", id);
            return;
        }
        self.visiting.insert(id);
        if let Some(sources) = self.upstream.get(id) {
            for source in sources.iter().copied() {
                self.visit(source);
            }
        }
        self.visiting.remove(id);
        self.visited.insert(id);
        self.order.push(id.to_string());
    }
}
