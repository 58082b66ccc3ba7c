//! Node readiness
//!
//! A node's structural status says whether it can run: free nodes never
//! can, and every other node needs a live producer on each required input.
//! While execution results are recorded in the [`ExecutionOverlay`] they
//! take precedence over the structural status.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::DocumentState;
use crate::types::{GraphNode, NodeCategory, NodeId};

/// Readiness label shown for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Unconfigured,
    Configured,
    Running,
    Success,
    Failed,
}

/// Execution result recorded for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Running,
    Success,
    Failed,
}

impl From<ExecutionState> for NodeStatus {
    fn from(state: ExecutionState) -> Self {
        match state {
            ExecutionState::Running => Self::Running,
            ExecutionState::Success => Self::Success,
            ExecutionState::Failed => Self::Failed,
        }
    }
}

/// Execution states layered over structural status
#[derive(Debug, Clone, Default)]
pub struct ExecutionOverlay {
    states: HashMap<NodeId, ExecutionState>,
}

impl ExecutionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, node_id: impl Into<NodeId>, state: ExecutionState) {
        self.states.insert(node_id.into(), state);
    }

    pub fn get(&self, node_id: &str) -> Option<ExecutionState> {
        self.states.get(node_id).copied()
    }

    /// Drop the overlay for one node so its structural status shows again
    pub fn clear(&mut self, node_id: &str) -> Option<ExecutionState> {
        self.states.remove(node_id)
    }

    pub fn clear_all(&mut self) {
        self.states.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Structural status of a node: free nodes are never configured
pub fn structural_status(document: &DocumentState, node: &GraphNode) -> NodeStatus {
    if node.category() == NodeCategory::Free {
        return NodeStatus::Unconfigured;
    }
    let satisfied = node.schema.required_inputs().all(|port| {
        document
            .edge_into(&node.id, &port.name)
            .is_some_and(|edge| document.contains_node(&edge.source))
    });
    if satisfied {
        NodeStatus::Configured
    } else {
        NodeStatus::Unconfigured
    }
}

/// Derives statuses and tracks which ones changed since the last refresh
#[derive(Debug, Default)]
pub struct StatusComputer {
    overlay: ExecutionOverlay,
    last: HashMap<NodeId, NodeStatus>,
}

impl StatusComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlay(&self) -> &ExecutionOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut ExecutionOverlay {
        &mut self.overlay
    }

    /// Effective status of a node
    pub fn status(&self, document: &DocumentState, node: &GraphNode) -> NodeStatus {
        let structural = structural_status(document, node);
        if node.category() == NodeCategory::Free {
            return structural;
        }
        self.overlay.get(&node.id).map(NodeStatus::from).unwrap_or(structural)
    }

    /// Effective status of every node, in document order
    pub fn compute(&self, document: &DocumentState) -> Vec<(NodeId, NodeStatus)> {
        document
            .nodes
            .iter()
            .map(|node| (node.id.clone(), self.status(document, node)))
            .collect()
    }

    /// Recompute every status and return the ones that differ from the last refresh
    ///
    /// Nodes seen for the first time always count as changed. Deleted nodes
    /// are forgotten.
    pub fn refresh(&mut self, document: &DocumentState) -> Vec<(NodeId, NodeStatus)> {
        let current = self.compute(document);
        let mut changed = Vec::new();
        let mut next = HashMap::with_capacity(current.len());
        for (node_id, status) in current {
            if self.last.get(&node_id) != Some(&status) {
                changed.push((node_id.clone(), status));
            }
            next.insert(node_id, status);
        }
        self.overlay.states.retain(|id, _| next.contains_key(id));
        self.last = next;
        changed
    }
}
