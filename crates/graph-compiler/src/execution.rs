//! Execution collaborator
//!
//! Running generated code is delegated to an [`ExecutionBackend`]. The
//! [`ExecutionTracker`] records the outcome in an [`ExecutionOverlay`]:
//! `running` while the backend works, then `success` or `failed`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::status::{ExecutionOverlay, ExecutionState};

/// Runs source text for a node and returns what it printed
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn run(&self, node_id: &str, source: &str) -> Result<String>;
}

/// Classify produced output by looking for the error marker
pub fn evaluate_output(output: &str, error_marker: &str) -> ExecutionState {
    if !error_marker.is_empty() && output.contains(error_marker) {
        ExecutionState::Failed
    } else {
        ExecutionState::Success
    }
}

/// Outcome of running one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub node_id: String,
    pub state: ExecutionState,
    /// Produced output, or the backend's error message
    pub output: String,
}

/// Drives the execution overlay around backend runs
#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    error_marker: String,
}

impl ExecutionTracker {
    pub fn new(error_marker: impl Into<String>) -> Self {
        Self {
            error_marker: error_marker.into(),
        }
    }

    /// Mark a node as running
    pub fn begin(&self, overlay: &mut ExecutionOverlay, node_id: &str) {
        overlay.set(node_id, ExecutionState::Running);
    }

    /// Run source on the backend; a backend error becomes a failed report
    pub async fn run(&self, backend: &dyn ExecutionBackend, node_id: &str, source: &str) -> ExecutionReport {
        match backend.run(node_id, source).await {
            Ok(output) => {
                let state = evaluate_output(&output, &self.error_marker);
                log::debug!("Node '{}' executed: {:?}", node_id, state);
                ExecutionReport {
                    node_id: node_id.to_string(),
                    state,
                    output,
                }
            }
            Err(e) => {
                log::warn!("Execution of node '{}' failed: {}", node_id, e);
                ExecutionReport {
                    node_id: node_id.to_string(),
                    state: ExecutionState::Failed,
                    output: e.to_string(),
                }
            }
        }
    }

    /// Record the final state of a run
    pub fn finish(&self, overlay: &mut ExecutionOverlay, report: &ExecutionReport) {
        overlay.set(report.node_id.clone(), report.state);
    }
}
