//! Events emitted while editing, propagating, and compiling a document
//!
//! Hosts subscribe through an [`EventSink`] to keep their view of node
//! status, column metadata, and generated code current.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::status::NodeStatus;
use crate::types::{NodeId, NodeMetadata};

/// Receives compiler events
///
/// Delivery is fire-and-forget from the compiler's side: a failed send is
/// logged and the operation that produced the event carries on.
pub trait EventSink: Send + Sync {
    fn send(&self, event: CompilerEvent) -> Result<(), EventError>;
}

/// An event could not be delivered
#[derive(Debug, Clone, thiserror::Error)]
#[error("event not delivered: {reason}")]
pub struct EventError {
    pub reason: String,
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            reason: "receiver dropped".to_string(),
        }
    }
}

/// Events emitted by a pipeline session or propagator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompilerEvent {
    /// A node's readiness label changed
    #[serde(rename_all = "camelCase")]
    NodeStatusChanged {
        document_id: String,
        node_id: NodeId,
        status: NodeStatus,
    },

    /// Propagation wrote new column metadata for a node
    #[serde(rename_all = "camelCase")]
    ColumnsUpdated {
        document_id: String,
        node_id: NodeId,
        metadata: NodeMetadata,
    },

    /// A propagation trigger did not start a pass
    #[serde(rename_all = "camelCase")]
    PropagationSkipped { document_id: String, reason: String },

    /// A propagation pass finished
    #[serde(rename_all = "camelCase")]
    PropagationCompleted {
        document_id: String,
        updated: usize,
        errors: usize,
    },

    /// The graph has a cycle; nothing was generated or propagated
    #[serde(rename_all = "camelCase")]
    CycleDetected {
        document_id: String,
        unsorted: Vec<NodeId>,
    },

    /// Source text was generated for a node or (with no node id) the whole document
    #[serde(rename_all = "camelCase")]
    CodeGenerated {
        document_id: String,
        node_id: Option<NodeId>,
        code: String,
    },
}

impl CompilerEvent {
    pub fn status_changed(document_id: &str, node_id: &str, status: NodeStatus) -> Self {
        Self::NodeStatusChanged {
            document_id: document_id.to_string(),
            node_id: node_id.to_string(),
            status,
        }
    }

    pub fn propagation_skipped(document_id: &str, reason: impl Into<String>) -> Self {
        Self::PropagationSkipped {
            document_id: document_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Send an event, logging delivery failures instead of propagating them
pub(crate) fn emit(sink: &dyn EventSink, event: CompilerEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropped compiler event: {}", e);
    }
}

/// Discards every event
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: CompilerEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<CompilerEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far
    pub fn events(&self) -> Vec<CompilerEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: CompilerEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Forwards events to a tokio channel for a host task to consume
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<CompilerEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CompilerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: CompilerEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}
