//! Error types for the graph compiler

use thiserror::Error;

use crate::library::LibraryError;
use crate::registry::RegistryError;
use crate::topology::CycleDetected;

/// Result type alias using CompilerError
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Errors that can occur while editing, compiling, or propagating a document
#[derive(Debug, Error)]
pub enum CompilerError {
    /// No node with this id exists in the document
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node with this id already exists in the document
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// No edge with this id exists in the document
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// The node's schema does not declare this port
    #[error("Unknown port '{port}' on node '{node_id}'")]
    UnknownPort { node_id: String, port: String },

    /// The target port already has a producer
    #[error("Input '{port}' on node '{node_id}' is already connected")]
    PortAlreadyConnected { node_id: String, port: String },

    /// The document's ordinal counter has no ordinals left
    #[error("No ordinals left in this document")]
    OrdinalsExhausted,

    /// The algorithm id is not known to the registry
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The graph contains a cycle
    #[error(transparent)]
    Cycle(#[from] CycleDetected),

    /// Registration rejected a node kind
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Schema/library collaborator failed
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    /// A column transform rejected its inputs
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Document store collaborator failed
    #[error("Store error: {0}")]
    Store(String),

    /// Execution collaborator failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompilerError {
    /// Create a transform error with a message
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Create a store error with a message
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an execution error with a message
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub(crate) fn unknown_port(node_id: &str, port: &str) -> Self {
        Self::UnknownPort {
            node_id: node_id.to_string(),
            port: port.to_string(),
        }
    }
}
