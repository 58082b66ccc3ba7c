//! Graph Compiler - typed node graphs to sequential source text
//!
//! This crate turns a directed graph of typed nodes (a data pipeline drawn
//! as a node graph) into a linear, pandas-flavoured Python listing and keeps
//! per-node column metadata and readiness status current as the graph is
//! edited. It supports:
//!
//! - Dependency ordering with cycle detection
//! - Stable, identifier-safe variable names for every output port
//! - Flat string templates and structured call signatures
//! - Column schema propagation through registered transforms
//! - Readiness status derived from connectivity and execution results
//! - Compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! - `topology`: Kahn ordering plus the depth-first variant
//! - `binding` / `codegen` / `literal`: variable names and source text
//! - `propagation`: single-flight column propagation over a shared document
//! - `status` / `execution`: readiness labels and the execution overlay
//! - `session`: `PipelineSession` wiring edits to statuses, events, and code
//!
//! Hosts plug in through three collaborator traits: [`DocumentStore`],
//! [`ExecutionBackend`] and [`SchemaLibrary`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use graph_compiler::{CompilerConfig, DocumentState, PipelineSession, SchemaRegistry};
//!
//! let registry = Arc::new(SchemaRegistry::with_builtins());
//! let mut session = PipelineSession::new(DocumentState::new("demo"), registry, CompilerConfig::default())?;
//! let reader = session.add_node("csv-input").await?;
//! session.set_value(&reader, "filepath", "data/foo.csv".into()).await?;
//! println!("{}", session.generate_code().await);
//! ```

pub mod binding;
pub mod builder;
pub mod codegen;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod events;
pub mod execution;
pub mod library;
pub mod literal;
pub mod propagation;
pub mod registry;
pub mod session;
pub mod status;
pub mod store;
pub mod topology;
pub mod types;
pub mod undo;

// Re-export key types
pub use builder::DocumentBuilder;
pub use codegen::{CodeSynthesizer, SynthesisOptions};
pub use config::{CompilerConfig, ConfigError, CyclePolicy};
pub use document::{DocumentState, NodeRemoval, SchemaChange};
pub use error::{CompilerError, Result};
pub use events::{ChannelEventSink, CompilerEvent, EventError, EventSink, NullEventSink, VecEventSink};
pub use execution::{ExecutionBackend, ExecutionReport, ExecutionTracker};
pub use library::{HttpSchemaLibrary, LibraryError, SchemaLibrary, StaticSchemaLibrary};
pub use propagation::{PassOutcome, PassReport, SchemaPropagator};
pub use registry::{
    publish, BuiltinNode, ColumnTransform, NodeKind, NodeRegistration, RegistryError, SchemaRegistry,
};
pub use session::PipelineSession;
pub use status::{ExecutionOverlay, ExecutionState, NodeStatus, StatusComputer};
pub use store::{load_document, save_document, DocumentStore, MemoryDocumentStore};
pub use topology::{depth_first_order, topological_sort, CycleDetected};
pub use types::{
    CodeTemplate, Column, FetchDescriptor, FetchSource, GraphEdge, GraphNode, NodeCategory, NodeId,
    NodeMetadata, NodeSchema, OutputBinding, ParamRole, ParameterDefinition, PortColumns,
    PortDefinition, PropagationStatus, Values,
};

