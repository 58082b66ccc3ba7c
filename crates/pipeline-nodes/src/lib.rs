//! Pipeline Nodes
//!
//! Built-in node kinds for the pipeline graph compiler. Each node pairs a
//! schema (ports, parameters, code template) with the capability that
//! derives its output columns, and registers itself at link time.
//!
//! # Categories
//!
//! - **Input**: Source nodes that read a file or an in-memory dataframe
//! - **Processing**: Transform nodes that reshape, filter, or combine frames
//! - **Output**: Sink nodes that write results
//! - **Unassigned**: The placeholder for a node with no algorithm yet

pub mod columns;
pub mod input;
pub mod output;
pub mod processing;
pub mod unassigned;

use graph_compiler::SchemaRegistry;

// Re-export all nodes for convenience
pub use input::*;
pub use output::*;
pub use processing::*;
pub use unassigned::Unassigned;

/// Registry holding every built-in node kind
pub fn builtin_registry() -> SchemaRegistry {
    SchemaRegistry::with_builtins()
}
