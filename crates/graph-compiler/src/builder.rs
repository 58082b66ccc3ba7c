//! Fluent builder for pipeline documents
//!
//! Nodes receive ordinals and bindings exactly as `DocumentState::insert_node`
//! would hand them out. Edges are added as given, without port or fan-in
//! checks, so fixtures can describe graphs the editing API would refuse.

use crate::document::DocumentState;
use crate::types::{GraphEdge, NodeSchema};

/// Fluent builder for constructing documents programmatically
///
/// # Example
///
/// ```ignore
/// let doc = DocumentBuilder::new("My Pipeline")
///     .add_node("read", csv_input_schema)
///     .with_value("filepath", serde_json::json!("data/a.csv"))
///     .add_node("save", csv_output_schema)
///     .add_edge("read", "data", "save", "data")
///     .build();
/// ```
pub struct DocumentBuilder {
    document: DocumentState,
    edge_counter: usize,
}

impl DocumentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            document: DocumentState::new(name),
            edge_counter: 0,
        }
    }

    /// Use a fixed document id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.document.id = id.into();
        self
    }

    /// Add a node to the document
    ///
    /// A node id that is already taken is logged and ignored.
    pub fn add_node(mut self, id: impl Into<String>, schema: NodeSchema) -> Self {
        if let Err(e) = self.document.insert_node_with_id(id, schema) {
            log::warn!("DocumentBuilder skipped node: {}", e);
        }
        self
    }

    /// Set a value on the most recently added node
    ///
    /// Must be called immediately after `add_node`.
    pub fn with_value(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        if let Some(node) = self.document.nodes.last_mut() {
            node.values.insert(name.into(), value);
        }
        self
    }

    /// Add an edge between two nodes (auto-generates edge ID)
    pub fn add_edge(
        mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.edge_counter += 1;
        self.document.edges.push(GraphEdge {
            id: format!("edge-{}", self.edge_counter),
            source: source.into(),
            source_port: source_port.into(),
            target: target.into(),
            target_port: target_port.into(),
        });
        self
    }

    pub fn build(self) -> DocumentState {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeCategory, PortDefinition};
    use serde_json::json;

    #[test]
    fn test_builder_assigns_ordinals_and_values() {
        let schema = NodeSchema::call("f", NodeCategory::Transform, "f")
            .with_output(PortDefinition::optional("out", "frame"));
        let doc = DocumentBuilder::new("Pipeline")
            .with_id("doc-1")
            .add_node("a", schema.clone())
            .with_value("n", json!(1))
            .add_node("b", schema.clone())
            .add_node("a", schema)
            .add_edge("a", "out", "b", "in")
            .build();

        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].values["n"], json!(1));
        assert_eq!(doc.nodes[1].binding("out"), Some("n02_out"));
        assert_eq!(doc.edges[0].id, "edge-1");
        assert_eq!(doc.next_ordinal(), 3);
    }
}
