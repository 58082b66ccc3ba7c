//! Document state and graph mutations
//!
//! A [`DocumentState`] owns the ordered node and edge lists of one pipeline
//! together with the ordinal counter that seeds variable names. Every
//! mutation goes through a method here so the invariants hold: ordinals are
//! handed out once and never reused, each input port has at most one
//! producer, and no edge outlives either endpoint or the ports it names.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::binding::{bind_outputs, ensure_bindings};
use crate::constants::defaults;
use crate::error::{CompilerError, Result};
use crate::types::{EdgeId, GraphEdge, GraphNode, NodeId, NodeMetadata, NodeSchema, Values};

fn first_ordinal() -> u32 {
    defaults::FIRST_ORDINAL
}

/// A pipeline document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Next ordinal to hand out; only moves forward
    #[serde(default = "first_ordinal")]
    next_ordinal: u32,
}

/// What changed when a node's schema was replaced
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaChange {
    /// The output ports changed, so bindings were recomputed
    pub bindings_changed: bool,
    /// Edges dropped because their port no longer exists
    pub removed_edges: Vec<GraphEdge>,
}

/// Result of deleting a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRemoval {
    pub node: GraphNode,
    pub removed_edges: Vec<GraphEdge>,
    /// Downstream nodes that lost an input
    pub affected: Vec<NodeId>,
}

impl DocumentState {
    /// Create an empty document with a generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            next_ordinal: defaults::FIRST_ORDINAL,
        }
    }

    /// Ordinal the next inserted node will receive
    pub fn next_ordinal(&self) -> u32 {
        self.next_ordinal
    }

    /// Move the counter forward to at least `next`; never moves it back
    pub fn advance_ordinal_to(&mut self, next: u32) {
        self.next_ordinal = self.next_ordinal.max(next);
    }

    /// Take the next ordinal from the counter
    ///
    /// `u32::MAX` is never handed out; a counter that reached it is spent.
    pub fn allocate_ordinal(&mut self) -> Result<u32> {
        if self.next_ordinal == u32::MAX {
            return Err(CompilerError::OrdinalsExhausted);
        }
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        Ok(ordinal)
    }

    pub fn find_node(&self, node_id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn find_node_mut(&mut self, node_id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.find_node(node_id).is_some()
    }

    fn node_mut(&mut self, node_id: &str) -> Result<&mut GraphNode> {
        self.find_node_mut(node_id)
            .ok_or_else(|| CompilerError::NodeNotFound(node_id.to_string()))
    }

    fn node(&self, node_id: &str) -> Result<&GraphNode> {
        self.find_node(node_id)
            .ok_or_else(|| CompilerError::NodeNotFound(node_id.to_string()))
    }

    /// Edges ending at a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Edges starting at a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// The edge feeding an input port, if any
    pub fn edge_into(&self, node_id: &str, port: &str) -> Option<&GraphEdge> {
        self.edges
            .iter()
            .find(|e| e.target == node_id && e.target_port == port)
    }

    /// Insert a node with a generated id
    pub fn insert_node(&mut self, schema: NodeSchema) -> Result<NodeId> {
        let id = uuid::Uuid::new_v4().to_string();
        self.push_node(id.clone(), schema)?;
        Ok(id)
    }

    /// Insert a node with a caller-chosen id
    pub fn insert_node_with_id(&mut self, id: impl Into<NodeId>, schema: NodeSchema) -> Result<NodeId> {
        let id = id.into();
        if self.contains_node(&id) {
            return Err(CompilerError::DuplicateNode(id));
        }
        self.push_node(id.clone(), schema)?;
        Ok(id)
    }

    fn push_node(&mut self, id: NodeId, schema: NodeSchema) -> Result<()> {
        let ordinal = self.allocate_ordinal()?;
        let bindings = bind_outputs(ordinal, &schema.output_names());
        log::debug!("Inserted node '{}' ({}) as n{:02}", id, schema.id, ordinal);
        self.nodes.push(GraphNode {
            id,
            ordinal,
            schema,
            values: Values::new(),
            bindings,
            metadata: NodeMetadata::default(),
        });
        Ok(())
    }

    /// Set one parameter value
    pub fn set_value(&mut self, node_id: &str, name: &str, value: serde_json::Value) -> Result<()> {
        let node = self.node_mut(node_id)?;
        node.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Replace all parameter values of a node
    pub fn set_values(&mut self, node_id: &str, values: Values) -> Result<()> {
        self.node_mut(node_id)?.values = values;
        Ok(())
    }

    /// Replace a node's schema
    ///
    /// Keeps the ordinal, keeps values whose name the new schema still
    /// declares, resets propagated metadata, and drops edges on ports that
    /// disappeared.
    pub fn assign_schema(&mut self, node_id: &str, schema: NodeSchema) -> Result<SchemaChange> {
        let node = self.node_mut(node_id)?;
        let declared = |name: &str| schema.parameter(name).is_some() || schema.input_port(name).is_some();
        node.values.retain(|name, _| declared(name));
        node.schema = schema;
        node.metadata = NodeMetadata::default();
        let bindings_changed = ensure_bindings(node);

        let inputs: Vec<String> = node.schema.inputs.iter().map(|p| p.name.clone()).collect();
        let outputs: Vec<String> = node.schema.outputs.iter().map(|p| p.name.clone()).collect();

        let (removed_edges, kept): (Vec<GraphEdge>, Vec<GraphEdge>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| {
                (e.target == node_id && !inputs.contains(&e.target_port))
                    || (e.source == node_id && !outputs.contains(&e.source_port))
            });
        self.edges = kept;

        if !removed_edges.is_empty() {
            log::debug!(
                "Schema change on '{}' dropped {} edge(s)",
                node_id,
                removed_edges.len()
            );
        }
        Ok(SchemaChange {
            bindings_changed,
            removed_edges,
        })
    }

    /// Connect an output port to an input port
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<EdgeId> {
        let source_node = self.node(source)?;
        if source_node.schema.output_port(source_port).is_none() {
            return Err(CompilerError::unknown_port(source, source_port));
        }
        let target_node = self.node(target)?;
        if target_node.schema.input_port(target_port).is_none() {
            return Err(CompilerError::unknown_port(target, target_port));
        }
        if self.edge_into(target, target_port).is_some() {
            return Err(CompilerError::PortAlreadyConnected {
                node_id: target.to_string(),
                port: target_port.to_string(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.edges.push(GraphEdge {
            id: id.clone(),
            source: source.to_string(),
            source_port: source_port.to_string(),
            target: target.to_string(),
            target_port: target_port.to_string(),
        });
        log::debug!(
            "Connected {}.{} -> {}.{}",
            source,
            source_port,
            target,
            target_port
        );
        Ok(id)
    }

    /// Remove an edge by id
    pub fn disconnect(&mut self, edge_id: &str) -> Result<GraphEdge> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| CompilerError::EdgeNotFound(edge_id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    /// Delete a node and every edge touching it
    pub fn delete_node(&mut self, node_id: &str) -> Result<NodeRemoval> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| CompilerError::NodeNotFound(node_id.to_string()))?;
        let node = self.nodes.remove(index);

        let (removed_edges, kept): (Vec<GraphEdge>, Vec<GraphEdge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.source == node_id || e.target == node_id);
        self.edges = kept;

        let mut affected: Vec<NodeId> = Vec::new();
        for edge in &removed_edges {
            if edge.source == node_id && edge.target != node_id && !affected.contains(&edge.target) {
                affected.push(edge.target.clone());
            }
        }

        log::debug!(
            "Deleted node '{}' with {} edge(s); {} downstream node(s) affected",
            node_id,
            removed_edges.len(),
            affected.len()
        );
        Ok(NodeRemoval {
            node,
            removed_edges,
            affected,
        })
    }

    /// Bring a deserialized document back in line with its invariants
    ///
    /// The counter is moved past the highest ordinal in use. A node sharing
    /// its ordinal with an earlier node gets a fresh one, and nodes whose
    /// bindings don't match their output ports are rebound. Returns how many
    /// nodes were rebound.
    pub fn normalize(&mut self) -> Result<usize> {
        let past_highest = self
            .nodes
            .iter()
            .map(|n| n.ordinal.saturating_add(1))
            .max()
            .unwrap_or(0);
        self.advance_ordinal_to(past_highest);

        let mut seen = HashSet::new();
        let duplicates: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !seen.insert(node.ordinal))
            .map(|(index, _)| index)
            .collect();

        let mut rebound = 0;
        for index in duplicates {
            let ordinal = self.allocate_ordinal()?;
            let node = &mut self.nodes[index];
            log::warn!(
                "Node '{}' shared ordinal {}; renumbered to {}",
                node.id,
                node.ordinal,
                ordinal
            );
            node.ordinal = ordinal;
            node.bindings = bind_outputs(ordinal, &node.schema.output_names());
            rebound += 1;
        }

        for node in &mut self.nodes {
            if ensure_bindings(node) {
                rebound += 1;
            }
        }
        Ok(rebound)
    }

    /// Hash of everything that should trigger a propagation pass
    ///
    /// Covers edges, node ids, algorithm ids and values. Propagated metadata
    /// is left out: writing it back must not retrigger a pass.
    pub fn propagation_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for node in &self.nodes {
            node.id.hash(&mut hasher);
            node.schema.id.hash(&mut hasher);
            for (name, value) in &node.values {
                name.hash(&mut hasher);
                value.to_string().hash(&mut hasher);
            }
        }
        for edge in &self.edges {
            edge.source.hash(&mut hasher);
            edge.source_port.hash(&mut hasher);
            edge.target.hash(&mut hasher);
            edge.target_port.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, NodeCategory, ParameterDefinition, PortDefinition, PropagationStatus};
    use serde_json::json;

    fn producer() -> NodeSchema {
        NodeSchema::call("producer", NodeCategory::Source, "make")
            .with_output(PortDefinition::optional("out", "frame"))
    }

    fn consumer() -> NodeSchema {
        NodeSchema::call("consumer", NodeCategory::Transform, "use")
            .with_input(PortDefinition::required("in", "frame"))
            .with_output(PortDefinition::optional("out", "frame"))
            .with_parameter(ParameterDefinition::plain("n", "int", json!(5)))
    }

    #[test]
    fn test_ordinals_never_rewind() {
        let mut doc = DocumentState::new("doc");
        let a = doc.insert_node(producer()).unwrap();
        let b = doc.insert_node(producer()).unwrap();
        assert_eq!(doc.find_node(&a).unwrap().ordinal, 1);
        assert_eq!(doc.find_node(&b).unwrap().ordinal, 2);

        doc.delete_node(&b).unwrap();
        let c = doc.insert_node(producer()).unwrap();
        assert_eq!(doc.find_node(&c).unwrap().ordinal, 3);
        assert_eq!(doc.find_node(&c).unwrap().binding("out"), Some("n03_out"));
        assert_eq!(doc.next_ordinal(), 4);
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        let err = doc.insert_node_with_id("a", producer()).unwrap_err();
        assert!(matches!(err, CompilerError::DuplicateNode(id) if id == "a"));
    }

    #[test]
    fn test_connect_validates_ports() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        doc.insert_node_with_id("b", consumer()).unwrap();

        assert!(matches!(
            doc.connect("a", "nope", "b", "in"),
            Err(CompilerError::UnknownPort { .. })
        ));
        assert!(matches!(
            doc.connect("a", "out", "b", "nope"),
            Err(CompilerError::UnknownPort { .. })
        ));
        assert!(matches!(
            doc.connect("ghost", "out", "b", "in"),
            Err(CompilerError::NodeNotFound(_))
        ));

        doc.connect("a", "out", "b", "in").unwrap();
        assert_eq!(doc.edges.len(), 1);
    }

    #[test]
    fn test_second_producer_rejected() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        doc.insert_node_with_id("a2", producer()).unwrap();
        doc.insert_node_with_id("b", consumer()).unwrap();
        doc.connect("a", "out", "b", "in").unwrap();

        let err = doc.connect("a2", "out", "b", "in").unwrap_err();
        assert!(matches!(err, CompilerError::PortAlreadyConnected { .. }));
        assert_eq!(doc.edges.len(), 1);
    }

    #[test]
    fn test_disconnect() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        doc.insert_node_with_id("b", consumer()).unwrap();
        let edge = doc.connect("a", "out", "b", "in").unwrap();

        let removed = doc.disconnect(&edge).unwrap();
        assert_eq!(removed.target, "b");
        assert!(doc.edges.is_empty());
        assert!(matches!(doc.disconnect(&edge), Err(CompilerError::EdgeNotFound(_))));
    }

    #[test]
    fn test_delete_cascades_edges() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        doc.insert_node_with_id("b", consumer()).unwrap();
        doc.insert_node_with_id("c", consumer()).unwrap();
        doc.connect("a", "out", "b", "in").unwrap();
        doc.connect("b", "out", "c", "in").unwrap();

        let removal = doc.delete_node("a").unwrap();
        assert_eq!(removal.node.id, "a");
        assert_eq!(removal.removed_edges.len(), 1);
        assert_eq!(removal.affected, vec!["b"]);
        assert_eq!(doc.edges.len(), 1);
        assert!(doc.incoming_edges("b").next().is_none());
    }

    #[test]
    fn test_assign_schema_drops_vanished_ports() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        doc.insert_node_with_id("b", consumer()).unwrap();
        doc.insert_node_with_id("c", consumer()).unwrap();
        doc.connect("a", "out", "b", "in").unwrap();
        doc.connect("b", "out", "c", "in").unwrap();
        doc.set_value("b", "n", json!(3)).unwrap();
        doc.set_value("b", "stale", json!(1)).unwrap();
        doc.find_node_mut("b").unwrap().metadata.status = PropagationStatus::Ready;

        let replacement = NodeSchema::call("sink", NodeCategory::Sink, "save")
            .with_input(PortDefinition::required("in", "frame"))
            .with_parameter(ParameterDefinition::plain("n", "int", json!(0)));
        let change = doc.assign_schema("b", replacement).unwrap();

        assert!(change.bindings_changed);
        assert_eq!(change.removed_edges.len(), 1);
        assert_eq!(change.removed_edges[0].target, "c");
        let node = doc.find_node("b").unwrap();
        assert_eq!(node.ordinal, 2);
        assert!(node.bindings.is_empty());
        assert_eq!(node.values.get("n"), Some(&json!(3)));
        assert!(node.values.get("stale").is_none());
        assert_eq!(node.metadata.status, PropagationStatus::Pending);
        assert!(doc.edge_into("b", "in").is_some());
    }

    #[test]
    fn test_assign_same_outputs_keeps_bindings() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", consumer()).unwrap();
        let change = doc
            .assign_schema("a", consumer().with_label("Renamed"))
            .unwrap();
        assert!(!change.bindings_changed);
        assert_eq!(doc.find_node("a").unwrap().binding("out"), Some("n01_out"));
    }

    #[test]
    fn test_fingerprint_ignores_metadata() {
        let mut doc = DocumentState::new("doc");
        doc.insert_node_with_id("a", producer()).unwrap();
        doc.insert_node_with_id("b", consumer()).unwrap();
        let before = doc.propagation_fingerprint();

        doc.find_node_mut("a")
            .unwrap()
            .metadata
            .output_columns
            .insert("out".to_string(), vec![Column::new("x", "int")]);
        assert_eq!(doc.propagation_fingerprint(), before);

        doc.set_value("b", "n", json!(9)).unwrap();
        let after_value = doc.propagation_fingerprint();
        assert_ne!(after_value, before);

        doc.connect("a", "out", "b", "in").unwrap();
        assert_ne!(doc.propagation_fingerprint(), after_value);
    }

    #[test]
    fn test_normalize_repairs_hand_written_documents() {
        let mut doc: DocumentState = serde_json::from_value(json!({
            "id": "d",
            "name": "doc",
            "nodes": [{
                "id": "a",
                "ordinal": 7,
                "schema": {
                    "id": "producer",
                    "category": "source",
                    "outputs": [{"name": "out"}],
                    "template": {"mode": "call", "function": "make"}
                }
            }]
        }))
        .unwrap();
        assert_eq!(doc.next_ordinal(), 1);

        assert_eq!(doc.normalize().unwrap(), 1);
        assert_eq!(doc.find_node("a").unwrap().binding("out"), Some("n07_out"));
        assert_eq!(doc.next_ordinal(), 8);
        assert_eq!(doc.normalize().unwrap(), 0);
    }

    fn hand_written(ordinals: &[u64]) -> DocumentState {
        let nodes: Vec<_> = ordinals
            .iter()
            .enumerate()
            .map(|(i, ordinal)| {
                json!({
                    "id": format!("node-{}", i),
                    "ordinal": ordinal,
                    "schema": {
                        "id": "producer",
                        "category": "source",
                        "outputs": [{"name": "out"}],
                        "template": {"mode": "call", "function": "make"}
                    }
                })
            })
            .collect();
        serde_json::from_value(json!({"id": "d", "name": "doc", "nodes": nodes})).unwrap()
    }

    #[test]
    fn test_normalize_renumbers_shared_ordinals() {
        let mut doc = hand_written(&[1, 1, 2]);
        assert_eq!(doc.normalize().unwrap(), 3);

        let bindings: Vec<_> = doc.nodes.iter().map(|n| n.binding("out").unwrap()).collect();
        assert_eq!(bindings, vec!["n01_out", "n03_out", "n02_out"]);
        assert_eq!(doc.next_ordinal(), 4);
    }

    #[test]
    fn test_spent_counter_rejects_inserts() {
        let mut doc = hand_written(&[u32::MAX as u64]);
        assert_eq!(doc.normalize().unwrap(), 1);
        assert_eq!(doc.next_ordinal(), u32::MAX);
        assert!(matches!(
            doc.insert_node(producer()),
            Err(CompilerError::OrdinalsExhausted)
        ));
        assert_eq!(doc.nodes.len(), 1);

        let mut doc = hand_written(&[u32::MAX as u64, u32::MAX as u64]);
        assert!(matches!(doc.normalize(), Err(CompilerError::OrdinalsExhausted)));
    }

    #[test]
    fn test_serde_keeps_counter() {
        let mut doc = DocumentState::with_id("d1", "doc");
        doc.insert_node(producer()).unwrap();
        doc.insert_node(producer()).unwrap();

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["nextOrdinal"], 3);

        let restored: DocumentState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, doc);
    }
}
