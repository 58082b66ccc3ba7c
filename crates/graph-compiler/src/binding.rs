//! Output variable naming
//!
//! Every output port of a node is bound to a variable named
//! `n{ordinal:02}_{port}`. Bindings are persisted on the node and only
//! recomputed when its output port list changes, so generated code that
//! already references a name keeps working across edits.

use std::collections::{HashMap, HashSet};

use crate::constants::names;
use crate::document::DocumentState;
use crate::types::{GraphNode, OutputBinding};

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize_port_name(port: &str) -> String {
    port.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Variable name for one output port of the node with this ordinal
pub fn variable_name(ordinal: u32, port: &str) -> String {
    format!("n{:02}_{}", ordinal, sanitize_port_name(port))
}

/// Temporary name a structured call captures its result into
pub fn capture_name(ordinal: u32) -> String {
    format!("n{:02}_{}", ordinal, names::CAPTURE_SUFFIX)
}

/// Bind every port, suffixing names that would collide after sanitization
pub fn bind_outputs<S: AsRef<str>>(ordinal: u32, ports: &[S]) -> Vec<OutputBinding> {
    let mut used: HashSet<String> = HashSet::new();
    ports
        .iter()
        .map(|port| {
            let port = port.as_ref();
            let base = variable_name(ordinal, port);
            let mut variable = base.clone();
            let mut suffix = 2;
            while used.contains(&variable) {
                variable = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            used.insert(variable.clone());
            OutputBinding {
                port: port.to_string(),
                variable,
            }
        })
        .collect()
}

/// Recompute bindings if the node's output ports changed
///
/// Returns `true` when the bindings were rewritten.
pub fn ensure_bindings(node: &mut GraphNode) -> bool {
    let ports = node.schema.output_names();
    let current: Vec<&str> = node.bindings.iter().map(|b| b.port.as_str()).collect();
    if current == ports {
        return false;
    }
    let bindings = bind_outputs(node.ordinal, &ports);
    log::debug!(
        "Rebinding outputs of node '{}' ({} port(s))",
        node.id,
        bindings.len()
    );
    node.bindings = bindings;
    true
}

/// Variable bound to an output port of a node in the document
pub fn resolve<'a>(document: &'a DocumentState, node_id: &str, port: &str) -> Option<&'a str> {
    document.find_node(node_id).and_then(|node| node.binding(port))
}

/// Upstream variable feeding each connected input port of a node
///
/// Edges whose source node or binding no longer exists are left out, which
/// makes the port behave as unconnected.
pub fn upstream_variables(document: &DocumentState, node_id: &str) -> HashMap<String, String> {
    document
        .incoming_edges(node_id)
        .filter_map(|edge| {
            resolve(document, &edge.source, &edge.source_port)
                .map(|variable| (edge.target_port.clone(), variable.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DocumentBuilder;
    use crate::types::{NodeCategory, NodeSchema, PortDefinition};

    #[test]
    fn test_sanitize_port_name() {
        assert_eq!(sanitize_port_name("out"), "out");
        assert_eq!(sanitize_port_name("my port-1"), "my_port_1");
        assert_eq!(sanitize_port_name("x.y/z"), "x_y_z");
        assert_eq!(sanitize_port_name("café"), "caf_");
    }

    #[test]
    fn test_variable_name_is_stable() {
        assert_eq!(variable_name(3, "data"), "n03_data");
        assert_eq!(variable_name(3, "data"), variable_name(3, "data"));
        assert_eq!(variable_name(120, "a b"), "n120_a_b");
    }

    #[test]
    fn test_capture_name() {
        assert_eq!(capture_name(7), "n07_result");
    }

    #[test]
    fn test_colliding_ports_get_suffixes() {
        let bindings = bind_outputs(1, &["a-b", "a_b", "a.b"]);
        let names: Vec<&str> = bindings.iter().map(|b| b.variable.as_str()).collect();
        assert_eq!(names, vec!["n01_a_b", "n01_a_b_2", "n01_a_b_3"]);
        assert_eq!(bindings[1].port, "a_b");
    }

    #[test]
    fn test_ensure_bindings_only_on_port_change() {
        let schema = NodeSchema::call("f", NodeCategory::Transform, "f")
            .with_output(PortDefinition::optional("out", "frame"));
        let mut doc = DocumentBuilder::new("b").add_node("a", schema).build();
        let node = doc.find_node_mut("a").unwrap();

        assert!(!ensure_bindings(node));
        assert_eq!(node.binding("out"), Some("n01_out"));

        node.schema.outputs.push(PortDefinition::optional("extra", "frame"));
        assert!(ensure_bindings(node));
        assert_eq!(node.binding("extra"), Some("n01_extra"));
        assert_eq!(node.binding("out"), Some("n01_out"));
        assert!(!ensure_bindings(node));
    }

    #[test]
    fn test_upstream_variables() {
        let producer = NodeSchema::call("p", NodeCategory::Source, "p")
            .with_output(PortDefinition::optional("out", "frame"));
        let consumer = NodeSchema::call("c", NodeCategory::Sink, "c")
            .with_input(PortDefinition::required("in", "frame"));
        let doc = DocumentBuilder::new("u")
            .add_node("a", producer)
            .add_node("b", consumer)
            .add_edge("a", "out", "b", "in")
            .build();

        let upstream = upstream_variables(&doc, "b");
        assert_eq!(upstream.get("in").map(String::as_str), Some("n01_out"));
        assert!(upstream_variables(&doc, "a").is_empty());
        assert_eq!(resolve(&doc, "a", "missing"), None);
    }
}
