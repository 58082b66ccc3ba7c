//! Source synthesis
//!
//! Turns one node (its schema, its values, and the variables bound upstream
//! of its connected inputs) into source text, and concatenates every node in
//! dependency order into a full listing.
//!
//! Flat templates are filled by literal `{name}` replacement. Structured
//! calls render as `target = function(arg=value, ...)`, followed by an
//! optional guarded preview of the result.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::binding::{capture_name, upstream_variables};
use crate::constants::{defaults, diagnostics};
use crate::document::DocumentState;
use crate::error::{CompilerError, Result};
use crate::literal::{format_parameter, is_identifier};
use crate::topology::{topological_sort, CycleDetected};
use crate::types::{CodeTemplate, GraphNode, ParamRole};

/// Settings that shape generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Directory `filepath` parameters are resolved against
    pub root_dir: Option<String>,
    /// Lines emitted once at the top of a full listing
    pub header: Vec<String>,
    /// Emit a guarded preview after each structured call
    pub emit_preview: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            root_dir: None,
            header: defaults::HEADER.iter().map(|s| s.to_string()).collect(),
            emit_preview: true,
        }
    }
}

/// Generates source text for nodes and documents
#[derive(Debug, Clone, Default)]
pub struct CodeSynthesizer {
    options: SynthesisOptions,
}

impl CodeSynthesizer {
    pub fn new(options: SynthesisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Resolve every parameter of a node, in schema order
    pub fn resolved_parameters(
        node: &GraphNode,
        upstream: &HashMap<String, String>,
    ) -> Vec<(String, Value)> {
        node.schema
            .parameters
            .iter()
            .map(|p| (p.name.clone(), resolve_value(node, &p.name, upstream)))
            .collect()
    }

    /// Source text for one node
    ///
    /// `upstream` maps each connected input port to the variable bound to
    /// the output feeding it.
    pub fn synthesize(&self, node: &GraphNode, upstream: &HashMap<String, String>) -> String {
        match &node.schema.template {
            CodeTemplate::Flat { template } => self.fill_template(node, template, upstream),
            CodeTemplate::Call { function } => self.render_call(node, function, upstream),
        }
    }

    /// Source text for one node of a document
    pub fn node_code(&self, document: &DocumentState, node_id: &str) -> Result<String> {
        let node = document
            .find_node(node_id)
            .ok_or_else(|| CompilerError::NodeNotFound(node_id.to_string()))?;
        let upstream = upstream_variables(document, node_id);
        Ok(self.synthesize(node, &upstream))
    }

    /// Full listing, or the cycle that prevented it
    pub fn try_generate_document(&self, document: &DocumentState) -> std::result::Result<String, CycleDetected> {
        let order = topological_sort(&document.nodes, &document.edges)?;

        let mut parts: Vec<String> = Vec::with_capacity(order.len() + 1);
        if !self.options.header.is_empty() {
            parts.push(self.options.header.join("\n"));
        }
        for node_id in &order {
            let Some(node) = document.find_node(node_id) else {
                continue;
            };
            let upstream = upstream_variables(document, node_id);
            let text = self.synthesize(node, &upstream);
            if !text.trim().is_empty() {
                parts.push(text);
            }
        }

        if parts.is_empty() {
            return Ok(String::new());
        }
        let mut listing = parts.join("\n\n");
        listing.push('\n');
        Ok(listing)
    }

    /// Full listing; a cyclic graph yields only the cycle diagnostic
    pub fn generate_document(&self, document: &DocumentState) -> String {
        match self.try_generate_document(document) {
            Ok(listing) => listing,
            Err(cycle) => {
                log::warn!(
                    "No code generated for document '{}': {}",
                    document.id,
                    cycle
                );
                diagnostics::CYCLE.to_string()
            }
        }
    }

    fn format(&self, name: &str, value: &Value) -> String {
        format_parameter(name, value, self.options.root_dir.as_deref())
    }

    fn fill_template(&self, node: &GraphNode, template: &str, upstream: &HashMap<String, String>) -> String {
        let mut text = template.to_string();
        let mut covered: HashSet<&str> = HashSet::new();

        for parameter in &node.schema.parameters {
            let value = resolve_value(node, &parameter.name, upstream);
            text = text.replace(&placeholder(&parameter.name), &self.format(&parameter.name, &value));
            covered.insert(parameter.name.as_str());
        }

        let ports = node.schema.inputs.iter().chain(node.schema.outputs.iter());
        for port in ports {
            if !covered.insert(port.name.as_str()) {
                continue;
            }
            let value = resolve_value(node, &port.name, upstream);
            text = text.replace(&placeholder(&port.name), &self.format(&port.name, &value));
        }

        text.trim_end().to_string()
    }

    fn render_call(&self, node: &GraphNode, function: &str, upstream: &HashMap<String, String>) -> String {
        let mut args: Vec<String> = Vec::new();
        let mut emitted: HashSet<&str> = HashSet::new();

        for port in &node.schema.inputs {
            let value = resolve_value(node, &port.name, upstream);
            args.push(format!("{}={}", port.name, self.format(&port.name, &value)));
            emitted.insert(port.name.as_str());
        }
        for parameter in &node.schema.parameters {
            if parameter.role == ParamRole::Output || !emitted.insert(parameter.name.as_str()) {
                continue;
            }
            let value = resolve_value(node, &parameter.name, upstream);
            args.push(format!("{}={}", parameter.name, self.format(&parameter.name, &value)));
        }

        let call = format!("{}({})", function, args.join(", "));
        let mut lines: Vec<String> = Vec::new();

        let target = match node.bindings.as_slice() {
            [only] if is_identifier(&only.variable) => {
                lines.push(format!("{} = {}", only.variable, call));
                only.variable.clone()
            }
            bindings => {
                let capture = capture_name(node.ordinal);
                lines.push(format!("{} = {}", capture, call));
                for binding in bindings {
                    lines.push(format!("{} = {}", binding.variable, capture));
                }
                capture
            }
        };

        if self.options.emit_preview && !node.bindings.is_empty() {
            lines.push(preview(&target));
        }
        lines.join("\n")
    }
}

fn placeholder(name: &str) -> String {
    format!("{{{}}}", name)
}

fn preview(target: &str) -> String {
    [
        "try:".to_string(),
        format!("    print({}.head())", target),
        "except Exception:".to_string(),
        "    try:".to_string(),
        format!("        print({})", target),
        "    except Exception:".to_string(),
        "        pass".to_string(),
    ]
    .join("\n")
}

/// Value a parameter or port name resolves to for this node
///
/// Connected inputs take the upstream variable. An unconnected required
/// input is always null; an unconnected optional one takes the node's own
/// value, then the parameter default.
/// Outputs take the node's own binding.
fn resolve_value(node: &GraphNode, name: &str, upstream: &HashMap<String, String>) -> Value {
    let schema = &node.schema;
    let parameter = schema.parameter(name);

    let role = match parameter {
        Some(p) => p.role,
        None if schema.input_port(name).is_some() => ParamRole::Input,
        None if schema.output_port(name).is_some() => ParamRole::Output,
        None => ParamRole::Plain,
    };

    match role {
        ParamRole::Input => {
            if let Some(variable) = upstream.get(name) {
                return Value::String(variable.clone());
            }
            if schema.input_port(name).is_some_and(|p| p.required) {
                return Value::Null;
            }
            match node.value(name) {
                Some(value) => value.clone(),
                None => parameter.map(|p| p.default.clone()).unwrap_or(Value::Null),
            }
        }
        ParamRole::Output => node
            .binding(name)
            .map(|variable| Value::String(variable.to_string()))
            .unwrap_or(Value::Null),
        ParamRole::Plain => node.value_or_default(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DocumentBuilder;
    use crate::types::{NodeCategory, NodeSchema, ParameterDefinition, PortDefinition};
    use serde_json::json;

    const PREVIEW_A: &str = "try:\n    print(n01_out.head())\nexcept Exception:\n    try:\n        print(n01_out)\n    except Exception:\n        pass";

    fn no_preview() -> CodeSynthesizer {
        CodeSynthesizer::new(SynthesisOptions {
            emit_preview: false,
            ..SynthesisOptions::default()
        })
    }

    fn producer() -> NodeSchema {
        NodeSchema::call("make", NodeCategory::Source, "make_frame")
            .with_output(PortDefinition::optional("out", "frame"))
    }

    fn consumer() -> NodeSchema {
        NodeSchema::call("show", NodeCategory::Sink, "show")
            .with_input(PortDefinition::required("in", "frame"))
    }

    #[test]
    fn test_upstream_reference_is_unquoted() {
        let doc = DocumentBuilder::new("s1")
            .add_node("A", producer())
            .add_node("B", consumer())
            .add_edge("A", "out", "B", "in")
            .build();

        let synth = CodeSynthesizer::default();
        assert_eq!(synth.node_code(&doc, "B").unwrap(), "n02_result = show(in=n01_out)");

        let listing = synth.generate_document(&doc);
        let expected = format!(
            "import pandas as pd\n\nn01_out = make_frame()\n{}\n\nn02_result = show(in=n01_out)\n",
            PREVIEW_A
        );
        assert_eq!(listing, expected);
    }

    #[test]
    fn test_required_unconnected_input_is_none() {
        let doc = DocumentBuilder::new("d").add_node("B", consumer()).build();
        assert_eq!(no_preview().node_code(&doc, "B").unwrap(), "n01_result = show(in=None)");
    }

    #[test]
    fn test_required_unconnected_input_ignores_stored_value() {
        let doc = DocumentBuilder::new("d")
            .add_node("B", consumer())
            .with_value("in", json!("n09_stale"))
            .build();
        assert_eq!(no_preview().node_code(&doc, "B").unwrap(), "n01_result = show(in=None)");
    }

    #[test]
    fn test_unconnected_input_uses_own_value_then_default() {
        let schema = NodeSchema::call("join", NodeCategory::Transform, "join")
            .with_input(PortDefinition::optional("right", "frame"))
            .with_output(PortDefinition::optional("out", "frame"))
            .with_parameter(ParameterDefinition {
                default: json!("fallback"),
                ..ParameterDefinition::input("right")
            });
        let doc = DocumentBuilder::new("d").add_node("J", schema.clone()).build();
        assert_eq!(
            no_preview().node_code(&doc, "J").unwrap(),
            "n01_out = join(right=fallback)"
        );

        let doc = DocumentBuilder::new("d")
            .add_node("J", schema)
            .with_value("right", json!("other frame"))
            .build();
        assert_eq!(
            no_preview().node_code(&doc, "J").unwrap(),
            "n01_out = join(right='other frame')"
        );
    }

    #[test]
    fn test_call_arguments_order_inputs_first() {
        let schema = NodeSchema::call("merge", NodeCategory::Transform, "pd.merge")
            .with_parameter(ParameterDefinition::plain("how", "str", json!("inner")))
            .with_parameter(ParameterDefinition::output("out"))
            .with_parameter(ParameterDefinition::input("left"))
            .with_input(PortDefinition::required("left", "frame"))
            .with_input(PortDefinition::required("right", "frame"))
            .with_output(PortDefinition::optional("out", "frame"));
        let doc = DocumentBuilder::new("d")
            .add_node("A", producer())
            .add_node("M", schema)
            .with_value("how", json!("left outer"))
            .add_edge("A", "out", "M", "left")
            .build();

        assert_eq!(
            no_preview().node_code(&doc, "M").unwrap(),
            "n02_out = pd.merge(left=n01_out, right=None, how='left outer')"
        );
    }

    #[test]
    fn test_multiple_outputs_capture_and_alias() {
        let schema = NodeSchema::call("split", NodeCategory::Transform, "split")
            .with_output(PortDefinition::optional("train", "frame"))
            .with_output(PortDefinition::optional("test", "frame"))
            .with_parameter(ParameterDefinition::plain("ratio", "float", json!(0.8)));
        let doc = DocumentBuilder::new("d")
            .add_node("x", producer())
            .add_node("S", schema)
            .build();

        let code = CodeSynthesizer::default().node_code(&doc, "S").unwrap();
        let mut lines = code.lines();
        assert_eq!(lines.next(), Some("n02_result = split(ratio=0.8)"));
        assert_eq!(lines.next(), Some("n02_train = n02_result"));
        assert_eq!(lines.next(), Some("n02_test = n02_result"));
        assert_eq!(lines.next(), Some("try:"));
        assert_eq!(lines.next(), Some("    print(n02_result.head())"));
    }

    #[test]
    fn test_preview_follows_single_output() {
        let doc = DocumentBuilder::new("d").add_node("A", producer()).build();
        let code = CodeSynthesizer::default().node_code(&doc, "A").unwrap();
        assert_eq!(code, format!("n01_out = make_frame()\n{}", PREVIEW_A));
        assert_eq!(no_preview().node_code(&doc, "A").unwrap(), "n01_out = make_frame()");
    }

    #[test]
    fn test_flat_template_substitution() {
        let schema = NodeSchema::flat(
            "read",
            NodeCategory::Source,
            "{data} = pd.read_csv({filepath}, sep={sep}, index_col={index_column})\n",
        )
        .with_output(PortDefinition::optional("data", "frame"))
        .with_parameter(ParameterDefinition::plain("filepath", "path", json!("")))
        .with_parameter(ParameterDefinition::plain("sep", "str", json!(",")))
        .with_parameter(ParameterDefinition::plain("index_column", "str", json!(null)));
        let doc = DocumentBuilder::new("d")
            .add_node("R", schema)
            .with_value("filepath", json!("data\\iris.csv"))
            .build();

        let synth = CodeSynthesizer::new(SynthesisOptions {
            root_dir: Some("/srv".to_string()),
            ..SynthesisOptions::default()
        });
        assert_eq!(
            synth.node_code(&doc, "R").unwrap(),
            "n01_data = pd.read_csv('/srv/dataset/data/iris.csv', sep=',', index_col=None)"
        );
    }

    #[test]
    fn test_flat_template_ports_without_parameters() {
        let schema = NodeSchema::flat("copy", NodeCategory::Transform, "{result} = {data}.copy()")
            .with_input(PortDefinition::required("data", "frame"))
            .with_output(PortDefinition::optional("result", "frame"));
        let doc = DocumentBuilder::new("d")
            .add_node("A", producer())
            .add_node("C", schema)
            .add_edge("A", "out", "C", "data")
            .build();

        assert_eq!(
            CodeSynthesizer::default().node_code(&doc, "C").unwrap(),
            "n02_result = n01_out.copy()"
        );
    }

    #[test]
    fn test_cycle_yields_single_diagnostic() {
        let schema = NodeSchema::call("loop", NodeCategory::Transform, "f")
            .with_input(PortDefinition::required("in", "frame"))
            .with_output(PortDefinition::optional("out", "frame"));
        let doc = DocumentBuilder::new("d")
            .add_node("ok", producer())
            .add_node("A", schema)
            .add_edge("A", "out", "A", "in")
            .build();

        let synth = CodeSynthesizer::default();
        assert!(synth.try_generate_document(&doc).is_err());
        assert_eq!(synth.generate_document(&doc), diagnostics::CYCLE);
    }

    #[test]
    fn test_free_nodes_contribute_nothing() {
        let doc = DocumentBuilder::new("d")
            .add_node("f", NodeSchema::unassigned())
            .add_node("A", producer())
            .build();
        let listing = no_preview().generate_document(&doc);
        assert_eq!(listing, "import pandas as pd\n\nn02_out = make_frame()\n");
    }

    #[test]
    fn test_generation_is_deterministic() {
        let doc = DocumentBuilder::new("d")
            .add_node("A", producer())
            .add_node("B", consumer())
            .add_edge("A", "out", "B", "in")
            .build();
        let synth = CodeSynthesizer::default();
        assert_eq!(synth.generate_document(&doc), synth.generate_document(&doc.clone()));
    }

    #[test]
    fn test_empty_header_and_document() {
        let synth = CodeSynthesizer::new(SynthesisOptions {
            header: Vec::new(),
            ..SynthesisOptions::default()
        });
        assert_eq!(synth.generate_document(&DocumentState::new("empty")), "");
        assert!(matches!(
            synth.node_code(&DocumentState::new("empty"), "x"),
            Err(CompilerError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_resolved_parameters() {
        let schema = NodeSchema::call("f", NodeCategory::Transform, "f")
            .with_input(PortDefinition::required("data", "frame"))
            .with_output(PortDefinition::optional("out", "frame"))
            .with_parameter(ParameterDefinition::input("data"))
            .with_parameter(ParameterDefinition::output("out"))
            .with_parameter(ParameterDefinition::plain("k", "int", json!(3)));
        let doc = DocumentBuilder::new("d").add_node("F", schema).build();
        let mut upstream = HashMap::new();
        upstream.insert("data".to_string(), "n09_x".to_string());

        let resolved = CodeSynthesizer::resolved_parameters(&doc.nodes[0], &upstream);
        assert_eq!(
            resolved,
            vec![
                ("data".to_string(), json!("n09_x")),
                ("out".to_string(), json!("n01_out")),
                ("k".to_string(), json!(3)),
            ]
        );
    }
}
