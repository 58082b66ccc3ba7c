//! Core types for pipeline graphs
//!
//! These types define the structure of a pipeline document: node schemas
//! with their ports and parameters, node instances, edges, and the column
//! metadata computed by propagation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Parameter values of a node, keyed by parameter name
pub type Values = serde_json::Map<String, serde_json::Value>;

/// Columns available on each port, keyed by port name
pub type PortColumns = BTreeMap<String, Vec<Column>>;

fn default_type_label() -> String {
    defaults::TYPE_LABEL.to_string()
}

/// Definition of a port (input or output)
///
/// The type label is advisory: it is shown to users but never checked
/// when connecting ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    /// Port name, unique among the inputs (or outputs) of a schema
    pub name: String,
    /// Declared data type label
    #[serde(default = "default_type_label")]
    pub type_label: String,
    /// Whether this input must be connected for the node to be configured
    #[serde(default)]
    pub required: bool,
}

impl PortDefinition {
    /// Create a required port
    pub fn required(name: impl Into<String>, type_label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_label: type_label.into(),
            required: true,
        }
    }

    /// Create an optional port
    pub fn optional(name: impl Into<String>, type_label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_label: type_label.into(),
            required: false,
        }
    }
}

/// How a parameter participates in code synthesis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamRole {
    /// Bound to the input port of the same name
    Input,
    /// Bound to the output port of the same name
    Output,
    /// A user-configured value
    #[default]
    Plain,
}

/// Definition of a node parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default = "default_type_label")]
    pub type_label: String,
    #[serde(default)]
    pub default: serde_json::Value,
    #[serde(default)]
    pub role: ParamRole,
    /// Display ordering hint for hosts (lower first)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl ParameterDefinition {
    /// Create a plain parameter with a default value
    pub fn plain(
        name: impl Into<String>,
        type_label: impl Into<String>,
        default: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            type_label: type_label.into(),
            default,
            role: ParamRole::Plain,
            priority: None,
        }
    }

    /// Create a parameter bound to an input port
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_label: default_type_label(),
            default: serde_json::Value::Null,
            role: ParamRole::Input,
            priority: None,
        }
    }

    /// Create a parameter bound to an output port
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_label: default_type_label(),
            default: serde_json::Value::Null,
            role: ParamRole::Output,
            priority: None,
        }
    }

    /// Set the display priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Category of a node schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Produces columns fetched from an external collaborator
    Source,
    /// Computes its columns from its inputs
    Transform,
    /// Consumes data and produces nothing downstream
    Sink,
    /// No algorithm assigned yet
    #[serde(alias = "unassigned")]
    Free,
}

/// How a node's source text is produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CodeTemplate {
    /// Literal `{name}` placeholder substitution
    Flat { template: String },
    /// `name = function(arg=value, ...)`
    Call { function: String },
}

/// Where a source node's columns come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum FetchSource {
    /// A file path held in the named parameter
    File { parameter: String },
    /// A live-environment variable name held in the named parameter
    Variable { parameter: String },
}

impl FetchSource {
    /// Name of the parameter holding the fetch key
    pub fn parameter(&self) -> &str {
        match self {
            Self::File { parameter } | Self::Variable { parameter } => parameter,
        }
    }
}

/// Fetch configuration carried by source schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDescriptor {
    pub source: FetchSource,
    /// Parameter naming an index/time column to drop from fetched columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_parameter: Option<String>,
}

/// Static description of a node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSchema {
    /// Algorithm identifier (e.g., "csv-input")
    pub id: String,
    pub category: NodeCategory,
    /// Human-readable label
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub inputs: Vec<PortDefinition>,
    #[serde(default)]
    pub outputs: Vec<PortDefinition>,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    pub template: CodeTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchDescriptor>,
}

impl NodeSchema {
    /// Create a schema rendered through a flat template
    pub fn flat(id: impl Into<String>, category: NodeCategory, template: impl Into<String>) -> Self {
        Self::with_template(
            id,
            category,
            CodeTemplate::Flat {
                template: template.into(),
            },
        )
    }

    /// Create a schema rendered as a structured call
    pub fn call(id: impl Into<String>, category: NodeCategory, function: impl Into<String>) -> Self {
        Self::with_template(
            id,
            category,
            CodeTemplate::Call {
                function: function.into(),
            },
        )
    }

    fn with_template(id: impl Into<String>, category: NodeCategory, template: CodeTemplate) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            template,
            fetch: None,
        }
    }

    /// Placeholder schema for a node with no algorithm assigned
    pub fn unassigned() -> Self {
        Self::flat("unassigned", NodeCategory::Free, "")
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_input(mut self, port: PortDefinition) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortDefinition) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_fetch(mut self, fetch: FetchDescriptor) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Find an input port by name
    pub fn input_port(&self, name: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Find an output port by name
    pub fn output_port(&self, name: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Find a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Names of the output ports, in declaration order
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|p| p.name.as_str()).collect()
    }

    /// Input ports that must be connected
    pub fn required_inputs(&self) -> impl Iterator<Item = &PortDefinition> {
        self.inputs.iter().filter(|p| p.required)
    }

    /// Parameters ordered for display: prioritized ones first, then schema order
    pub fn parameters_by_priority(&self) -> Vec<&ParameterDefinition> {
        let mut params: Vec<&ParameterDefinition> = self.parameters.iter().collect();
        params.sort_by_key(|p| p.priority.unwrap_or(i32::MAX));
        params
    }
}

/// A column with its inferred type label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default = "default_type_label")]
    pub type_label: String,
}

impl Column {
    pub fn new(name: impl Into<String>, type_label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_label: type_label.into(),
        }
    }
}

/// Outcome of the last propagation pass for a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PropagationStatus {
    /// Not computed yet
    #[default]
    Pending,
    Ready,
    Error { message: String },
}

/// Column metadata computed by propagation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default)]
    pub input_columns: PortColumns,
    #[serde(default)]
    pub output_columns: PortColumns,
    #[serde(default)]
    pub status: PropagationStatus,
}

/// Persisted variable name of one output port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputBinding {
    pub port: String,
    pub variable: String,
}

/// A node instance in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Sequence number assigned at creation; never changes
    pub ordinal: u32,
    pub schema: NodeSchema,
    #[serde(default)]
    pub values: Values,
    #[serde(default)]
    pub bindings: Vec<OutputBinding>,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl GraphNode {
    pub fn category(&self) -> NodeCategory {
        self.schema.category
    }

    /// Algorithm id of the node's schema
    pub fn algorithm(&self) -> &str {
        &self.schema.id
    }

    /// Bound variable name for an output port
    pub fn binding(&self, port: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.port == port)
            .map(|b| b.variable.as_str())
    }

    /// Configured value of a parameter, ignoring schema defaults
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Configured value, falling back to the schema default
    pub fn value_or_default(&self, name: &str) -> serde_json::Value {
        self.values
            .get(name)
            .cloned()
            .or_else(|| self.schema.parameter(name).map(|p| p.default.clone()))
            .unwrap_or(serde_json::Value::Null)
    }
}

/// An edge connecting an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_port: String,
    pub target: NodeId,
    pub target_port: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_accepts_unassigned_alias() {
        let category: NodeCategory = serde_json::from_value(json!("unassigned")).unwrap();
        assert_eq!(category, NodeCategory::Free);
        let category: NodeCategory = serde_json::from_value(json!("source")).unwrap();
        assert_eq!(category, NodeCategory::Source);
    }

    #[test]
    fn test_schema_deserializes_with_defaults() {
        let schema: NodeSchema = serde_json::from_value(json!({
            "id": "filter",
            "category": "transform",
            "inputs": [{"name": "data", "required": true}],
            "outputs": [{"name": "result"}],
            "parameters": [{"name": "expression", "default": ""}],
            "template": {"mode": "flat", "template": "{result} = {data}.query({expression})"}
        }))
        .unwrap();

        assert_eq!(schema.inputs[0].type_label, "any");
        assert!(schema.inputs[0].required);
        assert!(!schema.outputs[0].required);
        assert_eq!(schema.parameters[0].role, ParamRole::Plain);
        assert!(schema.fetch.is_none());
    }

    #[test]
    fn test_parameters_by_priority() {
        let schema = NodeSchema::call("f", NodeCategory::Transform, "f")
            .with_parameter(ParameterDefinition::plain("a", "int", json!(1)))
            .with_parameter(ParameterDefinition::plain("b", "int", json!(2)).with_priority(0))
            .with_parameter(ParameterDefinition::plain("c", "int", json!(3)));

        let names: Vec<&str> = schema
            .parameters_by_priority()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_value_or_default() {
        let schema = NodeSchema::call("f", NodeCategory::Transform, "f")
            .with_parameter(ParameterDefinition::plain("sep", "str", json!(",")));
        let mut node = GraphNode {
            id: "n".to_string(),
            ordinal: 1,
            schema,
            values: Values::new(),
            bindings: Vec::new(),
            metadata: NodeMetadata::default(),
        };
        assert_eq!(node.value_or_default("sep"), json!(","));
        assert_eq!(node.value_or_default("missing"), serde_json::Value::Null);

        node.values.insert("sep".to_string(), json!(";"));
        assert_eq!(node.value_or_default("sep"), json!(";"));
    }

    #[test]
    fn test_propagation_status_serialization() {
        let status = PropagationStatus::Error {
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, json!({"state": "error", "message": "boom"}));
    }
}
