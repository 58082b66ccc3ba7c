//! Algorithm registry
//!
//! Maps algorithm ids to their schema and to a resolved [`NodeKind`], which
//! tells the propagator how a node's output columns are produced. Category
//! checks happen once, at registration, so a transform without a column
//! transform or a source without a fetch descriptor never reaches a pass.
//!
//! Built-in algorithms are collected at link time:
//!
//! ```ignore
//! inventory::submit!(graph_compiler::BuiltinNode(my_node::registration));
//!
//! let registry = SchemaRegistry::with_builtins();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::Result;
use crate::types::{Column, FetchDescriptor, NodeCategory, NodeSchema, PortColumns, Values};

/// Computes a transform node's output columns from its input columns
pub trait ColumnTransform: Send + Sync {
    fn output_columns(
        &self,
        inputs: &PortColumns,
        values: &Values,
        schema: &NodeSchema,
    ) -> Result<PortColumns>;
}

impl<F> ColumnTransform for F
where
    F: Fn(&PortColumns, &Values, &NodeSchema) -> Result<PortColumns> + Send + Sync,
{
    fn output_columns(
        &self,
        inputs: &PortColumns,
        values: &Values,
        schema: &NodeSchema,
    ) -> Result<PortColumns> {
        self(inputs, values, schema)
    }
}

/// Publish the same column list on every output port of a schema
pub fn publish(schema: &NodeSchema, columns: Vec<Column>) -> PortColumns {
    schema
        .outputs
        .iter()
        .map(|port| (port.name.clone(), columns.clone()))
        .collect()
}

/// How a registered algorithm produces output columns
#[derive(Clone)]
pub enum NodeKind {
    Source(FetchDescriptor),
    Transform(Arc<dyn ColumnTransform>),
    Sink,
    Free,
}

impl std::fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(fetch) => f.debug_tuple("Source").field(fetch).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
            Self::Sink => f.write_str("Sink"),
            Self::Free => f.write_str("Free"),
        }
    }
}

/// Errors raised when registering an algorithm
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Transform algorithm '{0}' has no column transform")]
    MissingTransform(String),

    #[error("Source algorithm '{0}' has no fetch descriptor")]
    MissingFetchDescriptor(String),

    #[error("Fetch descriptor of '{algorithm}' names unknown parameter '{parameter}'")]
    UnknownFetchParameter { algorithm: String, parameter: String },
}

/// A schema together with the capability that computes its columns
#[derive(Clone)]
pub struct NodeRegistration {
    pub schema: NodeSchema,
    pub transform: Option<Arc<dyn ColumnTransform>>,
}

impl NodeRegistration {
    pub fn new(schema: NodeSchema) -> Self {
        Self {
            schema,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: impl ColumnTransform + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }
}

/// Link-time registration of a built-in algorithm
///
/// Holds a function pointer so registrations can be built at runtime from
/// `inventory::submit!`, which only accepts constant expressions.
pub struct BuiltinNode(pub fn() -> NodeRegistration);

inventory::collect!(BuiltinNode);

struct RegistryEntry {
    schema: NodeSchema,
    kind: NodeKind,
}

/// Registry of algorithms keyed by id
#[derive(Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every algorithm submitted through `inventory`
    ///
    /// Invalid registrations are logged and skipped.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in inventory::iter::<BuiltinNode> {
            let registration = (builtin.0)();
            let id = registration.schema.id.clone();
            if let Err(e) = registry.register(registration) {
                log::warn!("Skipping built-in algorithm '{}': {}", id, e);
            }
        }
        log::debug!("Registered {} built-in algorithm(s)", registry.entries.len());
        registry
    }

    /// Register an algorithm, replacing any previous one with the same id
    pub fn register(&mut self, registration: NodeRegistration) -> std::result::Result<(), RegistryError> {
        let NodeRegistration { schema, transform } = registration;
        let kind = resolve_kind(&schema, transform)?;
        self.entries
            .insert(schema.id.clone(), RegistryEntry { schema, kind });
        Ok(())
    }

    /// Schema registered under an algorithm id
    pub fn get_schema(&self, algorithm: &str) -> Option<&NodeSchema> {
        self.entries.get(algorithm).map(|e| &e.schema)
    }

    /// Resolved kind of an algorithm
    pub fn kind(&self, algorithm: &str) -> Option<&NodeKind> {
        self.entries.get(algorithm).map(|e| &e.kind)
    }

    pub fn has_algorithm(&self, algorithm: &str) -> bool {
        self.entries.contains_key(algorithm)
    }

    /// All algorithm ids, sorted
    pub fn algorithm_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All schemas, sorted by category then id
    pub fn schemas(&self) -> Vec<&NodeSchema> {
        let mut schemas: Vec<&NodeSchema> = self.entries.values().map(|e| &e.schema).collect();
        schemas.sort_by(|a, b| (a.category, &a.id).cmp(&(b.category, &b.id)));
        schemas
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` with the same id.
    pub fn merge(&mut self, other: SchemaRegistry) {
        self.entries.extend(other.entries);
    }
}

/// Check a schema against its category and decide how it propagates
pub(crate) fn resolve_kind(
    schema: &NodeSchema,
    transform: Option<Arc<dyn ColumnTransform>>,
) -> std::result::Result<NodeKind, RegistryError> {
    match schema.category {
        NodeCategory::Source => {
            let fetch = schema
                .fetch
                .clone()
                .ok_or_else(|| RegistryError::MissingFetchDescriptor(schema.id.clone()))?;
            let named = std::iter::once(fetch.source.parameter()).chain(fetch.index_parameter.as_deref());
            for parameter in named {
                if schema.parameter(parameter).is_none() {
                    return Err(RegistryError::UnknownFetchParameter {
                        algorithm: schema.id.clone(),
                        parameter: parameter.to_string(),
                    });
                }
            }
            Ok(NodeKind::Source(fetch))
        }
        NodeCategory::Transform => transform
            .map(NodeKind::Transform)
            .ok_or_else(|| RegistryError::MissingTransform(schema.id.clone())),
        NodeCategory::Sink => Ok(NodeKind::Sink),
        NodeCategory::Free => Ok(NodeKind::Free),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchSource, ParameterDefinition, PortDefinition};
    use serde_json::json;

    fn passthrough(
        inputs: &PortColumns,
        _values: &Values,
        schema: &NodeSchema,
    ) -> Result<PortColumns> {
        let columns = inputs.get("data").cloned().unwrap_or_default();
        Ok(publish(schema, columns))
    }

    fn transform_schema() -> NodeSchema {
        NodeSchema::call("identity", NodeCategory::Transform, "identity")
            .with_input(PortDefinition::required("data", "frame"))
            .with_output(PortDefinition::optional("result", "frame"))
    }

    fn source_schema(parameter: &str) -> NodeSchema {
        NodeSchema::flat("reader", NodeCategory::Source, "{data} = read({filepath})")
            .with_output(PortDefinition::optional("data", "frame"))
            .with_parameter(ParameterDefinition::plain("filepath", "path", json!("")))
            .with_fetch(FetchDescriptor {
                source: FetchSource::File {
                    parameter: parameter.to_string(),
                },
                index_parameter: None,
            })
    }

    #[test]
    fn test_register_transform() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(NodeRegistration::new(transform_schema()).with_transform(passthrough))
            .unwrap();

        assert!(registry.has_algorithm("identity"));
        assert!(matches!(registry.kind("identity"), Some(NodeKind::Transform(_))));

        let NodeKind::Transform(transform) = registry.kind("identity").unwrap() else {
            panic!("expected transform");
        };
        let mut inputs = PortColumns::new();
        inputs.insert("data".to_string(), vec![Column::new("a", "int")]);
        let out = transform
            .output_columns(&inputs, &Values::new(), &transform_schema())
            .unwrap();
        assert_eq!(out["result"], vec![Column::new("a", "int")]);
    }

    #[test]
    fn test_transform_without_capability_rejected() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register(NodeRegistration::new(transform_schema()))
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingTransform("identity".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_source_requires_fetch_descriptor() {
        let mut registry = SchemaRegistry::new();
        let schema = NodeSchema::flat("reader", NodeCategory::Source, "");
        let err = registry.register(NodeRegistration::new(schema)).unwrap_err();
        assert_eq!(err, RegistryError::MissingFetchDescriptor("reader".to_string()));

        let err = registry
            .register(NodeRegistration::new(source_schema("path")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFetchParameter { .. }));

        registry
            .register(NodeRegistration::new(source_schema("filepath")))
            .unwrap();
        assert!(matches!(registry.kind("reader"), Some(NodeKind::Source(_))));
    }

    #[test]
    fn test_sink_and_free_need_nothing() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(NodeRegistration::new(NodeSchema::flat("out", NodeCategory::Sink, "")))
            .unwrap();
        registry
            .register(NodeRegistration::new(NodeSchema::unassigned()))
            .unwrap();

        assert!(matches!(registry.kind("out"), Some(NodeKind::Sink)));
        assert!(matches!(registry.kind("unassigned"), Some(NodeKind::Free)));
        assert_eq!(registry.algorithm_ids(), vec!["out", "unassigned"]);
    }

    #[test]
    fn test_merge_overrides() {
        let mut a = SchemaRegistry::new();
        a.register(NodeRegistration::new(
            NodeSchema::flat("out", NodeCategory::Sink, "").with_label("Old"),
        ))
        .unwrap();
        let mut b = SchemaRegistry::new();
        b.register(NodeRegistration::new(
            NodeSchema::flat("out", NodeCategory::Sink, "").with_label("New"),
        ))
        .unwrap();

        a.merge(b);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get_schema("out").unwrap().label, "New");
    }
}
