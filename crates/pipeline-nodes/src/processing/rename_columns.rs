//! Rename Columns

use std::collections::HashSet;

use graph_compiler::{
    publish, Column, ColumnTransform, CompilerError, NodeCategory, NodeRegistration, NodeSchema,
    ParameterDefinition, PortColumns, PortDefinition, Result, Values,
};
use serde_json::{json, Value};

use crate::columns;

/// Renames columns through an old-name to new-name mapping
///
/// Renaming two columns to the same name is rejected.
pub struct RenameColumns;

impl RenameColumns {
    pub const ALGORITHM: &'static str = "rename-columns";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_MAPPING: &'static str = "mapping";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = {frame}.rename(columns={mapping})",
        )
        .with_label("Rename Columns")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_MAPPING, "mapping", json!({})))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(RenameColumns)
    }

    fn mapping(values: &Values) -> Result<Vec<(String, String)>> {
        let mapping = match values.get(Self::PARAM_MAPPING) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(mapping)) => mapping,
            Some(_) => return Err(CompilerError::transform("'mapping' must be an object")),
        };
        mapping
            .iter()
            .map(|(old, new)| match new {
                Value::String(new) => Ok((old.clone(), new.clone())),
                _ => Err(CompilerError::transform(format!(
                    "new name for '{}' must be a string",
                    old
                ))),
            })
            .collect()
    }
}

impl ColumnTransform for RenameColumns {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        let mapping = Self::mapping(values)?;
        let old_names: Vec<String> = mapping.iter().map(|(old, _)| old.clone()).collect();
        columns::ensure_known(incoming, &old_names)?;

        let mut seen = HashSet::new();
        let mut renamed = Vec::with_capacity(incoming.len());
        for column in incoming {
            let name = mapping
                .iter()
                .find(|(old, _)| *old == column.name)
                .map(|(_, new)| new.clone())
                .unwrap_or_else(|| column.name.clone());
            if !seen.insert(name.clone()) {
                return Err(CompilerError::transform(format!("duplicate column '{}'", name)));
            }
            renamed.push(Column::new(name, column.type_label.clone()));
        }
        Ok(publish(schema, renamed))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(RenameColumns::registration));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::fixture;
    use crate::input::DataFrameInput;
    use graph_compiler::{CodeSynthesizer, DocumentBuilder};

    fn values(mapping: Value) -> Values {
        let mut values = Values::new();
        values.insert("mapping".to_string(), mapping);
        values
    }

    #[test]
    fn test_renames_in_place() {
        let inputs = fixture("frame", &[("a", "int64"), ("b", "object")]);
        let out = RenameColumns
            .output_columns(&inputs, &values(json!({"a": "id"})), &RenameColumns::schema())
            .unwrap();
        assert_eq!(out["data"], vec![Column::new("id", "int64"), Column::new("b", "object")]);
    }

    #[test]
    fn test_collisions_and_bad_values_fail() {
        let inputs = fixture("frame", &[("a", "int64"), ("b", "object")]);
        let schema = RenameColumns::schema();
        assert!(RenameColumns
            .output_columns(&inputs, &values(json!({"a": "b"})), &schema)
            .is_err());
        assert!(RenameColumns
            .output_columns(&inputs, &values(json!({"a": 1})), &schema)
            .is_err());
        assert!(RenameColumns
            .output_columns(&inputs, &values(json!(["a"])), &schema)
            .is_err());
    }

    #[test]
    fn test_code_quotes_mapping() {
        let doc = DocumentBuilder::new("doc")
            .add_node("src", DataFrameInput::schema())
            .add_node("rename", RenameColumns::schema())
            .with_value("mapping", json!({"old name": "new_name"}))
            .add_edge("src", "data", "rename", "frame")
            .build();
        assert_eq!(
            CodeSynthesizer::default().node_code(&doc, "rename").unwrap(),
            "n02_data = n01_data.rename(columns={'old name': 'new_name'})"
        );
    }
}
