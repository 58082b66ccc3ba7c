//! Merge
//!
//! Joins two frames on key columns. Non-key columns present on both sides
//! get the pandas default suffixes.

use graph_compiler::{
    publish, Column, ColumnTransform, CompilerError, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition,
    PortColumns, PortDefinition, Result, Values,
};
use serde_json::{json, Value};

use crate::columns;

/// Merge node
///
/// # Inputs
/// - `left` (required) - left frame
/// - `right` (required) - right frame
///
/// # Parameters
/// - `how` - join type, one of [`Merge::JOIN_TYPES`]
/// - `on` - list of key columns; null joins on every shared column
pub struct Merge;

impl Merge {
    pub const ALGORITHM: &'static str = "merge";
    pub const PORT_LEFT: &'static str = "left";
    pub const PORT_RIGHT: &'static str = "right";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_HOW: &'static str = "how";
    pub const PARAM_ON: &'static str = "on";
    pub const SUFFIX_LEFT: &'static str = "_x";
    pub const SUFFIX_RIGHT: &'static str = "_y";
    /// Join types pandas accepts for `how`
    pub const JOIN_TYPES: [&'static str; 5] = ["inner", "left", "right", "outer", "cross"];

    pub fn schema() -> NodeSchema {
        // Join types are bare words, so the template supplies the quotes
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = pd.merge({left}, {right}, how='{how}', on={on})",
        )
        .with_label("Merge")
        .with_input(PortDefinition::required(Self::PORT_LEFT, "dataframe"))
        .with_input(PortDefinition::required(Self::PORT_RIGHT, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_HOW, "choice", json!("inner")))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_ON, "columns", Value::Null))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(Merge)
    }
}

impl ColumnTransform for Merge {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        match values.get(Self::PARAM_HOW) {
            Some(Value::String(how)) if Self::JOIN_TYPES.contains(&how.as_str()) => {}
            other => {
                return Err(CompilerError::transform(format!(
                    "'how' must be one of {}, got {}",
                    Self::JOIN_TYPES.join(", "),
                    other.map(Value::to_string).unwrap_or_else(|| "nothing".to_string())
                )))
            }
        }

        let left = columns::on_port(inputs, Self::PORT_LEFT);
        let right = columns::on_port(inputs, Self::PORT_RIGHT);

        let mut keys = columns::names(values, Self::PARAM_ON)?;
        if keys.is_empty() {
            keys = left
                .iter()
                .filter(|c| columns::contains(right, &c.name))
                .map(|c| c.name.clone())
                .collect();
        }
        columns::ensure_known(left, &keys)?;
        columns::ensure_known(right, &keys)?;

        let is_key = |name: &str| keys.iter().any(|k| k == name);
        let mut merged = Vec::with_capacity(left.len() + right.len());
        for column in left {
            if is_key(&column.name) || !columns::contains(right, &column.name) {
                merged.push(column.clone());
            } else {
                merged.push(suffixed(column, Self::SUFFIX_LEFT));
            }
        }
        for column in right.iter().filter(|c| !is_key(&c.name)) {
            if columns::contains(left, &column.name) {
                merged.push(suffixed(column, Self::SUFFIX_RIGHT));
            } else {
                merged.push(column.clone());
            }
        }
        Ok(publish(schema, merged))
    }
}

fn suffixed(column: &Column, suffix: &str) -> Column {
    Column::new(format!("{}{}", column.name, suffix), column.type_label.clone())
}

inventory::submit!(graph_compiler::BuiltinNode(Merge::registration));
