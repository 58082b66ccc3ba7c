//! Group By
//!
//! Groups rows by key columns and aggregates the others.

use graph_compiler::constants::defaults;
use graph_compiler::{
    publish, Column, ColumnTransform, CompilerError, NodeCategory, NodeRegistration, NodeSchema,
    ParameterDefinition, PortColumns, PortDefinition, Result, Values,
};
use serde_json::{json, Value};

use crate::columns;

/// Group By node
///
/// `aggregations` maps a column to a pandas aggregation name, e.g.
/// `{"total": "sum"}`. The result holds the key columns followed by one
/// column per aggregation.
pub struct GroupBy;

impl GroupBy {
    pub const ALGORITHM: &'static str = "group-by";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_BY: &'static str = "by";
    pub const PARAM_AGGREGATIONS: &'static str = "aggregations";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = {frame}.groupby({by}, as_index=False).agg({aggregations})",
        )
        .with_label("Group By")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_BY, "columns", json!([])).with_priority(0))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_AGGREGATIONS, "mapping", json!({})).with_priority(1))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(GroupBy)
    }
}

/// Type label of an aggregated column
fn aggregated_type(function: &str, source: Option<&Column>) -> String {
    match function {
        "count" | "size" | "nunique" => "int64".to_string(),
        "mean" | "median" | "std" | "var" => "float64".to_string(),
        _ => source
            .map(|c| c.type_label.clone())
            .unwrap_or_else(|| defaults::TYPE_LABEL.to_string()),
    }
}

impl ColumnTransform for GroupBy {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        let keys = columns::names(values, Self::PARAM_BY)?;
        columns::ensure_known(incoming, &keys)?;

        let aggregations = match values.get(Self::PARAM_AGGREGATIONS) {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(CompilerError::transform("'aggregations' must be an object")),
        };

        let mut grouped: Vec<Column> = keys
            .iter()
            .map(|key| {
                columns::find(incoming, key)
                    .cloned()
                    .unwrap_or_else(|| Column::new(key.as_str(), defaults::TYPE_LABEL))
            })
            .collect();

        for (column, function) in &aggregations {
            let Value::String(function) = function else {
                return Err(CompilerError::transform(format!(
                    "aggregation for '{}' must be a function name",
                    column
                )));
            };
            let source = columns::find(incoming, column);
            if source.is_none() && !incoming.is_empty() {
                return Err(CompilerError::transform(format!("unknown column '{}'", column)));
            }
            grouped.push(Column::new(column.as_str(), aggregated_type(function, source)));
        }
        Ok(publish(schema, grouped))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(GroupBy::registration));
