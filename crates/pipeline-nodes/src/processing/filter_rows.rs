//! Filter Rows
//!
//! Keeps the rows matching a query expression. Columns pass through.

use graph_compiler::{
    publish, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition, PortColumns,
    PortDefinition, Result, Values,
};
use serde_json::json;

use crate::columns;

pub struct FilterRows;

impl FilterRows {
    pub const ALGORITHM: &'static str = "filter-rows";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_EXPRESSION: &'static str = "expression";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = {frame}.query({expression})",
        )
        .with_label("Filter Rows")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_EXPRESSION, "expression", json!("")))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(FilterRows)
    }
}

impl ColumnTransform for FilterRows {
    fn output_columns(&self, inputs: &PortColumns, _values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        Ok(publish(schema, columns::on_port(inputs, Self::PORT_FRAME).to_vec()))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(FilterRows::registration));
