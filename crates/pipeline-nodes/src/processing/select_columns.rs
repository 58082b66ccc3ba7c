//! Select Columns
//!
//! Keeps the named columns, in the order given.

use graph_compiler::constants::defaults;
use graph_compiler::{
    publish, Column, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition,
    PortColumns, PortDefinition, Result, Values,
};
use serde_json::json;

use crate::columns;

pub struct SelectColumns;

impl SelectColumns {
    pub const ALGORITHM: &'static str = "select-columns";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_COLUMNS: &'static str = "columns";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(Self::ALGORITHM, NodeCategory::Transform, "{data} = {frame}[{columns}]")
            .with_label("Select Columns")
            .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
            .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
            .with_parameter(ParameterDefinition::plain(Self::PARAM_COLUMNS, "columns", json!([])))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(SelectColumns)
    }
}

impl ColumnTransform for SelectColumns {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        let wanted = columns::names(values, Self::PARAM_COLUMNS)?;
        columns::ensure_known(incoming, &wanted)?;

        let selected = wanted
            .iter()
            .map(|name| {
                columns::find(incoming, name)
                    .cloned()
                    .unwrap_or_else(|| Column::new(name.as_str(), defaults::TYPE_LABEL))
            })
            .collect();
        Ok(publish(schema, selected))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(SelectColumns::registration));
