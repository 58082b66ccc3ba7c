//! Drop Columns

use graph_compiler::{
    publish, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition, PortColumns,
    PortDefinition, Result, Values,
};
use serde_json::json;

use crate::columns;

/// Removes the named columns and keeps the rest in order
pub struct DropColumns;

impl DropColumns {
    pub const ALGORITHM: &'static str = "drop-columns";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_COLUMNS: &'static str = "columns";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = {frame}.drop(columns={columns})",
        )
        .with_label("Drop Columns")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_COLUMNS, "columns", json!([])))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(DropColumns)
    }
}

impl ColumnTransform for DropColumns {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        let dropped = columns::names(values, Self::PARAM_COLUMNS)?;
        columns::ensure_known(incoming, &dropped)?;

        let kept = incoming
            .iter()
            .filter(|c| !dropped.contains(&c.name))
            .cloned()
            .collect();
        Ok(publish(schema, kept))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(DropColumns::registration));
