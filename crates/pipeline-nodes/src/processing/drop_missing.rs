//! Drop Missing

use graph_compiler::{
    publish, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition, PortColumns,
    PortDefinition, Result, Values,
};
use serde_json::Value;

use crate::columns;

/// Removes rows with missing values, optionally only checking some columns
pub struct DropMissing;

impl DropMissing {
    pub const ALGORITHM: &'static str = "drop-missing";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    /// Columns to check; null checks all of them
    pub const PARAM_SUBSET: &'static str = "subset";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = {frame}.dropna(subset={subset})",
        )
        .with_label("Drop Missing")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_SUBSET, "columns", Value::Null))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(DropMissing)
    }
}

impl ColumnTransform for DropMissing {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        columns::ensure_known(incoming, &columns::names(values, Self::PARAM_SUBSET)?)?;
        Ok(publish(schema, incoming.to_vec()))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(DropMissing::registration));
