//! One-Hot Encode
//!
//! Rendered as a structured `pd.get_dummies` call.

use graph_compiler::{
    publish, Column, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition,
    PortColumns, PortDefinition, Result, Values,
};
use serde_json::json;

use crate::columns;

/// One-Hot Encode node
///
/// The categories of an encoded column are only known once the data is
/// loaded, so each one is published as a single `{column}_*` placeholder.
/// With no columns named, every text-like column is encoded.
pub struct OneHotEncode;

impl OneHotEncode {
    pub const ALGORITHM: &'static str = "one-hot-encode";
    pub const PORT_DATA: &'static str = "data";
    pub const PORT_ENCODED: &'static str = "encoded";
    pub const PARAM_COLUMNS: &'static str = "columns";
    pub const PARAM_DROP_FIRST: &'static str = "drop_first";
    const CATEGORICAL_TYPES: &'static [&'static str] = &["object", "category", "string"];

    pub fn schema() -> NodeSchema {
        NodeSchema::call(Self::ALGORITHM, NodeCategory::Transform, "pd.get_dummies")
            .with_label("One-Hot Encode")
            .with_input(PortDefinition::required(Self::PORT_DATA, "dataframe"))
            .with_output(PortDefinition::optional(Self::PORT_ENCODED, "dataframe"))
            .with_parameter(ParameterDefinition::plain(Self::PARAM_COLUMNS, "columns", json!([])))
            .with_parameter(ParameterDefinition::plain(Self::PARAM_DROP_FIRST, "bool", json!(false)))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(OneHotEncode)
    }
}

impl ColumnTransform for OneHotEncode {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_DATA);
        let mut encoded = columns::names(values, Self::PARAM_COLUMNS)?;
        columns::ensure_known(incoming, &encoded)?;
        if encoded.is_empty() {
            encoded = incoming
                .iter()
                .filter(|c| Self::CATEGORICAL_TYPES.contains(&c.type_label.as_str()))
                .map(|c| c.name.clone())
                .collect();
        }

        let mut out: Vec<Column> = incoming
            .iter()
            .filter(|c| !encoded.contains(&c.name))
            .cloned()
            .collect();
        out.extend(encoded.iter().map(|name| Column::new(format!("{}_*", name), "bool")));
        Ok(publish(schema, out))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(OneHotEncode::registration));
