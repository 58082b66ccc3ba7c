//! Sort Rows

use graph_compiler::{
    publish, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition, PortColumns,
    PortDefinition, Result, Values,
};
use serde_json::json;

use crate::columns;

/// Orders rows by one or more columns; columns pass through
pub struct SortRows;

impl SortRows {
    pub const ALGORITHM: &'static str = "sort-rows";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_BY: &'static str = "by";
    pub const PARAM_ASCENDING: &'static str = "ascending";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = {frame}.sort_values(by={by}, ascending={ascending})",
        )
        .with_label("Sort Rows")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_BY, "columns", json!([])))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_ASCENDING, "bool", json!(true)))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(SortRows)
    }
}

impl ColumnTransform for SortRows {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        columns::ensure_known(incoming, &columns::names(values, Self::PARAM_BY)?)?;
        Ok(publish(schema, incoming.to_vec()))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(SortRows::registration));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::fixture;
    use crate::input::DataFrameInput;
    use graph_compiler::{CodeSynthesizer, DocumentBuilder};

    #[test]
    fn test_sort_keys_must_exist() {
        let inputs = fixture("frame", &[("a", "int64")]);
        let mut values = Values::new();
        values.insert("by".to_string(), json!(["a"]));
        assert!(SortRows.output_columns(&inputs, &values, &SortRows::schema()).is_ok());

        values.insert("by".to_string(), json!(["b"]));
        assert!(SortRows.output_columns(&inputs, &values, &SortRows::schema()).is_err());
    }

    #[test]
    fn test_code_uses_defaults() {
        let doc = DocumentBuilder::new("doc")
            .add_node("src", DataFrameInput::schema())
            .add_node("sort", SortRows::schema())
            .with_value("by", json!(["total"]))
            .add_edge("src", "data", "sort", "frame")
            .build();
        assert_eq!(
            CodeSynthesizer::default().node_code(&doc, "sort").unwrap(),
            "n02_data = n01_data.sort_values(by=['total'], ascending=True)"
        );
    }
}
