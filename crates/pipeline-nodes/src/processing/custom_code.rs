//! Custom Code
//!
//! Pipes a frame through a user-defined function.

use graph_compiler::constants::defaults;
use graph_compiler::{
    publish, Column, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition,
    PortColumns, PortDefinition, Result, Values,
};
use serde_json::json;

use crate::columns;

/// Custom Code node
///
/// `function` names a callable defined elsewhere in the notebook. Its
/// result columns can't be inferred, so `columns` may declare them; when
/// empty the input columns pass through.
pub struct CustomCode;

impl CustomCode {
    pub const ALGORITHM: &'static str = "custom-code";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_FUNCTION: &'static str = "function";
    pub const PARAM_COLUMNS: &'static str = "columns";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(Self::ALGORITHM, NodeCategory::Transform, "{data} = {frame}.pipe({function})")
            .with_label("Custom Code")
            .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
            .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
            .with_parameter(ParameterDefinition::plain(Self::PARAM_FUNCTION, "variable", json!("transform")))
            .with_parameter(ParameterDefinition::plain(Self::PARAM_COLUMNS, "columns", json!([])))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(CustomCode)
    }
}

impl ColumnTransform for CustomCode {
    fn output_columns(&self, inputs: &PortColumns, values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let incoming = columns::on_port(inputs, Self::PORT_FRAME);
        let declared = columns::names(values, Self::PARAM_COLUMNS)?;
        if declared.is_empty() {
            return Ok(publish(schema, incoming.to_vec()));
        }

        let out = declared
            .iter()
            .map(|name| {
                columns::find(incoming, name)
                    .cloned()
                    .unwrap_or_else(|| Column::new(name.as_str(), defaults::TYPE_LABEL))
            })
            .collect();
        Ok(publish(schema, out))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(CustomCode::registration));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::fixture;
    use crate::input::DataFrameInput;
    use graph_compiler::{CodeSynthesizer, DocumentBuilder};

    #[test]
    fn test_declared_columns_replace_input() {
        let inputs = fixture("frame", &[("a", "int64")]);
        let schema = CustomCode::schema();

        let out = CustomCode.output_columns(&inputs, &Values::new(), &schema).unwrap();
        assert_eq!(out["data"], vec![Column::new("a", "int64")]);

        let mut values = Values::new();
        values.insert("columns".to_string(), json!(["a", "score"]));
        let out = CustomCode.output_columns(&inputs, &values, &schema).unwrap();
        assert_eq!(
            out["data"],
            vec![Column::new("a", "int64"), Column::new("score", "any")]
        );
    }

    #[test]
    fn test_code_ignores_declared_columns() {
        let doc = DocumentBuilder::new("doc")
            .add_node("src", DataFrameInput::schema())
            .add_node("custom", CustomCode::schema())
            .with_value("function", json!("add_score"))
            .with_value("columns", json!(["score"]))
            .add_edge("src", "data", "custom", "frame")
            .build();
        assert_eq!(
            CodeSynthesizer::default().node_code(&doc, "custom").unwrap(),
            "n02_data = n01_data.pipe(add_score)"
        );
    }
}
