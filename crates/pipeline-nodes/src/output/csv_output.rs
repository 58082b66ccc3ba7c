//! CSV Output

use graph_compiler::{NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition, PortDefinition};
use serde_json::json;

/// Writes a frame to a file under the dataset directory
pub struct CsvOutput;

impl CsvOutput {
    pub const ALGORITHM: &'static str = "csv-output";
    pub const PORT_FRAME: &'static str = "frame";
    pub const PARAM_FILEPATH: &'static str = "filepath";
    pub const PARAM_INDEX: &'static str = "index";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Sink,
            "{frame}.to_csv({filepath}, index={index})",
        )
        .with_label("CSV Output")
        .with_input(PortDefinition::required(Self::PORT_FRAME, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_FILEPATH, "path", json!("output.csv")).with_priority(0))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_INDEX, "bool", json!(false)))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema())
    }
}

inventory::submit!(graph_compiler::BuiltinNode(CsvOutput::registration));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CsvInput;
    use graph_compiler::{CodeSynthesizer, DocumentBuilder, SynthesisOptions};

    #[test]
    fn test_writes_under_windows_root() {
        let doc = DocumentBuilder::new("doc")
            .add_node("read", CsvInput::schema())
            .with_value("filepath", json!("in.csv"))
            .add_node("write", CsvOutput::schema())
            .with_value("filepath", json!("out\\clean.csv"))
            .add_edge("read", "data", "write", "frame")
            .build();
        let synthesizer = CodeSynthesizer::new(SynthesisOptions {
            root_dir: Some("C:\\work\\".to_string()),
            ..SynthesisOptions::default()
        });

        assert_eq!(
            synthesizer.node_code(&doc, "write").unwrap(),
            "n01_data.to_csv('C:\\\\work\\\\dataset\\\\out\\\\clean.csv', index=False)"
        );
    }

    #[test]
    fn test_unconnected_frame_is_none() {
        let doc = DocumentBuilder::new("doc")
            .add_node("write", CsvOutput::schema())
            .build();
        assert_eq!(
            CodeSynthesizer::default().node_code(&doc, "write").unwrap(),
            "None.to_csv('dataset/output.csv', index=False)"
        );
    }
}
