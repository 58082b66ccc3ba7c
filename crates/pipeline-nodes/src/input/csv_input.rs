//! CSV Input
//!
//! Reads a delimited file into a dataframe. The path is resolved against the
//! dataset root at code generation time.

use graph_compiler::{
    FetchDescriptor, FetchSource, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition,
    PortDefinition,
};
use serde_json::{json, Value};

/// CSV Input node
///
/// # Parameters
/// - `filepath` - path of the file, relative to the dataset directory
/// - `sep` - field delimiter
/// - `index_column` - list holding the column to use as the row index,
///   dropped from the published columns
///
/// # Outputs
/// - `data` - the loaded dataframe
pub struct CsvInput;

impl CsvInput {
    pub const ALGORITHM: &'static str = "csv-input";
    /// Port ID for the loaded frame
    pub const PORT_DATA: &'static str = "data";
    pub const PARAM_FILEPATH: &'static str = "filepath";
    pub const PARAM_SEP: &'static str = "sep";
    pub const PARAM_INDEX_COLUMN: &'static str = "index_column";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Source,
            "{data} = pd.read_csv({filepath}, sep={sep}, index_col={index_column})",
        )
        .with_label("CSV Input")
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_FILEPATH, "path", json!("")).with_priority(0))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_SEP, "string", json!(",")))
        .with_parameter(ParameterDefinition::plain(Self::PARAM_INDEX_COLUMN, "columns", Value::Null))
        .with_fetch(FetchDescriptor {
            source: FetchSource::File {
                parameter: Self::PARAM_FILEPATH.to_string(),
            },
            index_parameter: Some(Self::PARAM_INDEX_COLUMN.to_string()),
        })
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema())
    }
}

inventory::submit!(graph_compiler::BuiltinNode(CsvInput::registration));

#[cfg(test)]
mod tests {
    use super::*;
    use graph_compiler::{CodeSynthesizer, DocumentBuilder, SynthesisOptions};

    #[test]
    fn test_reads_from_dataset_root() {
        let doc = DocumentBuilder::new("doc")
            .add_node("read", CsvInput::schema())
            .with_value(CsvInput::PARAM_FILEPATH, json!("sales.csv"))
            .with_value(CsvInput::PARAM_INDEX_COLUMN, json!(["order date"]))
            .build();
        let synthesizer = CodeSynthesizer::new(SynthesisOptions {
            root_dir: Some("/srv".to_string()),
            ..SynthesisOptions::default()
        });

        assert_eq!(
            synthesizer.node_code(&doc, "read").unwrap(),
            "n01_data = pd.read_csv('/srv/dataset/sales.csv', sep=',', index_col=['order date'])"
        );
    }

    #[test]
    fn test_defaults_without_root() {
        let doc = DocumentBuilder::new("doc")
            .add_node("read", CsvInput::schema())
            .with_value(CsvInput::PARAM_FILEPATH, json!("./raw/a b.csv"))
            .build();

        assert_eq!(
            CodeSynthesizer::default().node_code(&doc, "read").unwrap(),
            "n01_data = pd.read_csv('dataset/raw/a b.csv', sep=',', index_col=None)"
        );
    }
}
