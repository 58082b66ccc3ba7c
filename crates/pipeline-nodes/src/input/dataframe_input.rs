//! DataFrame Input
//!
//! Starts a pipeline from a dataframe already living in the execution
//! environment.

use graph_compiler::{
    FetchDescriptor, FetchSource, NodeCategory, NodeRegistration, NodeSchema, ParameterDefinition,
    PortDefinition,
};
use serde_json::json;

/// DataFrame Input node
///
/// Copies the named variable so later steps never mutate it.
pub struct DataFrameInput;

impl DataFrameInput {
    pub const ALGORITHM: &'static str = "dataframe-input";
    pub const PORT_DATA: &'static str = "data";
    /// Name of the environment variable holding the frame
    pub const PARAM_VARIABLE: &'static str = "variable";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(Self::ALGORITHM, NodeCategory::Source, "{data} = {variable}.copy()")
            .with_label("DataFrame Input")
            .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
            .with_parameter(ParameterDefinition::plain(Self::PARAM_VARIABLE, "variable", json!("df")))
            .with_fetch(FetchDescriptor {
                source: FetchSource::Variable {
                    parameter: Self::PARAM_VARIABLE.to_string(),
                },
                index_parameter: None,
            })
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema())
    }
}

inventory::submit!(graph_compiler::BuiltinNode(DataFrameInput::registration));
