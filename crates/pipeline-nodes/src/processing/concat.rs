//! Concat
//!
//! Stacks two frames vertically.

use graph_compiler::{
    publish, Column, ColumnTransform, NodeCategory, NodeRegistration, NodeSchema, PortColumns,
    PortDefinition, Result, Values,
};

use crate::columns;

/// Concat node
///
/// The result has the first frame's columns followed by any the second adds.
/// A column whose type differs between the two becomes `object`.
pub struct Concat;

impl Concat {
    pub const ALGORITHM: &'static str = "concat";
    pub const PORT_FIRST: &'static str = "first";
    pub const PORT_SECOND: &'static str = "second";
    pub const PORT_DATA: &'static str = "data";
    const MIXED_TYPE: &'static str = "object";

    pub fn schema() -> NodeSchema {
        NodeSchema::flat(
            Self::ALGORITHM,
            NodeCategory::Transform,
            "{data} = pd.concat([{first}, {second}], ignore_index=True)",
        )
        .with_label("Concat")
        .with_input(PortDefinition::required(Self::PORT_FIRST, "dataframe"))
        .with_input(PortDefinition::required(Self::PORT_SECOND, "dataframe"))
        .with_output(PortDefinition::optional(Self::PORT_DATA, "dataframe"))
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema()).with_transform(Concat)
    }
}

impl ColumnTransform for Concat {
    fn output_columns(&self, inputs: &PortColumns, _values: &Values, schema: &NodeSchema) -> Result<PortColumns> {
        let first = columns::on_port(inputs, Self::PORT_FIRST);
        let second = columns::on_port(inputs, Self::PORT_SECOND);

        let mut stacked: Vec<Column> = first
            .iter()
            .map(|column| match columns::find(second, &column.name) {
                Some(other) if other.type_label != column.type_label => {
                    Column::new(column.name.as_str(), Self::MIXED_TYPE)
                }
                _ => column.clone(),
            })
            .collect();
        stacked.extend(
            second
                .iter()
                .filter(|c| !columns::contains(first, &c.name))
                .cloned(),
        );
        Ok(publish(schema, stacked))
    }
}

inventory::submit!(graph_compiler::BuiltinNode(Concat::registration));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_of_columns() {
        let mut inputs = PortColumns::new();
        inputs.insert(
            "first".to_string(),
            vec![Column::new("a", "int64"), Column::new("b", "int64")],
        );
        inputs.insert(
            "second".to_string(),
            vec![Column::new("b", "float64"), Column::new("c", "bool")],
        );

        let out = Concat
            .output_columns(&inputs, &Values::new(), &Concat::schema())
            .unwrap();
        assert_eq!(
            out["data"],
            vec![
                Column::new("a", "int64"),
                Column::new("b", "object"),
                Column::new("c", "bool"),
            ]
        );
    }
}
