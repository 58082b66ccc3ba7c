//! Placeholder for a node whose algorithm hasn't been chosen

use graph_compiler::{NodeRegistration, NodeSchema};

/// Unassigned node: no ports, no code, always `unconfigured`
pub struct Unassigned;

impl Unassigned {
    pub fn schema() -> NodeSchema {
        NodeSchema::unassigned().with_label("Unassigned")
    }

    pub fn registration() -> NodeRegistration {
        NodeRegistration::new(Self::schema())
    }
}

inventory::submit!(graph_compiler::BuiltinNode(Unassigned::registration));

#[cfg(test)]
mod tests {
    use super::*;
    use graph_compiler::{CodeSynthesizer, DocumentBuilder, NodeStatus, StatusComputer};

    #[test]
    fn test_emits_nothing_and_stays_unconfigured() {
        let doc = DocumentBuilder::new("doc")
            .add_node("blank", Unassigned::schema())
            .build();

        assert_eq!(CodeSynthesizer::default().node_code(&doc, "blank").unwrap(), "");
        assert_eq!(CodeSynthesizer::default().generate_document(&doc), "import pandas as pd\n");

        let statuses = StatusComputer::new().compute(&doc);
        assert_eq!(statuses, vec![("blank".to_string(), NodeStatus::Unconfigured)]);
    }
}
