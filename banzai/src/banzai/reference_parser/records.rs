use std::collections::HashMap;

use crate::banzai::document::{NodeId, ReferenceNode};
use crate::banzai::types::{Record, ReferenceType};

use super::{ParserEnv, ReferenceParser, collect_ids};

/// Parser for types whose nodes carry a numeric id in `data-<type>`:
/// issues, merge requests, epics, labels and milestones.
pub struct RecordParser {
    kind: ReferenceType,
}

impl RecordParser {
    pub fn new(kind: ReferenceType) -> Self {
        Self { kind }
    }
}

impl ReferenceParser for RecordParser {
    fn reference_type(&self) -> ReferenceType {
        self.kind
    }

    fn records_for_nodes(
        &self,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> HashMap<NodeId, Record> {
        let attribute = self.kind.data_attribute();
        let ids = collect_ids(nodes, attribute);
        if ids.is_empty() {
            return HashMap::new();
        }

        let by_id: HashMap<u64, Record> = env
            .services
            .store
            .find_records(self.kind, &ids)
            .into_iter()
            .filter_map(|record| record.id().map(|id| (id, record)))
            .collect();

        nodes
            .iter()
            .filter_map(|node| {
                let record = by_id.get(&node.id_attr(attribute)?)?;
                Some((node.id(), record.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{nodes, services};
    use super::*;
    use crate::banzai::context::{RenderContext, RenderOptions};

    #[test]
    fn resolves_every_node_with_one_lookup() {
        let (store, services) = services();
        let context = RenderContext::new(None, None, RenderOptions::default());
        let nodes = nodes(concat!(
            r#"<a class="gfm" data-reference-type="label" data-label="40">~bug</a>"#,
            r#"<a class="gfm" data-reference-type="label" data-label="41">~feature</a>"#,
            r#"<a class="gfm" data-reference-type="label" data-label="x">~odd</a>"#,
        ));
        let refs: Vec<&ReferenceNode> = nodes.iter().collect();

        let records = RecordParser::new(ReferenceType::Label)
            .records_for_nodes(&refs, &ParserEnv::new(&context, &services));

        assert_eq!(records.len(), 2);
        assert_eq!(records[&nodes[1].id()].title(), "feature request");
        assert_eq!(store.batch_calls(), 1);
    }

    #[test]
    fn no_ids_means_no_lookup() {
        let (store, services) = services();
        let context = RenderContext::new(None, None, RenderOptions::default());

        let records = RecordParser::new(ReferenceType::Epic)
            .records_for_nodes(&[], &ParserEnv::new(&context, &services));

        assert!(records.is_empty());
        assert_eq!(store.batch_calls(), 0);
    }
}
