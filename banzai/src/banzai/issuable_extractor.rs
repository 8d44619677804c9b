use std::collections::HashMap;

use crate::banzai::context::RenderContext;
use crate::banzai::document::{Document, NodeId, ReferenceNode};
use crate::banzai::error::BanzaiError;
use crate::banzai::reference_parser::{ParserEnv, parser_for_type};
use crate::banzai::store::Services;
use crate::banzai::types::{Record, ReferenceType};

const ISSUABLE_TYPES: [ReferenceType; 2] = [ReferenceType::Issue, ReferenceType::MergeRequest];

/// Resolves the issue and merge request nodes of many documents with one
/// lookup per type.
pub struct IssuableExtractor<'a> {
    context: &'a RenderContext,
    services: &'a Services,
}

impl<'a> IssuableExtractor<'a> {
    pub fn new(context: &'a RenderContext, services: &'a Services) -> Self {
        Self { context, services }
    }

    /// Issuable records keyed by node. Visibility is not checked here.
    pub fn extract(&self, documents: &[Document]) -> Result<HashMap<NodeId, Record>, BanzaiError> {
        let nodes = documents
            .iter()
            .map(Document::reference_nodes)
            .collect::<Result<Vec<_>, _>>()?;
        let env = ParserEnv::new(self.context, self.services);

        let mut records = HashMap::new();
        for kind in ISSUABLE_TYPES {
            let of_kind: Vec<&ReferenceNode> = nodes
                .iter()
                .flatten()
                .filter(|node| node.known_type() == Some(kind))
                .collect();
            if of_kind.is_empty() {
                continue;
            }
            records.extend(parser_for_type(kind).records_for_nodes(&of_kind, &env));
        }
        Ok(records)
    }
}
