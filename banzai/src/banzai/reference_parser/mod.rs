//! Per-type resolution of reference nodes into records.
//!
//! A parser works on every node of its type at once: ids are read from the
//! nodes, looked up in one batched store call, and checked with one batched
//! authorizer call. Nodes that do not resolve are dropped, never errors.

mod commit;
mod records;
mod user;

use std::collections::{HashMap, HashSet};

use crate::banzai::context::RenderContext;
use crate::banzai::document::{NodeId, ReferenceNode};
use crate::banzai::error::BanzaiError;
use crate::banzai::store::Services;
use crate::banzai::types::{Record, ReferenceType, User};

pub use self::commit::CommitParser;
pub use self::records::RecordParser;
pub use self::user::UserParser;

/// What a parser resolves against.
#[derive(Clone, Copy)]
pub struct ParserEnv<'a> {
    pub context: &'a RenderContext,
    pub services: &'a Services,
}

impl<'a> ParserEnv<'a> {
    pub fn new(context: &'a RenderContext, services: &'a Services) -> Self {
        Self { context, services }
    }
}

pub trait ReferenceParser {
    fn reference_type(&self) -> ReferenceType;

    /// Records behind `nodes`, keyed by node. Unresolvable nodes are absent.
    fn records_for_nodes(
        &self,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> HashMap<NodeId, Record>;

    /// Resolved nodes `user` may see, with their records, in node order.
    fn visible_records(
        &self,
        user: Option<&User>,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> Vec<(NodeId, Record)> {
        let mut records = self.records_for_nodes(nodes, env);
        let resolved: Vec<(NodeId, Record)> = nodes
            .iter()
            .filter_map(|node| records.remove(&node.id()).map(|r| (node.id(), r)))
            .collect();
        if resolved.is_empty() {
            return resolved;
        }

        let candidates: Vec<&Record> = resolved.iter().map(|(_, record)| record).collect();
        let flags = env.services.authorizer.visible(user, &candidates);

        // A short answer from the authorizer leaves the tail invisible.
        resolved
            .into_iter()
            .zip(flags)
            .filter_map(|(entry, visible)| visible.then_some(entry))
            .collect()
    }

    fn nodes_visible_to_user(
        &self,
        user: Option<&User>,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> HashSet<NodeId> {
        self.visible_records(user, nodes, env)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Visible records, deduplicated, in document order.
    fn gather_references(
        &self,
        user: Option<&User>,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> Vec<Record> {
        let mut seen = HashSet::new();
        self.visible_records(user, nodes, env)
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| seen.insert(record.key()))
            .collect()
    }
}

/// Parser for a `data-reference-type` value.
pub fn parser_for(name: &str) -> Result<Box<dyn ReferenceParser>, BanzaiError> {
    let kind: ReferenceType = name.parse()?;
    Ok(parser_for_type(kind))
}

pub fn parser_for_type(kind: ReferenceType) -> Box<dyn ReferenceParser> {
    match kind {
        ReferenceType::User => Box::new(UserParser),
        ReferenceType::Commit => Box::new(CommitParser),
        ReferenceType::Issue
        | ReferenceType::MergeRequest
        | ReferenceType::Epic
        | ReferenceType::Label
        | ReferenceType::Milestone => Box::new(RecordParser::new(kind)),
    }
}

/// Numeric ids of `attribute` across `nodes`, sorted and unique.
pub(crate) fn collect_ids(nodes: &[&ReferenceNode], attribute: &str) -> Vec<u64> {
    let mut ids: Vec<u64> = nodes
        .iter()
        .filter_map(|node| node.id_attr(attribute))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::banzai::context::RenderOptions;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_names_are_invalid_reference_types() {
        assert_eq!(
            parser_for("snippet").err(),
            Some(BanzaiError::InvalidReferenceType("snippet".into()))
        );
        assert_eq!(
            parser_for("merge_request").unwrap().reference_type(),
            ReferenceType::MergeRequest
        );
    }

    #[test]
    fn gathers_visible_records_once_in_document_order() {
        let (store, services) = services();
        let context = RenderContext::new(None, None, RenderOptions::default());
        let env = ParserEnv::new(&context, &services);
        let nodes = nodes(concat!(
            r#"<a class="gfm" data-reference-type="issue" data-issue="1001">a</a>"#,
            r#"<a class="gfm" data-reference-type="issue" data-issue="1002">secret</a>"#,
            r#"<a class="gfm" data-reference-type="issue" data-issue="1000">b</a>"#,
            r#"<a class="gfm" data-reference-type="issue" data-issue="1001">again</a>"#,
            r#"<a class="gfm" data-reference-type="issue" data-issue="9999">gone</a>"#,
        ));
        let refs: Vec<&ReferenceNode> = nodes.iter().collect();

        let records = parser_for_type(ReferenceType::Issue).gather_references(None, &refs, &env);

        let ids: Vec<Option<u64>> = records.iter().map(Record::id).collect();
        assert_eq!(ids, vec![Some(1001), Some(1000)]);
        assert_eq!(store.batch_calls(), 1);
    }

    #[test]
    fn unresolved_nodes_are_invisible() {
        let (_, services) = services();
        let context = RenderContext::new(None, None, RenderOptions::default());
        let env = ParserEnv::new(&context, &services);
        let nodes = nodes(concat!(
            r#"<a class="gfm" data-reference-type="milestone" data-milestone="50">a</a>"#,
            r#"<a class="gfm" data-reference-type="milestone">b</a>"#,
        ));
        let refs: Vec<&ReferenceNode> = nodes.iter().collect();

        let visible = parser_for_type(ReferenceType::Milestone).nodes_visible_to_user(None, &refs, &env);

        assert_eq!(visible, HashSet::from([nodes[0].id()]));
    }
}
