//! Per-viewer removal of reference nodes.
//!
//! Every reference node across a batch of documents is collected first,
//! grouped by type and checked with one parser call per type. Nodes the
//! viewer may not see are replaced by their original text. A type group
//! that has no parser is redacted entirely instead of failing the batch.
//!
//! Viewers without the cross-project capability keep links to issues and
//! merge requests of other projects, minus the hover title.

use std::collections::{BTreeMap, HashMap};

use crate::banzai::context::{RenderContext, RenderOptions};
use crate::banzai::document::{Document, DocumentId, NodeAction, NodeId, ReferenceNode};
use crate::banzai::error::BanzaiError;
use crate::banzai::reference_parser::{ParserEnv, parser_for};
use crate::banzai::store::Services;
use crate::banzai::types::{Parent, Project, Record, ReferenceType, User};

/// Reference counts of one document, taken before redaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedactionMetadata {
    pub document: DocumentId,
    pub total_reference_count: usize,
    pub visible_reference_count: usize,
}

pub struct ReferenceRedactor<'a> {
    context: &'a RenderContext,
    services: &'a Services,
}

impl<'a> ReferenceRedactor<'a> {
    pub fn new(context: &'a RenderContext, services: &'a Services) -> Self {
        Self { context, services }
    }

    pub fn redact(&self, documents: &mut [Document]) -> Result<Vec<RedactionMetadata>, BanzaiError> {
        let nodes_per_document = documents
            .iter()
            .map(Document::reference_nodes)
            .collect::<Result<Vec<_>, _>>()?;
        let all_nodes: Vec<&ReferenceNode> = nodes_per_document.iter().flatten().collect();

        let visible = self.visible_nodes(&all_nodes);
        let strip_tooltips = !self
            .services
            .authorizer
            .can_read_cross_project(self.context.current_user());

        let mut metadata = Vec::with_capacity(documents.len());
        for (document, nodes) in documents.iter_mut().zip(&nodes_per_document) {
            let mut actions = HashMap::new();
            let mut visible_count = 0;

            for node in nodes {
                match visible.get(&node.id()) {
                    None => {
                        actions.insert(node.id().index, node.redaction());
                    }
                    Some(record) => {
                        visible_count += 1;
                        if strip_tooltips && self.crosses_projects(node, record) && has_tooltip(node) {
                            actions.insert(node.id().index, NodeAction::StripTooltip);
                        }
                    }
                }
            }

            document.rewrite_reference_nodes(&actions)?;
            metadata.push(RedactionMetadata {
                document: document.id(),
                total_reference_count: nodes.len(),
                visible_reference_count: visible_count,
            });
        }

        Ok(metadata)
    }

    /// Visible nodes and their records, one parser pass per type group.
    fn visible_nodes(&self, nodes: &[&ReferenceNode]) -> HashMap<NodeId, Record> {
        let mut groups: BTreeMap<&str, Vec<&ReferenceNode>> = BTreeMap::new();
        for node in nodes {
            groups.entry(node.reference_type()).or_default().push(*node);
        }

        let env = ParserEnv::new(self.context, self.services);
        let user = self.context.current_user();
        let mut visible = HashMap::new();

        for (kind, group) in groups {
            match parser_for(kind) {
                Ok(parser) => visible.extend(parser.visible_records(user, &group, &env)),
                Err(err) => log::warn!("redacting {} reference nodes: {err}", group.len()),
            }
        }
        visible
    }

    fn crosses_projects(&self, node: &ReferenceNode, record: &Record) -> bool {
        if !matches!(
            node.known_type(),
            Some(ReferenceType::Issue | ReferenceType::MergeRequest)
        ) {
            return false;
        }
        let home = self.context.project_for_node(node).map(|p| p.id);
        record.project_id() != home
    }
}

fn has_tooltip(node: &ReferenceNode) -> bool {
    node.attr("title").is_some()
        || node
            .attr("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == "has-tooltip"))
}

/// Redaction for a plain (project, viewer) pair.
pub struct Redactor<'a> {
    context: RenderContext,
    services: &'a Services,
}

impl<'a> Redactor<'a> {
    pub fn new(project: Option<Project>, user: Option<User>, services: &'a Services) -> Self {
        Self {
            context: RenderContext::new(
                project.map(Parent::Project),
                user,
                RenderOptions::default(),
            ),
            services,
        }
    }

    pub fn redact(&self, documents: &mut [Document]) -> Result<Vec<RedactionMetadata>, BanzaiError> {
        ReferenceRedactor::new(&self.context, self.services).redact(documents)
    }
}
