use std::collections::HashMap;

use anyhow::Result;
use html_escape::encode_text;

use crate::banzai::context::{RenderContext, RenderOptions};
use crate::banzai::document::{Document, NodeAction};
use crate::banzai::issuable_extractor::IssuableExtractor;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

pub const FORMAT_ATTRIBUTE: &str = "data-reference-format";

/// Expands `#5+` style references to `Title (#5)` for viewers who can read
/// the issuable.
pub struct IssuableExpansionFilter;

impl Filter for IssuableExpansionFilter {
    fn name(&self) -> &'static str {
        "issuable_expansion"
    }

    fn call(&self, html: String, env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        if !html.contains(FORMAT_ATTRIBUTE) {
            return Ok(html);
        }

        let context = RenderContext::new(
            env.context.parent(),
            env.context.current_user.clone(),
            RenderOptions::default(),
        );
        let mut documents = [Document::new(html)];
        let records = IssuableExtractor::new(&context, env.services).extract(&documents)?;
        let user = context.current_user();

        let mut actions = HashMap::new();
        for node in documents[0].reference_nodes()? {
            if node.attr(FORMAT_ATTRIBUTE) != Some("+") {
                continue;
            }
            let Some(record) = records.get(&node.id()) else {
                continue;
            };
            if !env.services.authorizer.can_read(user, record) {
                continue;
            }
            let original = node.attr("data-original").unwrap_or_default();
            actions.insert(
                node.id().index,
                NodeAction::SetContent(format!(
                    "{} ({})",
                    encode_text(record.title()),
                    encode_text(original.trim_end_matches('+'))
                )),
            );
        }
        documents[0].rewrite_reference_nodes(&actions)?;

        let [document] = documents;
        Ok(document.into_html())
    }
}
