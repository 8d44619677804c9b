use anyhow::Result;

use crate::banzai::context::{FilterContext, RenderContext, RenderOptions};
use crate::banzai::document::{Document, ReferenceNode};
use crate::banzai::error::BanzaiError;
use crate::banzai::pipeline::PipelineKind;
use crate::banzai::reference_parser::{ParserEnv, parser_for};
use crate::banzai::renderer::Renderer;
use crate::banzai::types::{Parent, Project, Record, User};

/// Collects the records a set of texts refers to.
///
/// Texts are analyzed one at a time; [`ReferenceExtractor::references`]
/// then resolves one type across all of them with a single parser pass.
pub struct ReferenceExtractor<'r> {
    renderer: &'r Renderer,
    documents: Vec<Document>,
}

impl<'r> ReferenceExtractor<'r> {
    pub fn new(renderer: &'r Renderer) -> Self {
        Self {
            renderer,
            documents: Vec::new(),
        }
    }

    pub fn analyze(&mut self, text: &str, context: &FilterContext) -> Result<()> {
        let context = context
            .clone()
            .with_pipeline(PipelineKind::ReferenceExtraction.name());
        let result = self.renderer.render_result(text, &context)?;
        self.documents.push(Document::new(result.output));
        Ok(())
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Records of type `name` that `user` may see, in document order.
    pub fn references(
        &self,
        name: &str,
        project: Option<Project>,
        user: Option<&User>,
    ) -> Result<Vec<Record>, BanzaiError> {
        let parser = parser_for(name)?;
        let kind = parser.reference_type().as_str();

        let nodes = self
            .documents
            .iter()
            .map(Document::reference_nodes)
            .collect::<Result<Vec<_>, _>>()?;
        let of_kind: Vec<&ReferenceNode> = nodes
            .iter()
            .flatten()
            .filter(|node| node.reference_type() == kind)
            .collect();
        if of_kind.is_empty() {
            return Ok(Vec::new());
        }

        let context = RenderContext::new(
            project.map(Parent::Project),
            user.cloned(),
            RenderOptions::default(),
        );
        let env = ParserEnv::new(&context, self.renderer.services());
        Ok(parser.gather_references(user, &of_kind, &env))
    }
}
