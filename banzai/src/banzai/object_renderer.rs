//! Batch rendering of one Markdown attribute across many domain objects.

use anyhow::{Context, Result};

use crate::banzai::context::{FilterContext, RenderContext, RenderOptions};
use crate::banzai::document::Document;
use crate::banzai::pipeline::PipelineKind;
use crate::banzai::redactor::ReferenceRedactor;
use crate::banzai::renderer::{RenderItem, Renderer};
use crate::banzai::types::{Parent, Project, User};

/// A domain object with Markdown-bearing attributes.
pub trait MarkdownObject {
    /// Stable identity used in cache keys, e.g. `note:12`.
    fn cache_key(&self) -> String;

    fn markdown(&self, attribute: &str) -> Option<&str>;

    /// Store the rendered `<attribute>_html`.
    fn set_rendered_html(&mut self, attribute: &str, html: String);

    fn set_user_visible_reference_count(&mut self, count: usize);

    fn author(&self) -> Option<&User> {
        None
    }

    fn project(&self) -> Option<&Project> {
        None
    }

    /// Context the object wants its `attribute` rendered with.
    fn render_context(&self, _attribute: &str) -> FilterContext {
        FilterContext::default()
    }

    /// The cached-HTML capability, for objects that keep their own cache.
    fn cached_markdown(&mut self) -> Option<&mut dyn HasCachedMarkdown> {
        None
    }
}

/// Objects that keep rendered HTML next to their Markdown and know when it
/// went stale.
pub trait HasCachedMarkdown {
    fn cached_markdown_fields(&self) -> Vec<&'static str>;

    fn cached_html_up_to_date(&self, field: &str) -> bool;

    fn refresh_markdown_cache(&mut self, renderer: &Renderer) -> Result<()>;

    fn cached_html_for(&self, field: &str) -> Option<&str>;
}

/// Renders and redacts an attribute for a batch of objects, writing
/// `<attribute>_html` and the visible reference count back onto each.
pub struct ObjectRenderer<'r> {
    renderer: &'r Renderer,
    context: RenderContext,
    raw_context: FilterContext,
}

impl<'r> ObjectRenderer<'r> {
    pub fn new(
        renderer: &'r Renderer,
        parent: Option<Parent>,
        user: Option<User>,
        raw_context: FilterContext,
    ) -> Self {
        let options = RenderOptions {
            no_original_data: raw_context.no_original_data,
            only_path: raw_context.only_path,
        };
        Self {
            renderer,
            context: RenderContext::new(parent, user, options),
            raw_context,
        }
    }

    pub fn render<O: MarkdownObject>(&self, objects: &mut [O], attribute: &str) -> Result<()> {
        let items: Vec<RenderItem> = objects
            .iter()
            .map(|object| RenderItem {
                text: object.markdown(attribute).unwrap_or_default().to_string(),
                context: self.context_for(object, attribute),
            })
            .collect();
        let rendered = self.renderer.cache_collection_render(&items)?;

        let mut context = self.context.clone();
        let mut documents = Vec::with_capacity(objects.len());
        for ((object, item), html) in objects.iter().zip(&items).zip(rendered) {
            let html = self
                .renderer
                .run(PipelineKind::RelativeLink, &html, &item.context)
                .with_context(|| format!("post-processing {}", object.cache_key()))?
                .output;
            let document = Document::new(html);
            context.associate_document(&document, object);
            documents.push(document);
        }

        let metadata = ReferenceRedactor::new(&context, self.renderer.services())
            .redact(&mut documents)?;
        log::debug!(
            "rendered {attribute} for {} objects, {} references visible",
            objects.len(),
            metadata.iter().map(|m| m.visible_reference_count).sum::<usize>()
        );

        for ((object, document), metadata) in objects.iter_mut().zip(documents).zip(metadata) {
            object.set_rendered_html(attribute, document.into_html());
            object.set_user_visible_reference_count(metadata.visible_reference_count);
        }
        Ok(())
    }

    fn context_for<O: MarkdownObject>(&self, object: &O, attribute: &str) -> FilterContext {
        let mut context = object
            .render_context(attribute)
            .merge(&self.raw_context)
            .with_cache_key([object.cache_key(), attribute.to_string()]);

        context.author = object.author().cloned().or(context.author);
        context.project = object
            .project()
            .cloned()
            .or(context.project)
            .or_else(|| self.context.project().cloned());
        if context.project.is_none() && context.group.is_none() {
            context.group = self.context.parent().and_then(Parent::group).cloned();
        }
        context.current_user = self.context.current_user().cloned();
        context
    }
}
