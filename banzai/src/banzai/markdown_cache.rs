//! Rendered-HTML caches kept on the objects themselves.

use std::collections::HashMap;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::banzai::context::FilterContext;
use crate::banzai::object_renderer::{HasCachedMarkdown, MarkdownObject};
use crate::banzai::renderer::Renderer;
use crate::banzai::types::{Project, User};

#[derive(Clone, Debug, PartialEq, Eq)]
struct CachedField {
    digest: String,
    html: String,
}

/// Rendered HTML per field, tagged with a digest of the Markdown it came from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkdownCache {
    fields: HashMap<String, CachedField>,
}

impl MarkdownCache {
    pub fn digest(markdown: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(markdown.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn is_fresh(&self, field: &str, markdown: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(|cached| cached.digest == Self::digest(markdown))
    }

    pub fn store(&mut self, field: &str, markdown: &str, html: String) {
        self.fields.insert(
            field.to_string(),
            CachedField {
                digest: Self::digest(markdown),
                html,
            },
        );
    }

    pub fn html(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|cached| cached.html.as_str())
    }
}

/// A comment on an issue, merge request or commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Note {
    pub id: u64,
    pub note: String,
    pub project: Option<Project>,
    pub author: Option<User>,
    pub note_html: Option<String>,
    pub user_visible_reference_count: Option<usize>,
    cache: MarkdownCache,
}

impl Note {
    pub fn new(id: u64, note: impl Into<String>) -> Self {
        Self {
            id,
            note: note.into(),
            ..Self::default()
        }
    }

    pub fn in_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn by(mut self, author: User) -> Self {
        self.author = Some(author);
        self
    }
}

impl MarkdownObject for Note {
    fn cache_key(&self) -> String {
        format!("note:{}", self.id)
    }

    fn markdown(&self, attribute: &str) -> Option<&str> {
        (attribute == "note").then_some(self.note.as_str())
    }

    fn set_rendered_html(&mut self, attribute: &str, html: String) {
        if attribute == "note" {
            self.note_html = Some(html);
        }
    }

    fn set_user_visible_reference_count(&mut self, count: usize) {
        self.user_visible_reference_count = Some(count);
    }

    fn author(&self) -> Option<&User> {
        self.author.as_ref()
    }

    fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    fn render_context(&self, _attribute: &str) -> FilterContext {
        FilterContext {
            project: self.project.clone(),
            author: self.author.clone(),
            pipeline: Some("note".into()),
            ..FilterContext::default()
        }
    }

    fn cached_markdown(&mut self) -> Option<&mut dyn HasCachedMarkdown> {
        Some(self)
    }
}

impl HasCachedMarkdown for Note {
    fn cached_markdown_fields(&self) -> Vec<&'static str> {
        vec!["note"]
    }

    fn cached_html_up_to_date(&self, field: &str) -> bool {
        self.markdown(field)
            .is_some_and(|markdown| self.cache.is_fresh(field, markdown))
    }

    fn refresh_markdown_cache(&mut self, renderer: &Renderer) -> Result<()> {
        for field in self.cached_markdown_fields() {
            if self.cached_html_up_to_date(field) {
                continue;
            }
            let markdown = self.markdown(field).unwrap_or_default().to_string();
            let html = renderer.cacheless_render(&markdown, &self.render_context(field))?;
            self.cache.store(field, &markdown, html);
        }
        Ok(())
    }

    fn cached_html_for(&self, field: &str) -> Option<&str> {
        self.cache.html(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_follows_the_markdown() {
        let mut cache = MarkdownCache::default();
        cache.store("note", "hello", "<p>hello</p>".into());

        assert!(cache.is_fresh("note", "hello"));
        assert!(!cache.is_fresh("note", "hello!"));
        assert!(!cache.is_fresh("description", "hello"));
        assert_eq!(cache.html("note"), Some("<p>hello</p>"));
    }

    #[test]
    fn notes_expose_only_their_note_field() {
        let note = Note::new(7, "text");

        assert_eq!(note.cache_key(), "note:7");
        assert_eq!(note.markdown("note"), Some("text"));
        assert_eq!(note.markdown("description"), None);
        assert!(!note.cached_html_up_to_date("note"));
    }
}
