#![allow(dead_code)]

use std::sync::Arc;

use banzai::banzai::cache::MemoryCache;
use banzai::banzai::instrumentation::RecordingSink;
use banzai::banzai::types::{Project, User};
use banzai::banzai::{FilterContext, MarkdownObject, MemoryStore, Renderer, Services};

pub const FIXTURE: &str = r##"
users:
  - { id: 1, username: ann, name: Ann Example }
  - { id: 2, username: unauthorized_user, name: Nobody Special, private_profile: true }
  - { id: 3, username: root, name: Administrator, admin: true }
groups:
  - { id: 10, full_path: gitlab-org, name: GitLab.org, visibility: public }
  - { id: 11, full_path: secret-group, name: Secret, visibility: private }
projects:
  - { id: 100, full_path: gitlab-org/gitlab, name: GitLab, group_id: 10, visibility: public }
  - { id: 101, full_path: gitlab-org/gitaly, name: Gitaly, group_id: 10, visibility: public }
  - { id: 102, full_path: secret-group/vault, name: Vault, group_id: 11, visibility: private }
issues:
  - { id: 1000, iid: 5, project_id: 100, title: Fix the bug }
  - { id: 1001, iid: 5, project_id: 101, title: Gitaly bug }
  - { id: 1002, iid: 6, project_id: 102, title: Secret plan }
labels:
  - { id: 40, title: bug, color: "#d9534f", project_id: 100 }
  - { id: 41, title: odd, color: "red; background: url(x)", project_id: 100 }
members:
  - { user: 1, project: 102 }
"##;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub sink: Arc<RecordingSink>,
    pub renderer: Renderer,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::from_yaml(FIXTURE).expect("fixture yaml"));
        let cache = Arc::new(MemoryCache::default());
        let sink = Arc::new(RecordingSink::default());
        let renderer = Renderer::new(
            Services::from_memory(store.clone()),
            cache.clone(),
            sink.clone(),
        );
        Self {
            store,
            cache,
            sink,
            renderer,
        }
    }

    pub fn project(&self, path: &str) -> Project {
        self.store.project(path).expect("fixture project")
    }

    pub fn user(&self, username: &str) -> User {
        self.store.user(username).expect("fixture user")
    }

    pub fn in_project(&self, path: &str) -> FilterContext {
        FilterContext::for_project(self.project(path))
    }
}

/// An issue-like object with two Markdown fields.
#[derive(Debug, Default)]
pub struct Ticket {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub title_html: Option<String>,
    pub description_html: Option<String>,
    pub project: Option<Project>,
    pub visible_references: Option<usize>,
}

impl Ticket {
    pub fn new(id: u64, title: &str, description: &str) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

impl MarkdownObject for Ticket {
    fn cache_key(&self) -> String {
        format!("ticket:{}", self.id)
    }

    fn markdown(&self, attribute: &str) -> Option<&str> {
        match attribute {
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            _ => None,
        }
    }

    fn set_rendered_html(&mut self, attribute: &str, html: String) {
        match attribute {
            "title" => self.title_html = Some(html),
            "description" => self.description_html = Some(html),
            _ => {}
        }
    }

    fn set_user_visible_reference_count(&mut self, count: usize) {
        self.visible_references = Some(count);
    }

    fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    fn render_context(&self, attribute: &str) -> FilterContext {
        let pipeline = if attribute == "title" {
            "single_line"
        } else {
            "full"
        };
        FilterContext::default().with_pipeline(pipeline)
    }
}
