use std::collections::HashMap;

use crate::banzai::document::{Document, DocumentId, ReferenceNode};
use crate::banzai::object_renderer::MarkdownObject;
use crate::banzai::types::{Group, Parent, Project, User};

/// Options threaded through a render call.
///
/// This is the per-call bag filters read from: who is rendering, for which
/// parent, which pipeline, and how links should look.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterContext {
    pub project: Option<Project>,
    pub group: Option<Group>,
    pub current_user: Option<User>,
    pub author: Option<User>,
    pub pipeline: Option<String>,
    pub cache_key: Option<Vec<String>>,
    pub only_path: bool,
    pub base_url: String,
    pub no_original_data: bool,
    pub requested_path: Option<String>,
    pub ref_name: Option<String>,
    pub skip_redaction: bool,
}

impl FilterContext {
    pub fn for_project(project: Project) -> Self {
        Self {
            project: Some(project),
            only_path: true,
            ..Self::default()
        }
    }

    pub fn for_group(group: Group) -> Self {
        Self {
            group: Some(group),
            only_path: true,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: Option<User>) -> Self {
        self.current_user = user;
        self
    }

    pub fn with_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn with_cache_key<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache_key = Some(parts.into_iter().map(Into::into).collect());
        self
    }

    /// The default parent references resolve against.
    pub fn parent(&self) -> Option<Parent> {
        self.project
            .clone()
            .map(Parent::Project)
            .or_else(|| self.group.clone().map(Parent::Group))
    }

    /// Prefix for generated links.
    pub fn url_base(&self) -> &str {
        if self.only_path {
            ""
        } else {
            self.base_url.trim_end_matches('/')
        }
    }

    /// Layer `other` over `self`; set fields in `other` win.
    pub fn merge(mut self, other: &FilterContext) -> Self {
        if other.project.is_some() {
            self.project = other.project.clone();
        }
        if other.group.is_some() {
            self.group = other.group.clone();
        }
        if other.current_user.is_some() {
            self.current_user = other.current_user.clone();
        }
        if other.author.is_some() {
            self.author = other.author.clone();
        }
        if other.pipeline.is_some() {
            self.pipeline = other.pipeline.clone();
        }
        if other.cache_key.is_some() {
            self.cache_key = other.cache_key.clone();
        }
        if other.requested_path.is_some() {
            self.requested_path = other.requested_path.clone();
        }
        if other.ref_name.is_some() {
            self.ref_name = other.ref_name.clone();
        }
        if !other.base_url.is_empty() {
            self.base_url = other.base_url.clone();
        }
        self.only_path |= other.only_path;
        self.no_original_data |= other.no_original_data;
        self.skip_redaction |= other.skip_redaction;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub no_original_data: bool,
    pub only_path: bool,
}

/// Ambient state for resolving and redacting references across a batch of
/// documents.
#[derive(Clone, Debug, Default)]
pub struct RenderContext {
    parent: Option<Parent>,
    current_user: Option<User>,
    options: RenderOptions,
    projects: HashMap<DocumentId, Project>,
}

impl RenderContext {
    pub fn new(parent: Option<Parent>, current_user: Option<User>, options: RenderOptions) -> Self {
        Self {
            parent,
            current_user,
            options,
            projects: HashMap::new(),
        }
    }

    pub fn parent(&self) -> Option<&Parent> {
        self.parent.as_ref()
    }

    pub fn project(&self) -> Option<&Project> {
        self.parent.as_ref().and_then(Parent::project)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Record `object`'s project as the owner of `document`. Objects without
    /// a project leave the document on the default project.
    pub fn associate_document<O>(&mut self, document: &Document, object: &O)
    where
        O: MarkdownObject + ?Sized,
    {
        if let Some(project) = object.project() {
            self.projects.insert(document.owner_id(), project.clone());
        }
    }

    pub fn project_for_node(&self, node: &ReferenceNode) -> Option<&Project> {
        self.projects.get(&node.owner()).or_else(|| self.project())
    }
}
