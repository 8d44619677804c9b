//! Collaborators for record lookups and permission checks.

pub mod memory;

use std::sync::Arc;

use crate::banzai::types::{
    Commit, Epic, Group, Issue, Label, MergeRequest, Milestone, Parent, Project, ProjectId,
    Record, ReferenceType, User,
};

pub use memory::MemoryStore;

/// Read access to the records references point at.
///
/// The `find_*` lookups serve the reference filters while linking; the
/// batched `find_records`/`find_commits` serve the reference parsers, which
/// must resolve a whole type group in one call.
pub trait DataStore: Send + Sync {
    fn find_project_by_full_path(&self, path: &str) -> Option<Project>;
    fn find_group_by_full_path(&self, path: &str) -> Option<Group>;
    fn find_user_by_username(&self, username: &str) -> Option<User>;
    fn find_issue(&self, project: ProjectId, iid: u64) -> Option<Issue>;
    fn find_merge_request(&self, project: ProjectId, iid: u64) -> Option<MergeRequest>;
    fn find_epic(&self, group: &Group, iid: u64) -> Option<Epic>;
    fn find_commit(&self, project: ProjectId, sha_prefix: &str) -> Option<Commit>;
    /// Label by title (or id, when `name` is numeric), falling back to the
    /// labels of the parent's ancestor groups.
    fn find_label(&self, parent: &Parent, name: &str) -> Option<Label>;
    /// Milestone by title, or by iid when `name` is numeric.
    fn find_milestone(&self, parent: &Parent, name: &str) -> Option<Milestone>;

    /// Records of `kind` with the given ids. Users also resolve groups and
    /// projects through [`DataStore::find_namespaces`].
    fn find_records(&self, kind: ReferenceType, ids: &[u64]) -> Vec<Record>;
    fn find_namespaces(&self, group_ids: &[u64], project_ids: &[u64]) -> Vec<Record>;
    fn find_commits(&self, project: ProjectId, shas: &[String]) -> Vec<Commit>;
}

/// Black-box permission checks.
pub trait Authorizer: Send + Sync {
    fn can_read(&self, user: Option<&User>, record: &Record) -> bool;

    /// Batched visibility, one flag per record in input order.
    fn visible(&self, user: Option<&User>, records: &[&Record]) -> Vec<bool> {
        records.iter().map(|r| self.can_read(user, r)).collect()
    }

    /// Whether the user may see details of records outside the current project.
    fn can_read_cross_project(&self, user: Option<&User>) -> bool {
        user.map(|u| u.can_read_cross_project).unwrap_or(true)
    }
}

/// The collaborators a render call reaches through.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DataStore>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl Services {
    pub fn new(store: Arc<dyn DataStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }

    /// One [`MemoryStore`] serving as both store and authorizer.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            store: store.clone(),
            authorizer: store,
        }
    }
}
