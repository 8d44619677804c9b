use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{Authorizer, DataStore};
use crate::banzai::types::{
    Commit, Epic, Group, GroupId, Issue, Label, MergeRequest, Milestone, Parent, Project,
    ProjectId, Record, ReferenceType, User, UserId, Visibility,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Membership {
    pub user: UserId,
    #[serde(default)]
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub group: Option<GroupId>,
}

/// Everything a [`MemoryStore`] knows, as loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub merge_requests: Vec<MergeRequest>,
    #[serde(default)]
    pub epics: Vec<Epic>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub members: Vec<Membership>,
}

/// An in-process [`DataStore`] and [`Authorizer`] over a [`Fixture`].
///
/// Group membership is inherited by subgroups and projects. Batched lookups
/// are counted so callers can assert that a pass stayed batched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Fixture,
    batch_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(data: Fixture) -> Self {
        Self {
            data,
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        let data: Fixture = serde_yaml::from_str(source).context("parsing fixture yaml")?;
        Ok(Self::new(data))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading fixtures at {}", path.display()))?;
        Self::from_yaml(&source)
    }

    pub fn fixture(&self) -> &Fixture {
        &self.data
    }

    /// Number of batched record lookups served so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }

    pub fn user(&self, username: &str) -> Option<User> {
        self.find_user_by_username(username)
    }

    pub fn project(&self, full_path: &str) -> Option<Project> {
        self.find_project_by_full_path(full_path)
    }

    pub fn group(&self, full_path: &str) -> Option<Group> {
        self.find_group_by_full_path(full_path)
    }

    fn group_by_id(&self, id: GroupId) -> Option<&Group> {
        self.data.groups.iter().find(|g| g.id == id)
    }

    fn project_by_id(&self, id: ProjectId) -> Option<&Project> {
        self.data.projects.iter().find(|p| p.id == id)
    }

    /// `group` followed by its ancestors, nearest first.
    fn group_chain(&self, group: &Group) -> Vec<&Group> {
        let mut chain: Vec<&Group> = self
            .data
            .groups
            .iter()
            .filter(|g| {
                g.full_path == group.full_path
                    || group.full_path.starts_with(&format!("{}/", g.full_path))
            })
            .collect();
        chain.sort_by_key(|g| std::cmp::Reverse(g.full_path.len()));
        chain
    }

    fn project_groups(&self, project: &Project) -> Vec<&Group> {
        project
            .group_id
            .and_then(|id| self.group_by_id(id))
            .map(|g| self.group_chain(g))
            .unwrap_or_default()
    }

    fn parent_groups(&self, parent: &Parent) -> Vec<&Group> {
        match parent {
            Parent::Project(p) => self.project_groups(p),
            Parent::Group(g) => self.group_chain(g),
        }
    }

    fn is_group_member(&self, user: UserId, group: &Group) -> bool {
        self.group_chain(group).iter().any(|g| {
            self.data
                .members
                .iter()
                .any(|m| m.user == user && m.group == Some(g.id))
        })
    }

    fn is_project_member(&self, user: UserId, project: &Project) -> bool {
        let direct = self
            .data
            .members
            .iter()
            .any(|m| m.user == user && m.project == Some(project.id));
        direct
            || self
                .project_groups(project)
                .iter()
                .any(|g| self.is_group_member(user, g))
    }

    fn allowed(user: Option<&User>, visibility: Visibility, member: bool) -> bool {
        if user.is_some_and(|u| u.admin) || member {
            return true;
        }
        match visibility {
            Visibility::Public => true,
            Visibility::Internal => user.is_some(),
            Visibility::Private => false,
        }
    }

    fn can_read_project(&self, user: Option<&User>, id: ProjectId) -> bool {
        let Some(project) = self.project_by_id(id) else {
            return false;
        };
        let member = user.is_some_and(|u| self.is_project_member(u.id, project));
        Self::allowed(user, project.visibility, member)
    }

    fn can_read_group(&self, user: Option<&User>, id: GroupId) -> bool {
        let Some(group) = self.group_by_id(id) else {
            return false;
        };
        let member = user.is_some_and(|u| self.is_group_member(u.id, group));
        Self::allowed(user, group.visibility, member)
    }

    fn can_read_scoped(
        &self,
        user: Option<&User>,
        project: Option<ProjectId>,
        group: Option<GroupId>,
    ) -> bool {
        match (project, group) {
            (Some(p), _) => self.can_read_project(user, p),
            (None, Some(g)) => self.can_read_group(user, g),
            (None, None) => false,
        }
    }
}

impl DataStore for MemoryStore {
    fn find_project_by_full_path(&self, path: &str) -> Option<Project> {
        self.data
            .projects
            .iter()
            .find(|p| p.full_path.eq_ignore_ascii_case(path))
            .cloned()
    }

    fn find_group_by_full_path(&self, path: &str) -> Option<Group> {
        self.data
            .groups
            .iter()
            .find(|g| g.full_path.eq_ignore_ascii_case(path))
            .cloned()
    }

    fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.data
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned()
    }

    fn find_issue(&self, project: ProjectId, iid: u64) -> Option<Issue> {
        self.data
            .issues
            .iter()
            .find(|i| i.project_id == project && i.iid == iid)
            .cloned()
    }

    fn find_merge_request(&self, project: ProjectId, iid: u64) -> Option<MergeRequest> {
        self.data
            .merge_requests
            .iter()
            .find(|mr| mr.project_id == project && mr.iid == iid)
            .cloned()
    }

    fn find_epic(&self, group: &Group, iid: u64) -> Option<Epic> {
        self.data
            .epics
            .iter()
            .find(|e| e.group_id == group.id && e.iid == iid)
            .cloned()
    }

    fn find_commit(&self, project: ProjectId, sha_prefix: &str) -> Option<Commit> {
        if sha_prefix.len() < 7 {
            return None;
        }
        self.data
            .commits
            .iter()
            .find(|c| c.project_id == project && c.sha.starts_with(sha_prefix))
            .cloned()
    }

    fn find_label(&self, parent: &Parent, name: &str) -> Option<Label> {
        let groups = self.parent_groups(parent);
        let in_scope = |label: &&Label| {
            let own = match parent {
                Parent::Project(p) => label.project_id == Some(p.id),
                Parent::Group(_) => false,
            };
            own || label
                .group_id
                .is_some_and(|gid| groups.iter().any(|g| g.id == gid))
        };
        let by_id = name.parse::<u64>().ok();

        self.data
            .labels
            .iter()
            .filter(in_scope)
            .find(|l| by_id == Some(l.id))
            .or_else(|| self.data.labels.iter().filter(in_scope).find(|l| l.title == name))
            .cloned()
    }

    fn find_milestone(&self, parent: &Parent, name: &str) -> Option<Milestone> {
        let groups = self.parent_groups(parent);
        let in_scope = |m: &&Milestone| {
            let own = match parent {
                Parent::Project(p) => m.project_id == Some(p.id),
                Parent::Group(_) => false,
            };
            own || m
                .group_id
                .is_some_and(|gid| groups.iter().any(|g| g.id == gid))
        };
        let by_iid = name.parse::<u64>().ok();

        self.data
            .milestones
            .iter()
            .filter(in_scope)
            .find(|m| by_iid == Some(m.iid))
            .or_else(|| {
                self.data
                    .milestones
                    .iter()
                    .filter(in_scope)
                    .find(|m| m.title == name)
            })
            .cloned()
    }

    fn find_records(&self, kind: ReferenceType, ids: &[u64]) -> Vec<Record> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        let d = &self.data;
        match kind {
            ReferenceType::Issue => d
                .issues
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(Record::Issue)
                .collect(),
            ReferenceType::MergeRequest => d
                .merge_requests
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(Record::MergeRequest)
                .collect(),
            ReferenceType::Epic => d
                .epics
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(Record::Epic)
                .collect(),
            ReferenceType::User => d
                .users
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(Record::User)
                .collect(),
            ReferenceType::Label => d
                .labels
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(Record::Label)
                .collect(),
            ReferenceType::Milestone => d
                .milestones
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(Record::Milestone)
                .collect(),
            ReferenceType::Commit => Vec::new(),
        }
    }

    fn find_namespaces(&self, group_ids: &[u64], project_ids: &[u64]) -> Vec<Record> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        let groups = self
            .data
            .groups
            .iter()
            .filter(|g| group_ids.contains(&g.id))
            .cloned()
            .map(Record::Group);
        let projects = self
            .data
            .projects
            .iter()
            .filter(|p| project_ids.contains(&p.id))
            .cloned()
            .map(Record::Project);
        groups.chain(projects).collect()
    }

    fn find_commits(&self, project: ProjectId, shas: &[String]) -> Vec<Commit> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        self.data
            .commits
            .iter()
            .filter(|c| c.project_id == project && shas.contains(&c.sha))
            .cloned()
            .collect()
    }
}

impl Authorizer for MemoryStore {
    fn can_read(&self, user: Option<&User>, record: &Record) -> bool {
        match record {
            Record::Project(p) => self.can_read_project(user, p.id),
            Record::Group(g) => self.can_read_group(user, g.id),
            Record::MergeRequest(mr) => self.can_read_project(user, mr.project_id),
            Record::Commit(c) => self.can_read_project(user, c.project_id),
            Record::Issue(issue) => {
                if !self.can_read_project(user, issue.project_id) {
                    return false;
                }
                if !issue.confidential {
                    return true;
                }
                user.is_some_and(|u| {
                    u.admin
                        || issue.author_id == Some(u.id)
                        || self
                            .project_by_id(issue.project_id)
                            .is_some_and(|p| self.is_project_member(u.id, p))
                })
            }
            Record::Epic(epic) => {
                if !self.can_read_group(user, epic.group_id) {
                    return false;
                }
                !epic.confidential
                    || user.is_some_and(|u| {
                        u.admin
                            || self
                                .group_by_id(epic.group_id)
                                .is_some_and(|g| self.is_group_member(u.id, g))
                    })
            }
            Record::User(target) => {
                !target.private_profile || user.is_some_and(|u| u.admin || u.id == target.id)
            }
            Record::Label(label) => self.can_read_scoped(user, label.project_id, label.group_id),
            Record::Milestone(m) => self.can_read_scoped(user, m.project_id, m.group_id),
        }
    }
}
