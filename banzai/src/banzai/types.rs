use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::banzai::error::BanzaiError;

pub type ProjectId = u64;
pub type GroupId = u64;
pub type UserId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub private_profile: bool,
    #[serde(default = "default_true")]
    pub can_read_cross_project: bool,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id,
            name: username.clone(),
            username,
            admin: false,
            private_profile: false,
            can_read_cross_project: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub full_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub full_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".into()
}

/// The owner of a reference lookup: either a project or a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parent {
    Project(Project),
    Group(Group),
}

impl Parent {
    pub fn full_path(&self) -> &str {
        match self {
            Parent::Project(p) => &p.full_path,
            Parent::Group(g) => &g.full_path,
        }
    }

    pub fn project(&self) -> Option<&Project> {
        match self {
            Parent::Project(p) => Some(p),
            Parent::Group(_) => None,
        }
    }

    pub fn group(&self) -> Option<&Group> {
        match self {
            Parent::Group(g) => Some(g),
            Parent::Project(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub iid: u64,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub confidential: bool,
    #[serde(default)]
    pub author_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: u64,
    pub iid: u64,
    pub project_id: ProjectId,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub id: u64,
    pub iid: u64,
    pub group_id: GroupId,
    pub title: String,
    #[serde(default)]
    pub confidential: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub project_id: ProjectId,
    #[serde(default)]
    pub title: String,
}

impl Commit {
    pub fn short_id(&self) -> &str {
        &self.sha[..self.sha.len().min(8)]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub title: String,
    #[serde(default = "default_label_color")]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

fn default_label_color() -> String {
    "#6699cc".into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// Every kind of reference a GFM document can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Issue,
    MergeRequest,
    Epic,
    User,
    Commit,
    Label,
    Milestone,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 7] = [
        ReferenceType::Issue,
        ReferenceType::MergeRequest,
        ReferenceType::Epic,
        ReferenceType::User,
        ReferenceType::Commit,
        ReferenceType::Label,
        ReferenceType::Milestone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Issue => "issue",
            ReferenceType::MergeRequest => "merge_request",
            ReferenceType::Epic => "epic",
            ReferenceType::User => "user",
            ReferenceType::Commit => "commit",
            ReferenceType::Label => "label",
            ReferenceType::Milestone => "milestone",
        }
    }

    /// Attribute holding the record id on a reference node (`data-issue`, ...).
    pub fn data_attribute(&self) -> &'static str {
        match self {
            ReferenceType::Issue => "data-issue",
            ReferenceType::MergeRequest => "data-merge-request",
            ReferenceType::Epic => "data-epic",
            ReferenceType::User => "data-user",
            ReferenceType::Commit => "data-commit",
            ReferenceType::Label => "data-label",
            ReferenceType::Milestone => "data-milestone",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = BanzaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BanzaiError::InvalidReferenceType(s.to_string()))
    }
}

/// A resolved backing record of a reference node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Issue(Issue),
    MergeRequest(MergeRequest),
    Epic(Epic),
    User(User),
    Group(Group),
    Project(Project),
    Commit(Commit),
    Label(Label),
    Milestone(Milestone),
}

/// Stable identity of a record, used for deduplication.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Id(&'static str, u64),
    Commit(ProjectId, String),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Issue(r) => RecordKey::Id("issue", r.id),
            Record::MergeRequest(r) => RecordKey::Id("merge_request", r.id),
            Record::Epic(r) => RecordKey::Id("epic", r.id),
            Record::User(r) => RecordKey::Id("user", r.id),
            Record::Group(r) => RecordKey::Id("group", r.id),
            Record::Project(r) => RecordKey::Id("project", r.id),
            Record::Commit(r) => RecordKey::Commit(r.project_id, r.sha.clone()),
            Record::Label(r) => RecordKey::Id("label", r.id),
            Record::Milestone(r) => RecordKey::Id("milestone", r.id),
        }
    }

    /// Numeric id; commits are addressed by SHA instead.
    pub fn id(&self) -> Option<u64> {
        match self {
            Record::Issue(r) => Some(r.id),
            Record::MergeRequest(r) => Some(r.id),
            Record::Epic(r) => Some(r.id),
            Record::User(r) => Some(r.id),
            Record::Group(r) => Some(r.id),
            Record::Project(r) => Some(r.id),
            Record::Label(r) => Some(r.id),
            Record::Milestone(r) => Some(r.id),
            Record::Commit(_) => None,
        }
    }

    /// Project the record lives in, for project-scoped records.
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Record::Issue(r) => Some(r.project_id),
            Record::MergeRequest(r) => Some(r.project_id),
            Record::Commit(r) => Some(r.project_id),
            Record::Label(r) => r.project_id,
            Record::Milestone(r) => r.project_id,
            Record::Project(r) => Some(r.id),
            Record::Epic(_) | Record::User(_) | Record::Group(_) => None,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Record::Issue(r) => &r.title,
            Record::MergeRequest(r) => &r.title,
            Record::Epic(r) => &r.title,
            Record::User(r) => &r.name,
            Record::Group(r) => &r.name,
            Record::Project(r) => &r.name,
            Record::Commit(r) => &r.title,
            Record::Label(r) => &r.title,
            Record::Milestone(r) => &r.title,
        }
    }
}
