//! A small GitLab-shaped world shared by unit tests.

use crate::banzai::store::MemoryStore;

pub const FIXTURE: &str = r##"
users:
  - { id: 1, username: ann, name: Ann Example }
  - { id: 2, username: bob, name: Bob Example }
  - { id: 3, username: root, name: Administrator, admin: true }
  - { id: 4, username: hidden, name: Hidden Person, private_profile: true }
  - { id: 5, username: outsider, name: Outsider, can_read_cross_project: false }
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
  - { id: 1003, iid: 7, project_id: 100, title: Embargoed, confidential: true, author_id: 2 }
merge_requests:
  - { id: 2000, iid: 7, project_id: 100, title: Add feature }
  - { id: 2001, iid: 1, project_id: 102, title: Rotate keys }
epics:
  - { id: 3000, iid: 1, group_id: 10, title: Roadmap }
commits:
  - { sha: 0123456789abcdef0123456789abcdef01234567, project_id: 100, title: Initial commit }
  - { sha: fedcba9876543210fedcba9876543210fedcba98, project_id: 101, title: Gitaly commit }
labels:
  - { id: 40, title: bug, color: "#d9534f", project_id: 100, description: Something is broken }
  - { id: 41, title: feature request, color: "#428bca", group_id: 10 }
  - { id: 42, title: odd, color: "red; background: url(x)", project_id: 100 }
milestones:
  - { id: 50, iid: 1, title: v1.0, project_id: 100 }
  - { id: 51, iid: 2, title: Q3 planning, group_id: 10 }
members:
  - { user: 1, project: 102 }
"##;

pub fn fixture_store() -> MemoryStore {
    MemoryStore::from_yaml(FIXTURE).expect("fixture yaml")
}
