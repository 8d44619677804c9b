//! `#5` issues, `!7` merge requests and `&1` epics, optionally prefixed
//! with the path of the project (or group, for epics) they live in. A
//! trailing `+` on issues and merge requests asks for the title to be
//! expanded after redaction.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::cross_reference::ResolutionScope;
use crate::banzai::types::{Record, ReferenceType};

use super::super::issuable_expansion::FORMAT_ATTRIBUTE;
use super::{Linker, NAMESPACE_PATH, PROJECT_PATH, ReferenceSyntax, Resolved, parent_data};

pub(super) struct IssuableSyntax {
    kind: ReferenceType,
}

pub(super) static ISSUE: IssuableSyntax = IssuableSyntax {
    kind: ReferenceType::Issue,
};
pub(super) static MERGE_REQUEST: IssuableSyntax = IssuableSyntax {
    kind: ReferenceType::MergeRequest,
};
pub(super) static EPIC: IssuableSyntax = IssuableSyntax {
    kind: ReferenceType::Epic,
};

static ISSUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:{PROJECT_PATH})?#(?P<iid>\d+)\b(?P<format>\+)?"))
        .expect("issue reference regex")
});

static MERGE_REQUEST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:{PROJECT_PATH})?!(?P<iid>\d+)\b(?P<format>\+)?"))
        .expect("merge request reference regex")
});

static EPIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:{NAMESPACE_PATH})?&(?P<iid>\d+)\b")).expect("epic reference regex")
});

impl ReferenceSyntax for IssuableSyntax {
    fn scope(&self) -> ResolutionScope {
        match self.kind {
            ReferenceType::Epic => ResolutionScope::Namespaces,
            _ => ResolutionScope::Projects,
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self.kind {
            ReferenceType::MergeRequest => &MERGE_REQUEST_PATTERN,
            ReferenceType::Epic => &EPIC_PATTERN,
            _ => &ISSUE_PATTERN,
        }
    }

    fn resolve(&self, caps: &Captures<'_>, linker: &mut Linker<'_>) -> Option<Resolved> {
        let iid: u64 = caps["iid"].parse().ok()?;
        let consumed = caps.get(0)?.len();
        let parent = linker.parent(caps)?;
        let store = linker.store();

        let (record, section, title, class) = match self.kind {
            ReferenceType::Epic => {
                let epic = store.find_epic(parent.group()?, iid)?;
                let title = epic.title.clone();
                (Record::Epic(epic), "epics", title, "gfm gfm-epic has-tooltip")
            }
            ReferenceType::MergeRequest => {
                let mr = store.find_merge_request(parent.project()?.id, iid)?;
                let title = mr.title.clone();
                (
                    Record::MergeRequest(mr),
                    "merge_requests",
                    title,
                    "gfm gfm-merge_request has-tooltip",
                )
            }
            _ => {
                let issue = store.find_issue(parent.project()?.id, iid)?;
                let title = issue.title.clone();
                (Record::Issue(issue), "issues", title, "gfm gfm-issue has-tooltip")
            }
        };

        let record_id = match &record {
            Record::Epic(r) => r.id,
            Record::MergeRequest(r) => r.id,
            Record::Issue(r) => r.id,
            _ => return None,
        };

        let mut data = vec![
            parent_data(&parent),
            (self.kind.data_attribute(), record_id.to_string()),
        ];
        if caps.name("format").is_some() {
            data.push((FORMAT_ATTRIBUTE, "+".to_string()));
        }

        Some(Resolved {
            record: record.key(),
            href: linker.parent_url(&parent, &format!("{section}/{iid}")),
            title: Some(title),
            class,
            data,
            content: None,
            consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{in_group, in_project, link};
    use crate::banzai::types::{RecordKey, ReferenceType};
    use pretty_assertions::assert_eq;

    #[test]
    fn links_issue_in_context_project() {
        let (html, result) = link(
            ReferenceType::Issue,
            "<p>See #5</p>",
            in_project("gitlab-org/gitlab"),
        );

        assert_eq!(
            html,
            concat!(
                r##"<p>See <a href="/gitlab-org/gitlab/-/issues/5" data-reference-type="issue" "##,
                r##"data-original="#5" data-project="100" data-issue="1000" title="Fix the bug" "##,
                r##"class="gfm gfm-issue has-tooltip">#5</a></p>"##
            )
        );
        assert_eq!(
            result.references,
            vec![(ReferenceType::Issue, RecordKey::Id("issue", 1000))]
        );
    }

    #[test]
    fn explicit_project_path_wins() {
        let (html, _) = link(
            ReferenceType::Issue,
            "<p>gitlab-org/gitaly#5</p>",
            in_project("gitlab-org/gitlab"),
        );

        assert!(html.contains(r#"href="/gitlab-org/gitaly/-/issues/5""#));
        assert!(html.contains(r#"data-issue="1001""#));
        assert!(html.contains(">gitlab-org/gitaly#5</a>"));
    }

    #[test]
    fn missing_issues_stay_text() {
        let html = "<p>#404 and word#5</p>";
        let (out, _) = link(ReferenceType::Issue, html, in_project("gitlab-org/gitlab"));
        assert_eq!(out, html);
    }

    #[test]
    fn unknown_project_paths_are_not_linked() {
        let html = "<p>nobody/nothing#5</p>";
        let (out, result) = link(ReferenceType::Issue, html, in_project("gitlab-org/gitlab"));

        assert_eq!(out, html);
        assert!(result.references.is_empty());
    }

    #[test]
    fn links_merge_requests() {
        let (html, _) = link(
            ReferenceType::MergeRequest,
            "<p>!7</p>",
            in_project("gitlab-org/gitlab"),
        );
        assert!(html.contains(r#"data-merge-request="2000""#));
        assert!(html.contains(r#"href="/gitlab-org/gitlab/-/merge_requests/7""#));
    }

    #[test]
    fn marks_expandable_references() {
        let (html, _) = link(
            ReferenceType::Issue,
            "<p>#5+</p>",
            in_project("gitlab-org/gitlab"),
        );
        assert!(html.contains(r#"data-issue="1000" data-reference-format="+""#));
        assert!(html.contains(">#5+</a>"));
    }

    #[test]
    fn links_epics_in_group_scope() {
        let (html, _) = link(ReferenceType::Epic, "<p>&amp;1</p>", in_group("gitlab-org"));
        assert!(html.contains(r#"href="/groups/gitlab-org/-/epics/1""#));
        assert!(html.contains(r#"data-group="10" data-epic="3000""#));
        assert!(html.contains(">&amp;1</a>"));
    }

    #[test]
    fn epics_accept_an_explicit_group() {
        let (html, _) = link(
            ReferenceType::Epic,
            "<p>gitlab-org&amp;1</p>",
            in_project("secret-group/vault"),
        );
        assert!(html.contains(r#"data-epic="3000""#));
    }
}
