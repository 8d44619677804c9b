//! `%v1.0`, `%"Q3 planning"` and `%2` milestones.

use html_escape::encode_text;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::cross_reference::ResolutionScope;
use crate::banzai::types::Record;

use super::{Linker, NAMESPACE_PATH, ReferenceSyntax, Resolved, parent_data, trimmed_candidates};

pub(super) struct MilestoneSyntax;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?:{NAMESPACE_PATH})?%(?:"(?P<quoted>[^"]+)"|(?P<iid>\d+)\b|(?P<name>[\w.?!:\-]+))"#
    ))
    .expect("milestone reference regex")
});

impl ReferenceSyntax for MilestoneSyntax {
    fn scope(&self) -> ResolutionScope {
        ResolutionScope::Namespaces
    }

    fn pattern(&self) -> &'static Regex {
        &PATTERN
    }

    fn resolve(&self, caps: &Captures<'_>, linker: &mut Linker<'_>) -> Option<Resolved> {
        let whole = caps.get(0)?;
        let parent = linker.parent(caps)?;
        let store = linker.store();

        let (milestone, consumed) = match caps.name("quoted").or_else(|| caps.name("iid")) {
            Some(exact) => (store.find_milestone(&parent, exact.as_str())?, whole.len()),
            None => {
                let name = caps.name("name")?;
                trimmed_candidates(name.as_str())
                    .into_iter()
                    .find_map(|candidate| {
                        store.find_milestone(&parent, candidate).map(|milestone| {
                            (milestone, name.start() - whole.start() + candidate.len())
                        })
                    })?
            }
        };

        let content = linker
            .foreign_parent_suffix(&parent)
            .map(|suffix| format!("%{}{suffix}", encode_text(&milestone.title)));

        Some(Resolved {
            href: linker.parent_url(&parent, &format!("milestones/{}", milestone.iid)),
            title: Some(milestone.title.clone()),
            class: "gfm gfm-milestone has-tooltip",
            data: vec![
                parent_data(&parent),
                ("data-milestone", milestone.id.to_string()),
            ],
            content,
            consumed,
            record: Record::Milestone(milestone).key(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{in_group, in_project, link};
    use crate::banzai::types::ReferenceType;
    use rstest::rstest;

    #[test]
    fn links_project_milestones_by_name_and_iid() {
        let (html, _) = link(
            ReferenceType::Milestone,
            "<p>Ship in %v1.0, or %1.</p>",
            in_project("gitlab-org/gitlab"),
        );

        assert_eq!(html.matches(r#"data-milestone="50""#).count(), 2);
        assert!(html.contains(r#"href="/gitlab-org/gitlab/-/milestones/1""#));
        assert!(html.contains(r#"data-original="%v1.0""#));
        assert!(html.contains(">%v1.0</a>, or"));
    }

    #[test]
    fn group_milestones_resolve_in_groups() {
        let (html, _) = link(
            ReferenceType::Milestone,
            "<p>%&quot;Q3 planning&quot;</p>",
            in_group("gitlab-org"),
        );

        assert!(html.contains(r#"href="/groups/gitlab-org/-/milestones/2""#));
        assert!(html.contains(r#"data-group="10" data-milestone="51""#));
    }

    #[test]
    fn percentages_stay_text() {
        let html = "<p>Done 50% and %nope</p>";
        let (out, _) = link(ReferenceType::Milestone, html, in_project("gitlab-org/gitlab"));
        assert_eq!(out, html);
    }

    #[rstest]
    #[case("gitlab-org/gitaly", "<p>gitlab-org/gitlab%v1.0</p>", ">%v1.0 <i>in gitlab-org/gitlab</i></a>")]
    #[case("gitlab-org/gitlab", "<p>gitlab-org/gitlab%v1.0</p>", ">gitlab-org/gitlab%v1.0</a>")]
    #[case("gitlab-org/gitaly", "<p>gitlab-org%&quot;Q3 planning&quot;</p>", ">%Q3 planning <i>in gitlab-org</i></a>")]
    fn milestones_from_other_parents_name_their_parent(
        #[case] context: &str,
        #[case] html: &str,
        #[case] expected: &str,
    ) {
        let (out, _) = link(ReferenceType::Milestone, html, in_project(context));

        assert!(out.contains(expected), "{out}");
    }
}
