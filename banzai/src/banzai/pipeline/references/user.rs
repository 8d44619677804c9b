//! `@username` and `@group/path` mentions.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::types::Record;

use super::{Linker, ReferenceSyntax, Resolved, trimmed_candidates};

pub(super) struct UserSyntax;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(?P<user>[A-Za-z0-9_][\w.\-]*(?:/[\w.\-]+)*)").expect("user reference regex")
});

const CLASS: &str = "gfm gfm-project_member js-user-link";

impl ReferenceSyntax for UserSyntax {
    fn pattern(&self) -> &'static Regex {
        &PATTERN
    }

    fn resolve(&self, caps: &Captures<'_>, linker: &mut Linker<'_>) -> Option<Resolved> {
        let whole = caps.get(0)?;
        let name = caps.name("user")?;
        let store = linker.store();

        for candidate in trimmed_candidates(name.as_str()) {
            let consumed = name.start() - whole.start() + candidate.len();

            if let Some(user) = store.find_user_by_username(candidate) {
                return Some(Resolved {
                    href: linker.url(&format!("/{}", user.username)),
                    title: Some(user.name.clone()),
                    class: CLASS,
                    data: vec![("data-user", user.id.to_string())],
                    content: None,
                    consumed,
                    record: Record::User(user).key(),
                });
            }
            if let Some(group) = store.find_group_by_full_path(candidate) {
                return Some(Resolved {
                    href: linker.url(&format!("/{}", group.full_path)),
                    title: Some(group.name.clone()),
                    class: CLASS,
                    data: vec![("data-group", group.id.to_string())],
                    content: None,
                    consumed,
                    record: Record::Group(group).key(),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{in_project, link};
    use crate::banzai::types::ReferenceType;
    use pretty_assertions::assert_eq;

    #[test]
    fn links_users_and_keeps_trailing_punctuation_outside() {
        let (html, _) = link(
            ReferenceType::User,
            "<p>Thanks @ann!</p>",
            in_project("gitlab-org/gitlab"),
        );

        assert_eq!(
            html,
            concat!(
                r#"<p>Thanks <a href="/ann" data-reference-type="user" data-original="@ann" "#,
                r#"data-user="1" title="Ann Example" "#,
                r#"class="gfm gfm-project_member js-user-link">@ann</a>!</p>"#
            )
        );
    }

    #[test]
    fn group_mentions_carry_data_group() {
        let (html, _) = link(
            ReferenceType::User,
            "<p>cc @gitlab-org</p>",
            in_project("gitlab-org/gitlab"),
        );

        assert!(html.contains(r#"data-reference-type="user""#));
        assert!(html.contains(r#"data-group="10""#));
        assert!(html.contains(r#"href="/gitlab-org""#));
    }

    #[test]
    fn unknown_users_and_email_addresses_stay_text() {
        let html = "<p>@nobody mail ann@example.com</p>";
        let (out, result) = link(ReferenceType::User, html, in_project("gitlab-org/gitlab"));

        assert_eq!(out, html);
        assert!(result.references.is_empty());
    }
}
