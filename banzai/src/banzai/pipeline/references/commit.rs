//! Commit SHAs, bare or as `group/project@sha`.

use html_escape::encode_text;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::types::Record;

use super::{Linker, PROJECT_PATH, ReferenceSyntax, Resolved, parent_data};

pub(super) struct CommitSyntax;

/// A bare `@` before the SHA is captured as `at` so `user@deadbeef1` and
/// `@deadbeef1` are claimed and left alone.
static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:{PROJECT_PATH}@|(?P<at>@))?\b(?P<sha>[0-9a-f]{{7,40}})\b"
    ))
    .expect("commit reference regex")
});

impl ReferenceSyntax for CommitSyntax {
    fn pattern(&self) -> &'static Regex {
        &PATTERN
    }

    fn resolve(&self, caps: &Captures<'_>, linker: &mut Linker<'_>) -> Option<Resolved> {
        if caps.name("at").is_some() {
            return None;
        }
        let consumed = caps.get(0)?.len();
        let parent = linker.parent(caps)?;
        let commit = linker
            .store()
            .find_commit(parent.project()?.id, &caps["sha"])?;

        let label = match caps.name("path") {
            Some(path) => format!("{}@{}", path.as_str(), commit.short_id()),
            None => commit.short_id().to_string(),
        };

        Some(Resolved {
            href: linker.parent_url(&parent, &format!("commit/{}", commit.sha)),
            title: Some(commit.title.clone()),
            class: "gfm gfm-commit has-tooltip",
            data: vec![parent_data(&parent), ("data-commit", commit.sha.clone())],
            content: Some(encode_text(&label).into_owned()),
            consumed,
            record: Record::Commit(commit).key(),
        })
    }
}
