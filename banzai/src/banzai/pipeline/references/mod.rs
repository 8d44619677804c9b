//! Reference filters.
//!
//! Each filter links one kind of reference in text nodes (`#5`, `!7`, `&1`,
//! `@ann`, `~bug`, `%v1.0`, commit SHAs) and in anchors whose `href` is
//! itself a reference (`[the bug](#5)`). Linked anchors become reference
//! nodes: they carry the `gfm` class, `data-reference-type`, the record id
//! in `data-<type>` and the text they replaced in `data-original`.

mod commit;
mod issuable;
mod label;
mod milestone;
mod user;

use anyhow::Result;
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::context::FilterContext;
use crate::banzai::cross_reference::{ParentResolver, ResolutionScope};
use crate::banzai::store::DataStore;
use crate::banzai::types::{Parent, RecordKey, ReferenceType};

use super::text_nodes::{IGNORED_ANCESTORS, plain_text, replace_matches, replace_text};
use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Path prefix of a project-scoped reference: `group/project`.
pub(crate) const PROJECT_PATH: &str = r"(?P<path>[A-Za-z_][\w.\-]*(?:/[\w.\-]+)+)";
/// Path prefix of a namespace-scoped reference: a group or a project.
pub(crate) const NAMESPACE_PATH: &str = r"(?P<path>[A-Za-z_][\w.\-]*(?:/[\w.\-]+)*)";

const TRAILING_PUNCTUATION: [char; 5] = ['.', ',', '!', '?', ':'];

/// A reference that resolved to a record.
pub(crate) struct Resolved {
    pub record: RecordKey,
    pub href: String,
    pub title: Option<String>,
    pub class: &'static str,
    pub data: Vec<(&'static str, String)>,
    /// Inner HTML to render instead of the escaped reference text.
    pub content: Option<String>,
    /// Bytes of the match that belong to the reference; the rest is
    /// trailing text.
    pub consumed: usize,
}

pub(crate) trait ReferenceSyntax: Send + Sync {
    fn scope(&self) -> ResolutionScope {
        ResolutionScope::Projects
    }

    fn pattern(&self) -> &'static Regex;

    fn resolve(&self, caps: &Captures<'_>, linker: &mut Linker<'_>) -> Option<Resolved>;
}

fn syntax_for(kind: ReferenceType) -> &'static dyn ReferenceSyntax {
    match kind {
        ReferenceType::Issue => &issuable::ISSUE,
        ReferenceType::MergeRequest => &issuable::MERGE_REQUEST,
        ReferenceType::Epic => &issuable::EPIC,
        ReferenceType::User => &user::UserSyntax,
        ReferenceType::Commit => &commit::CommitSyntax,
        ReferenceType::Label => &label::LabelSyntax,
        ReferenceType::Milestone => &milestone::MilestoneSyntax,
    }
}

/// Per-call resolution state shared by one filter run.
pub(crate) struct Linker<'a> {
    env: FilterEnv<'a>,
    resolver: ParentResolver<'a>,
    linked: Vec<(ReferenceType, RecordKey)>,
}

impl<'a> Linker<'a> {
    fn new(env: FilterEnv<'a>, scope: ResolutionScope) -> Self {
        let services = env.services;
        Self {
            env,
            resolver: ParentResolver::new(&*services.store, env.context.parent(), scope),
            linked: Vec::new(),
        }
    }

    pub fn store(&self) -> &'a dyn DataStore {
        let services = self.env.services;
        &*services.store
    }

    pub fn context(&self) -> &'a FilterContext {
        self.env.context
    }

    /// Parent for an optional explicit path.
    pub fn parent(&mut self, caps: &Captures<'_>) -> Option<Parent> {
        self.resolver.resolve(caps.name("path").map(|m| m.as_str()))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.env.context.url_base(), path)
    }

    /// ` <i>in group/project</i>` when `parent` is not the context's own.
    pub fn foreign_parent_suffix(&self, parent: &Parent) -> Option<String> {
        match self.env.context.parent() {
            Some(own) if own.full_path() == parent.full_path() => None,
            _ => Some(format!(" <i>in {}</i>", encode_text(parent.full_path()))),
        }
    }

    /// URL of `section` under a project or group.
    pub fn parent_url(&self, parent: &Parent, section: &str) -> String {
        match parent {
            Parent::Project(p) => self.url(&format!("/{}/-/{section}", p.full_path)),
            Parent::Group(g) => self.url(&format!("/groups/{}/-/{section}", g.full_path)),
        }
    }
}

/// `data-project` or `data-group` for a parent.
pub(crate) fn parent_data(parent: &Parent) -> (&'static str, String) {
    match parent {
        Parent::Project(p) => ("data-project", p.id.to_string()),
        Parent::Group(g) => ("data-group", g.id.to_string()),
    }
}

/// `name`, then `name` with trailing punctuation removed one char at a time.
pub(crate) fn trimmed_candidates(name: &str) -> Vec<&str> {
    let mut candidates = vec![name];
    let mut current = name;
    while let Some(shorter) = current.strip_suffix(TRAILING_PUNCTUATION) {
        if shorter.is_empty() {
            break;
        }
        candidates.push(shorter);
        current = shorter;
    }
    candidates
}

/// Links references of one type.
pub struct ReferenceFilter {
    kind: ReferenceType,
}

impl ReferenceFilter {
    pub fn new(kind: ReferenceType) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ReferenceType {
        self.kind
    }
}

impl Filter for ReferenceFilter {
    fn name(&self) -> &'static str {
        match self.kind {
            ReferenceType::Issue => "issue_reference",
            ReferenceType::MergeRequest => "merge_request_reference",
            ReferenceType::Epic => "epic_reference",
            ReferenceType::User => "user_reference",
            ReferenceType::Commit => "commit_reference",
            ReferenceType::Label => "label_reference",
            ReferenceType::Milestone => "milestone_reference",
        }
    }

    fn call(&self, html: String, env: &FilterEnv<'_>, result: &mut PipelineResult) -> Result<String> {
        let syntax = syntax_for(self.kind);
        let mut linker = Linker::new(*env, syntax.scope());

        let html = link_anchor_references(&html, self.kind, syntax, &mut linker);
        let html = replace_text(&html, IGNORED_ANCESTORS, |text| {
            Ok(replace_matches(text, syntax.pattern(), |caps| {
                let matched = caps.get(0)?.as_str();
                let resolved = syntax.resolve(caps, &mut linker)?;
                let reference = matched.get(..resolved.consumed)?;
                let trailing = &matched[resolved.consumed..];

                let inner = resolved
                    .content
                    .clone()
                    .unwrap_or_else(|| encode_text(reference).into_owned());
                let anchor =
                    render_anchor(self.kind, &resolved, &inner, reference, None, env.context);
                linker.linked.push((self.kind, resolved.record));
                Some(format!("{anchor}{}", encode_text(trailing)))
            }))
        })?;

        if !linker.linked.is_empty() {
            log::trace!("{}: linked {} references", self.name(), linker.linked.len());
        }
        result.references.extend(linker.linked);
        Ok(html)
    }
}

static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a\s(?P<attrs>(?:[^>"']|"[^"]*"|'[^']*')*)>(?P<inner>.*?)</a>"#)
        .expect("anchor regex")
});

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|\s)href\s*=\s*"(?P<value>[^"]*)""#).expect("href regex"));

/// Turn `<a href="#5">text</a>` into a reference node when the whole href
/// is a reference that resolves.
fn link_anchor_references(
    html: &str,
    kind: ReferenceType,
    syntax: &dyn ReferenceSyntax,
    linker: &mut Linker<'_>,
) -> String {
    if !html.contains("<a") {
        return html.to_string();
    }
    let context = linker.context();

    ANCHOR
        .replace_all(html, |caps: &Captures<'_>| {
            let whole = caps[0].to_string();
            let attrs = &caps["attrs"];
            if attrs.contains("data-reference-type") {
                return whole;
            }
            let Some(href) = HREF
                .captures(attrs)
                .map(|h| decode_html_entities(&h["value"]).into_owned())
            else {
                return whole;
            };
            let Some(reference) = syntax.pattern().captures(&href) else {
                return whole;
            };
            let spans_href = reference
                .get(0)
                .is_some_and(|m| m.start() == 0 && m.end() == href.len());
            if !spans_href {
                return whole;
            }
            let Some(resolved) = syntax.resolve(&reference, linker) else {
                return whole;
            };
            if resolved.consumed != href.len() {
                return whole;
            }

            let inner = &caps["inner"];
            let anchor =
                render_anchor(kind, &resolved, inner, &plain_text(inner), Some(&href), context);
            linker.linked.push((kind, resolved.record));
            anchor
        })
        .into_owned()
}

fn render_anchor(
    kind: ReferenceType,
    resolved: &Resolved,
    inner_html: &str,
    original: &str,
    original_href: Option<&str>,
    context: &FilterContext,
) -> String {
    let mut attrs: Vec<(&str, String)> = vec![
        ("href", resolved.href.clone()),
        ("data-reference-type", kind.as_str().to_string()),
    ];
    if !context.no_original_data {
        attrs.push(("data-original", original.to_string()));
    }
    if let Some(href) = original_href {
        attrs.push(("data-link-reference", "true".to_string()));
        attrs.push(("data-original-href", href.to_string()));
    }
    attrs.extend(resolved.data.iter().map(|(k, v)| (*k, v.clone())));
    if let Some(title) = &resolved.title {
        attrs.push(("title", title.clone()));
    }
    attrs.push(("class", resolved.class.to_string()));

    let attrs = attrs
        .iter()
        .map(|(name, value)| format!(r#"{name}="{}""#, encode_double_quoted_attribute(value)))
        .collect::<Vec<_>>()
        .join(" ");
    format!("<a {attrs}>{inner_html}</a>")
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::banzai::document::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn trims_trailing_punctuation_candidates() {
        assert_eq!(trimmed_candidates("v1.0.!"), vec!["v1.0.!", "v1.0.", "v1.0"]);
        assert_eq!(trimmed_candidates("."), vec!["."]);
    }

    #[test]
    fn links_become_reference_nodes() {
        let (html, _) = link(
            ReferenceType::Issue,
            "<p>See #5.</p>",
            in_project("gitlab-org/gitlab"),
        );
        let nodes = Document::new(html).reference_nodes().unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].attr("data-original"), Some("#5"));
        assert_eq!(nodes[0].id_attr("data-issue"), Some(1000));
        assert_eq!(nodes[0].id_attr("data-project"), Some(100));
    }

    #[test]
    fn anchors_with_reference_hrefs_become_link_references() {
        let (html, result) = link(
            ReferenceType::Issue,
            r##"<p><a href="#5">the <em>bug</em></a></p>"##,
            in_project("gitlab-org/gitlab"),
        );
        let nodes = Document::new(html.clone()).reference_nodes().unwrap();

        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_link_reference());
        assert_eq!(nodes[0].attr("data-original-href"), Some("#5"));
        assert_eq!(nodes[0].attr("data-original"), Some("the bug"));
        assert!(html.contains(">the <em>bug</em></a>"));
        assert_eq!(result.references.len(), 1);
    }

    #[test]
    fn ignores_code_and_existing_links() {
        let html = r#"<pre><code>#5</code></pre><p><code>#5</code> <a href="/x">#5</a></p>"#;
        let (out, result) = link(ReferenceType::Issue, html, in_project("gitlab-org/gitlab"));

        assert_eq!(out, html);
        assert!(result.references.is_empty());
    }

    #[test]
    fn no_original_data_omits_the_attribute() {
        let mut context = in_project("gitlab-org/gitlab");
        context.no_original_data = true;
        let (html, _) = link(ReferenceType::Issue, "<p>#5</p>", context);

        assert!(!html.contains("data-original"));
    }

    #[test]
    fn absolute_urls_outside_only_path() {
        let mut context = in_project("gitlab-org/gitlab");
        context.only_path = false;
        context.base_url = "https://gitlab.example.com".into();
        let (html, _) = link(ReferenceType::Issue, "<p>#5</p>", context);

        assert!(html.contains(r#"href="https://gitlab.example.com/gitlab-org/gitlab/-/issues/5""#));
    }
}
