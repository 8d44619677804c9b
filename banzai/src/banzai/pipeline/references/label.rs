//! `~bug`, `~"feature request"` and `~40` labels.

use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::color::ColorParser;
use crate::banzai::types::{Label, Record};

use super::{Linker, PROJECT_PATH, ReferenceSyntax, Resolved, trimmed_candidates};

pub(super) struct LabelSyntax;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?:{PROJECT_PATH})?~(?:"(?P<quoted>[^"]+)"|(?P<id>\d+)\b|(?P<name>[\w.?!:\-]+))"#
    ))
    .expect("label reference regex")
});

impl ReferenceSyntax for LabelSyntax {
    fn pattern(&self) -> &'static Regex {
        &PATTERN
    }

    fn resolve(&self, caps: &Captures<'_>, linker: &mut Linker<'_>) -> Option<Resolved> {
        let whole = caps.get(0)?;
        let parent = linker.parent(caps)?;
        let store = linker.store();

        let (label, consumed) = match caps.name("quoted").or_else(|| caps.name("id")) {
            Some(exact) => (store.find_label(&parent, exact.as_str())?, whole.len()),
            None => {
                let name = caps.name("name")?;
                trimmed_candidates(name.as_str())
                    .into_iter()
                    .find_map(|candidate| {
                        store
                            .find_label(&parent, candidate)
                            .map(|label| (label, name.start() - whole.start() + candidate.len()))
                    })?
            }
        };

        let href = linker.parent_url(
            &parent,
            &format!("issues?label_name[]={}", urlencoding::encode(&label.title)),
        );
        let mut data = Vec::with_capacity(2);
        match (label.project_id, label.group_id) {
            (Some(project), _) => data.push(("data-project", project.to_string())),
            (None, Some(group)) => data.push(("data-group", group.to_string())),
            (None, None) => {}
        }
        data.push(("data-label", label.id.to_string()));

        Some(Resolved {
            href,
            title: label.description.clone(),
            class: "gfm gfm-label has-tooltip gl-link gl-label-link",
            data,
            content: Some(format!(
                "{}{}",
                label_span(&label),
                linker.foreign_parent_suffix(&parent).unwrap_or_default()
            )),
            consumed,
            record: Record::Label(label).key(),
        })
    }
}

/// The colored label pill; colors that do not parse render without a style.
fn label_span(label: &Label) -> String {
    let title = encode_text(&label.title);
    match ColorParser::parse(&label.color) {
        Some(color) => format!(
            r#"<span class="gl-label-text" style="background-color: {}">{title}</span>"#,
            encode_double_quoted_attribute(color)
        ),
        None => format!(r#"<span class="gl-label-text">{title}</span>"#),
    }
}
