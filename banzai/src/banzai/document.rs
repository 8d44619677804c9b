//! Rendered HTML documents and the reference nodes embedded in them.
//!
//! A [`Document`] owns one serialized HTML tree. Reference nodes are every
//! element carrying the `gfm` class and a `data-reference-type` attribute;
//! they are addressed by their position among reference nodes in document
//! order, which stays stable as long as the document is not rewritten.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use uuid::Uuid;

use crate::banzai::error::BanzaiError;
use crate::banzai::types::ReferenceType;

pub const REFERENCE_SELECTOR: &str = ".gfm[data-reference-type]";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Uuid);

impl DocumentId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Debug)]
pub struct Document {
    id: DocumentId,
    owner: Option<DocumentId>,
    html: String,
}

impl Document {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            id: DocumentId::generate(),
            owner: None,
            html: html.into(),
        }
    }

    /// A fragment carved out of `owner`; associations resolve to the whole document.
    pub fn fragment_of(owner: &Document, html: impl Into<String>) -> Self {
        Self {
            id: DocumentId::generate(),
            owner: Some(owner.owner_id()),
            html: html.into(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn owner_id(&self) -> DocumentId {
        self.owner.unwrap_or(self.id)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// All reference nodes, in document order.
    pub fn reference_nodes(&self) -> Result<Vec<ReferenceNode>, BanzaiError> {
        let nodes = RefCell::new(Vec::new());

        rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(REFERENCE_SELECTOR, |el| {
                    let mut nodes = nodes.borrow_mut();
                    let attributes = el
                        .attributes()
                        .iter()
                        .map(|attr| {
                            let value = decode_html_entities(&attr.value()).into_owned();
                            (attr.name(), value)
                        })
                        .collect();
                    let id = NodeId {
                        document: self.id,
                        index: nodes.len(),
                    };
                    nodes.push(ReferenceNode {
                        id,
                        owner: self.owner_id(),
                        attributes,
                    });
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )?;

        Ok(nodes.into_inner())
    }

    /// Apply `actions` (keyed by node index) to the reference nodes.
    pub fn rewrite_reference_nodes(
        &mut self,
        actions: &HashMap<usize, NodeAction>,
    ) -> Result<(), BanzaiError> {
        if actions.is_empty() {
            return Ok(());
        }

        let index = Cell::new(0usize);
        let html = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(REFERENCE_SELECTOR, |el| {
                    let current = index.get();
                    index.set(current + 1);

                    match actions.get(&current) {
                        Some(NodeAction::Replace(content)) => {
                            el.replace(content, ContentType::Html);
                        }
                        Some(NodeAction::SetContent(content)) => {
                            el.set_inner_content(content, ContentType::Html);
                        }
                        Some(NodeAction::Unwrap) => el.remove_and_keep_content(),
                        Some(NodeAction::StripTooltip) => {
                            el.remove_attribute("title");
                            if let Some(class) = el.get_attribute("class") {
                                el.set_attribute("class", &strip_tooltip_class(&class))?;
                            }
                        }
                        None => {}
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )?;

        self.html = html;
        Ok(())
    }
}

fn strip_tooltip_class(class: &str) -> String {
    class
        .split_whitespace()
        .filter(|c| *c != "has-tooltip")
        .collect::<Vec<_>>()
        .join(" ")
}

/// What to do with one reference node during a rewrite pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeAction {
    /// Replace the whole element with this HTML.
    Replace(String),
    /// Keep the element, replace its children with this HTML.
    SetContent(String),
    /// Drop the element but keep its children.
    Unwrap,
    /// Keep the link but remove the hover title.
    StripTooltip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub document: DocumentId,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceNode {
    id: NodeId,
    owner: DocumentId,
    attributes: BTreeMap<String, String>,
}

impl ReferenceNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The whole document this node belongs to.
    pub fn owner(&self) -> DocumentId {
        self.owner
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The raw `data-reference-type` value; may name an unknown type.
    pub fn reference_type(&self) -> &str {
        self.attr("data-reference-type").unwrap_or_default()
    }

    pub fn known_type(&self) -> Option<ReferenceType> {
        self.reference_type().parse().ok()
    }

    /// Numeric value of a `data-*` id attribute.
    pub fn id_attr(&self, name: &str) -> Option<u64> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn is_link_reference(&self) -> bool {
        self.attr("data-link-reference") == Some("true")
    }

    /// What a redacted node turns into.
    ///
    /// Link references become a plain anchor to their original href. Text
    /// references become their escaped original text; without original data
    /// the node is unwrapped to its inner HTML.
    pub fn redaction(&self) -> NodeAction {
        match (self.is_link_reference(), self.attr("data-original")) {
            (true, Some(text)) => {
                let href = self.attr("data-original-href").unwrap_or_default();
                NodeAction::Replace(format!(
                    r#"<a href="{}">{}</a>"#,
                    encode_double_quoted_attribute(href),
                    encode_text(text)
                ))
            }
            (false, Some(text)) => NodeAction::Replace(encode_text(text).into_owned()),
            (_, None) => NodeAction::Unwrap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HTML: &str = concat!(
        r#"<p>See <a class="gfm gfm-issue has-tooltip" data-reference-type="issue" "#,
        r##"data-issue="10" data-original="#5" title="Bug">#5</a> and "##,
        r#"<a class="gfm" data-reference-type="user" data-user="3">@ann</a> "#,
        r#"<a class="plain" data-reference-type="user">skip</a></p>"#
    );

    #[test]
    fn collects_typed_gfm_nodes_in_order() {
        let doc = Document::new(HTML);
        let nodes = doc.reference_nodes().unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id().index, 0);
        assert_eq!(nodes[0].reference_type(), "issue");
        assert_eq!(nodes[0].id_attr("data-issue"), Some(10));
        assert_eq!(nodes[0].attr("data-original"), Some("#5"));
        assert_eq!(nodes[1].known_type(), Some(ReferenceType::User));
    }

    #[test]
    fn fragments_share_their_owner() {
        let doc = Document::new(HTML);
        let fragment = Document::fragment_of(&doc, "<p></p>");
        let nested = Document::fragment_of(&fragment, "<p></p>");

        assert_ne!(fragment.id(), doc.id());
        assert_eq!(fragment.owner_id(), doc.id());
        assert_eq!(nested.owner_id(), doc.id());
    }

    #[test]
    fn rewrites_nodes_by_index() {
        let mut doc = Document::new(HTML);
        let actions = HashMap::from([
            (0, NodeAction::StripTooltip),
            (1, NodeAction::Unwrap),
        ]);

        doc.rewrite_reference_nodes(&actions).unwrap();

        assert!(doc.html().contains(r#"class="gfm gfm-issue""#));
        assert!(!doc.html().contains("title="));
        assert!(doc.html().contains(" and @ann "));
        assert_eq!(doc.reference_nodes().unwrap().len(), 1);
    }

    #[test]
    fn redaction_prefers_original_text() {
        let doc = Document::new(
            r#"<a class="gfm" data-reference-type="issue" data-original="&lt;b&gt;#1">x</a>"#,
        );
        let node = &doc.reference_nodes().unwrap()[0];

        assert_eq!(
            node.redaction(),
            NodeAction::Replace("&lt;b&gt;#1".to_string())
        );
    }

    #[test]
    fn redaction_rebuilds_link_references() {
        let doc = Document::new(concat!(
            r#"<a class="gfm" data-reference-type="issue" data-link-reference="true" "#,
            r##"data-original-href="#5" data-original="the bug" href="/a/b/-/issues/5">the bug</a>"##
        ));
        let node = &doc.reference_nodes().unwrap()[0];

        assert_eq!(
            node.redaction(),
            NodeAction::Replace(r##"<a href="#5">the bug</a>"##.to_string())
        );
    }
}
