use anyhow::Result;
use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::banzai::error::BanzaiError;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Strips active content from user HTML.
///
/// This is a blocklist, not an allowlist: `REMOVED_ELEMENTS` are dropped
/// with their content, `on*` handlers and `style` attributes are removed,
/// and `href`/`src` values with a `javascript:`, `vbscript:` or `data:`
/// scheme are dropped. Other markup passes through unchanged.
///
/// Every `data-*` attribute goes too, so typed input can never pose as a
/// reference node; those are only created by the reference filters that
/// run after this one.
pub struct SanitizationFilter;

const REMOVED_ELEMENTS: &str = "script, style, iframe, object, embed, form, base, meta, link";
const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

impl Filter for SanitizationFilter {
    fn name(&self) -> &'static str {
        "sanitization"
    }

    fn call(&self, html: String, _env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        Ok(sanitize(&html)?)
    }
}

pub fn sanitize(html: &str) -> Result<String, BanzaiError> {
    let html = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(REMOVED_ELEMENTS, |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    let unsafe_attrs: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| {
                            name.starts_with("on") || name.starts_with("data-") || name == "style"
                        })
                        .collect();
                    for name in unsafe_attrs {
                        el.remove_attribute(&name);
                    }

                    for url_attr in ["href", "src"] {
                        if el.get_attribute(url_attr).is_some_and(|v| is_unsafe_url(&v)) {
                            el.remove_attribute(url_attr);
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(html)
}

fn is_unsafe_url(value: &str) -> bool {
    let normalized: String = html_escape::decode_html_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn removes_scripts_and_handlers() {
        let out = sanitize(r#"<p onclick="x()">hi<script>alert(1)</script></p>"#).unwrap();
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn forged_reference_nodes_lose_their_marker() {
        let out =
            sanitize(r#"<a class="gfm" data-reference-type="issue" data-issue="1">x</a>"#).unwrap();
        assert_eq!(out, r#"<a class="gfm">x</a>"#);
    }

    #[rstest]
    #[case("javascript:alert(1)")]
    #[case(" JaVaScRiPt:alert(1)")]
    #[case("java\tscript:alert(1)")]
    #[case("data:text/html,hi")]
    fn drops_unsafe_links(#[case] href: &str) {
        let out = sanitize(&format!(r#"<a href="{href}">x</a>"#)).unwrap();
        assert_eq!(out, "<a>x</a>");
    }

    #[test]
    fn removes_embedded_frames_with_their_content() {
        let out = sanitize(r#"<p>a<iframe src="https://x.test">b</iframe><object>c</object></p>"#)
            .unwrap();
        assert_eq!(out, "<p>a</p>");
    }

    #[test]
    fn keeps_ordinary_links() {
        let html = r#"<a href="https://example.com/a?b=1">x</a>"#;
        assert_eq!(sanitize(html).unwrap(), html);
    }
}
