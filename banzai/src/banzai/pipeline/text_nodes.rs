//! Text-node rewriting for filters that link or decorate plain text.

use anyhow::Result;
use html_escape::{decode_html_entities, encode_text};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Elements whose text is never rewritten.
pub const IGNORED_ANCESTORS: &[&str] = &["pre", "code", "a", "style", "script"];

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)(?:[^>"']|"[^"]*"|'[^']*')*>"#)
        .expect("html tag regex")
});

/// Rewrite every text node outside `ignored` elements.
///
/// `replace` receives the decoded text and returns replacement HTML, or
/// `None` to keep the node as it was.
pub fn replace_text<F>(html: &str, ignored: &[&str], mut replace: F) -> Result<String>
where
    F: FnMut(&str) -> Result<Option<String>>,
{
    let mut out = String::with_capacity(html.len());
    let mut depth = 0usize;
    let mut last = 0;

    for caps in TAG.captures_iter(html) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        push_text(&mut out, &html[last..tag.start()], depth, &mut replace)?;
        out.push_str(tag.as_str());
        last = tag.end();

        let Some(name) = caps.get(2) else {
            continue;
        };
        if !ignored
            .iter()
            .any(|i| i.eq_ignore_ascii_case(name.as_str()))
        {
            continue;
        }
        let closing = caps.get(1).is_some_and(|c| !c.as_str().is_empty());
        if closing {
            depth = depth.saturating_sub(1);
        } else if !tag.as_str().ends_with("/>") {
            depth += 1;
        }
    }

    push_text(&mut out, &html[last..], depth, &mut replace)?;
    Ok(out)
}

fn push_text<F>(out: &mut String, raw: &str, depth: usize, replace: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Result<Option<String>>,
{
    if depth > 0 || raw.trim().is_empty() {
        out.push_str(raw);
        return Ok(());
    }
    let decoded = decode_html_entities(raw);
    match replace(decoded.as_ref())? {
        Some(html) => out.push_str(&html),
        None => out.push_str(raw),
    }
    Ok(())
}

/// Replace matches of `pattern` in plain `text` with the HTML `link`
/// returns. Matches directly preceded by a word character are skipped.
/// Returns `None` when nothing was replaced.
pub fn replace_matches<F>(text: &str, pattern: &Regex, mut link: F) -> Option<String>
where
    F: FnMut(&Captures<'_>) -> Option<String>,
{
    let mut out = String::new();
    let mut last = 0;
    let mut changed = false;

    for caps in pattern.captures_iter(text) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        let preceded_by_word = text[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if preceded_by_word {
            continue;
        }
        if let Some(html) = link(&caps) {
            out.push_str(&encode_text(&text[last..m.start()]));
            out.push_str(&html);
            last = m.end();
            changed = true;
        }
    }

    if !changed {
        return None;
    }
    out.push_str(&encode_text(&text[last..]));
    Some(out)
}

/// Text content of an HTML fragment, decoded.
pub fn plain_text(html: &str) -> String {
    decode_html_entities(&TAG.replace_all(html, "")).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shout(text: &str) -> Result<Option<String>> {
        Ok(text
            .contains("hi")
            .then(|| encode_text(&text.replace("hi", "HI")).into_owned()))
    }

    #[test]
    fn skips_ignored_elements() {
        let html = "<p>hi <code>hi</code> <a href=\"x\">hi <em>hi</em></a> hi</p>";
        let out = replace_text(html, IGNORED_ANCESTORS, shout).unwrap();

        assert_eq!(
            out,
            "<p>HI <code>hi</code> <a href=\"x\">hi <em>hi</em></a> HI</p>"
        );
    }

    #[test]
    fn decodes_and_reencodes_text() {
        let out = replace_text("<p>hi &amp; &lt;b&gt;</p>", IGNORED_ANCESTORS, shout).unwrap();
        assert_eq!(out, "<p>HI &amp; &lt;b&gt;</p>");
    }

    #[test]
    fn quoted_attributes_may_contain_brackets() {
        let html = r#"<p title="a > hi">hi</p>"#;
        let out = replace_text(html, IGNORED_ANCESTORS, shout).unwrap();
        assert_eq!(out, r#"<p title="a > hi">HI</p>"#);
    }

    #[test]
    fn word_prefixed_matches_are_skipped() {
        let pattern = Regex::new(r"#\d+").unwrap();
        let out = replace_matches("a#1 #2", &pattern, |caps| Some(format!("[{}]", &caps[0])));
        assert_eq!(out.as_deref(), Some("a#1 [#2]"));
        assert_eq!(replace_matches("a#1", &pattern, |_| Some(String::new())), None);
    }

    #[test]
    fn strips_tags_for_plain_text() {
        assert_eq!(plain_text("<em>the</em> &amp; bug"), "the & bug");
    }
}
