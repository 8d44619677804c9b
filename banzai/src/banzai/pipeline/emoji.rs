use anyhow::Result;
use html_escape::encode_double_quoted_attribute;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::text_nodes::{IGNORED_ANCESTORS, replace_matches, replace_text};
use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// `:shortcode:` to `<gl-emoji>`; unknown shortcodes stay as typed.
pub struct EmojiFilter;

// Matches :shortcode: with lowercase letters, digits, underscores, plus, or minus.
static SHORTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([a-z0-9_+\-]+):").expect("emoji shortcode regex"));

impl Filter for EmojiFilter {
    fn name(&self) -> &'static str {
        "emoji"
    }

    fn call(&self, html: String, _env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        if !html.contains(':') {
            return Ok(html);
        }
        replace_text(&html, IGNORED_ANCESTORS, |text| {
            Ok(replace_matches(text, &SHORTCODE, emoji_tag))
        })
    }
}

fn emoji_tag(caps: &Captures<'_>) -> Option<String> {
    let code = &caps[1];
    let emoji = emojis::get_by_shortcode(code)?;
    Some(format!(
        r#"<gl-emoji title="{}" data-name="{}">{}</gl-emoji>"#,
        encode_double_quoted_attribute(emoji.name()),
        encode_double_quoted_attribute(code),
        emoji.as_str()
    ))
}
