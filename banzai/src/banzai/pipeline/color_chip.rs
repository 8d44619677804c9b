use anyhow::Result;
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::banzai::color::ColorParser;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Appends a swatch to inline code that holds exactly one color literal,
/// e.g. `` `#F00` `` or `` `rgba(0,0,0,0.5)` ``.
pub struct ColorChipFilter;

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<code>(?P<text>[^<]+)</code>").expect("inline code regex"));

impl Filter for ColorChipFilter {
    fn name(&self) -> &'static str {
        "color"
    }

    fn call(&self, html: String, _env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        Ok(INLINE_CODE
            .replace_all(&html, |caps: &Captures<'_>| {
                let raw = &caps["text"];
                let decoded = decode_html_entities(raw);
                match ColorParser::parse(&decoded) {
                    Some(color) => format!(
                        r#"<code>{raw}<span class="gfm-color_chip"><span style="background-color: {};"></span></span></code>"#,
                        encode_double_quoted_attribute(color)
                    ),
                    None => caps[0].to_string(),
                }
            })
            .into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banzai::context::FilterContext;
    use crate::banzai::store::{MemoryStore, Services};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn run(html: &str) -> String {
        let services = Services::from_memory(Arc::new(MemoryStore::default()));
        let context = FilterContext::default();
        ColorChipFilter
            .call(
                html.to_string(),
                &FilterEnv::new(&context, &services),
                &mut PipelineResult::default(),
            )
            .unwrap()
    }

    #[test]
    fn adds_chip_to_color_literals() {
        assert_eq!(
            run("<p><code>#F00</code></p>"),
            r#"<p><code>#F00<span class="gfm-color_chip"><span style="background-color: #F00;"></span></span></code></p>"#
        );
    }

    #[test]
    fn ignores_other_code() {
        let html = "<p><code>rgba(256,0,0,1)</code> <code>let x = 1;</code></p>";
        assert_eq!(run(html), html);
    }
}
