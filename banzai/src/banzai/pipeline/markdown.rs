use anyhow::Result;

use crate::banzai::error::BanzaiError;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// CommonMark + GFM to HTML.
pub struct MarkdownFilter;

impl Filter for MarkdownFilter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn call(&self, text: String, _env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        Ok(render_markdown(&text)?)
    }
}

pub fn render_markdown(text: &str) -> Result<String, BanzaiError> {
    markdown::to_html_with_options(
        text,
        &markdown::Options {
            // `~label ~other` must not turn into strikethrough.
            parse: markdown::ParseOptions {
                gfm_strikethrough_single_tilde: false,
                ..markdown::ParseOptions::gfm()
            },
            compile: markdown::CompileOptions {
                allow_dangerous_html: true,
                ..markdown::CompileOptions::gfm()
            },
        },
    )
    .map_err(|e| BanzaiError::Markdown(e.to_string()))
}
