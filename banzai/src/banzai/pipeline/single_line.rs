use anyhow::Result;
use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::banzai::error::BanzaiError;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Flattens block paragraphs for one-line contexts such as titles.
pub struct SingleLineFilter;

impl Filter for SingleLineFilter {
    fn name(&self) -> &'static str {
        "single_line"
    }

    fn call(&self, html: String, _env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        let flattened = rewrite_str(
            &html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("p", |el| {
                    el.remove_and_keep_content();
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(BanzaiError::from)?;
        Ok(flattened.lines().map(str::trim).collect::<Vec<_>>().join(" "))
    }
}
