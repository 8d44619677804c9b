use anyhow::Result;

use crate::banzai::context::{RenderContext, RenderOptions};
use crate::banzai::document::Document;
use crate::banzai::redactor::ReferenceRedactor;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Redacts reference nodes for `current_user` unless the context opts out.
pub struct RedactorFilter;

impl Filter for RedactorFilter {
    fn name(&self) -> &'static str {
        "redactor"
    }

    fn call(&self, html: String, env: &FilterEnv<'_>, result: &mut PipelineResult) -> Result<String> {
        if env.context.skip_redaction {
            return Ok(html);
        }

        let context = RenderContext::new(
            env.context.parent(),
            env.context.current_user.clone(),
            RenderOptions {
                no_original_data: env.context.no_original_data,
                only_path: env.context.only_path,
            },
        );
        let mut documents = [Document::new(html)];
        let metadata = ReferenceRedactor::new(&context, env.services).redact(&mut documents)?;
        result.redaction = metadata.into_iter().next();

        let [document] = documents;
        Ok(document.into_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banzai::context::FilterContext;
    use crate::banzai::reference_parser::test_support::services;

    const HTML: &str = r#"<p><a href="/secret-group/vault/-/issues/6" data-reference-type="issue" data-original="secret-group/vault#6" data-issue="1002" class="gfm">secret-group/vault#6</a></p>"#;

    #[test]
    fn redacts_for_the_current_user_and_reports_counts() {
        let (_, services) = services();
        let context = FilterContext::default();
        let mut result = PipelineResult::default();

        let html = RedactorFilter
            .call(HTML.to_string(), &FilterEnv::new(&context, &services), &mut result)
            .unwrap();

        assert_eq!(html, "<p>secret-group/vault#6</p>");
        let metadata = result.redaction.unwrap();
        assert_eq!(metadata.total_reference_count, 1);
        assert_eq!(metadata.visible_reference_count, 0);
    }

    #[test]
    fn skip_redaction_leaves_html_alone() {
        let (_, services) = services();
        let context = FilterContext {
            skip_redaction: true,
            ..FilterContext::default()
        };
        let mut result = PipelineResult::default();

        let html = RedactorFilter
            .call(HTML.to_string(), &FilterEnv::new(&context, &services), &mut result)
            .unwrap();

        assert_eq!(html, HTML);
        assert_eq!(result.redaction, None);
    }
}
