use anyhow::Result;
use lol_html::html_content::Element;
use lol_html::{HandlerResult, RewriteStrSettings, element, rewrite_str};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::banzai::context::FilterContext;
use crate::banzai::error::BanzaiError;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Rewrites repository-relative `href`/`src` values to project URLs.
///
/// `docs/setup.md` rendered from `README.md` on `main` becomes
/// `/group/project/-/blob/main/docs/setup.md`; images point at `/-/raw/`.
/// Without a project in the context links are left alone.
pub struct RelativeLinkFilter;

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("url scheme regex"));

impl Filter for RelativeLinkFilter {
    fn name(&self) -> &'static str {
        "relative_link"
    }

    fn call(&self, html: String, env: &FilterEnv<'_>, _result: &mut PipelineResult) -> Result<String> {
        if env.context.project.is_none() {
            return Ok(html);
        }
        Ok(rewrite_relative_links(&html, env.context)?)
    }
}

fn rewrite_relative_links(html: &str, context: &FilterContext) -> Result<String, BanzaiError> {
    let html = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("a[href]", |el| rewrite_attr(el, "href", "blob", context)),
                element!("img[src], video[src], audio[src]", |el| {
                    rewrite_attr(el, "src", "raw", context)
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(html)
}

fn rewrite_attr(
    el: &mut Element<'_, '_>,
    attr: &str,
    mode: &str,
    context: &FilterContext,
) -> HandlerResult {
    if let Some(url) = el
        .get_attribute(attr)
        .and_then(|value| project_url(context, &value, mode))
    {
        el.set_attribute(attr, &url)?;
    }
    Ok(())
}

fn is_relative(value: &str) -> bool {
    !(value.is_empty()
        || value.starts_with('/')
        || value.starts_with('#')
        || value.starts_with('?')
        || SCHEME.is_match(value))
}

fn project_url(context: &FilterContext, value: &str, mode: &str) -> Option<String> {
    if !is_relative(value) {
        return None;
    }
    let project = context.project.as_ref()?;
    let ref_name = context
        .ref_name
        .as_deref()
        .unwrap_or(&project.default_branch);

    let (path, suffix) = split_suffix(value);
    let base_dir = context
        .requested_path
        .as_deref()
        .map(|p| {
            if p.ends_with('/') {
                p.trim_end_matches('/')
            } else {
                p.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
            }
        })
        .unwrap_or("");
    let joined = normalize_path(&format!("{base_dir}/{path}"));

    Some(format!(
        "{}/{}/-/{mode}/{ref_name}/{joined}{suffix}",
        context.url_base(),
        project.full_path
    ))
}

/// Split off a `?query` or `#fragment` tail.
fn split_suffix(value: &str) -> (&str, &str) {
    match value.find(['?', '#']) {
        Some(at) => value.split_at(at),
        None => (value, ""),
    }
}

/// Resolve `.` and `..` segments; `..` never climbs above the repository root.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
