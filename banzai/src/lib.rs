pub mod banzai;

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::banzai::types::Parent;
use crate::banzai::{BanzaiConfig, FilterContext, MemoryStore, Pipeline, Renderer, Services};

/// What the binary prints for one render.
#[derive(Debug, Serialize)]
pub struct RenderOutput {
    pub pipeline: String,
    pub html: String,
    pub total_reference_count: usize,
    pub visible_reference_count: usize,
    pub diagnostics: Vec<String>,
}

/// Render Markdown from stdin for the configured project and viewer and
/// print the result as JSON.
pub fn run() -> Result<()> {
    let config = BanzaiConfig::load();

    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("reading markdown from stdin")?;

    let output = render_with_config(&config, &text)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn render_with_config(config: &BanzaiConfig, text: &str) -> Result<RenderOutput> {
    let store = match &config.render.fixtures {
        Some(path) => MemoryStore::from_path(Path::new(path))?,
        None => MemoryStore::default(),
    };
    let store = Arc::new(store);

    let parent = match &config.render.project {
        Some(path) => Some(
            store
                .project(path)
                .map(Parent::Project)
                .or_else(|| store.group(path).map(Parent::Group))
                .with_context(|| format!("unknown project or group {path}"))?,
        ),
        None => None,
    };
    let viewer = match &config.render.viewer {
        Some(username) => Some(
            store
                .user(username)
                .with_context(|| format!("unknown viewer {username}"))?,
        ),
        None => None,
    };

    let renderer = Renderer::from_config(config, Services::from_memory(store.clone()))?;
    let mut context = FilterContext {
        pipeline: config.render.pipeline.clone(),
        ..FilterContext::default()
    };
    match parent {
        Some(Parent::Project(project)) => context.project = Some(project),
        Some(Parent::Group(group)) => context.group = Some(group),
        None => {}
    }

    let pipeline = Pipeline::get(context.pipeline.as_deref())?;
    info!(
        "Rendering {} bytes through the {} pipeline",
        text.len(),
        pipeline.name()
    );

    let rendered = renderer.render_result(text, &context)?;
    let processed = renderer.post_process_result(&rendered.output, &context.with_user(viewer))?;
    let (total, visible) = processed
        .redaction
        .as_ref()
        .map(|m| (m.total_reference_count, m.visible_reference_count))
        .unwrap_or_default();

    Ok(RenderOutput {
        pipeline: pipeline.name().to_string(),
        html: processed.output,
        total_reference_count: total,
        visible_reference_count: visible,
        diagnostics: rendered.diagnostics,
    })
}
