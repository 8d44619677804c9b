use anyhow::Result;

use super::{FilterEnv, PipelineResult};

/// One HTML-to-HTML step of a pipeline.
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    fn call(&self, html: String, env: &FilterEnv<'_>, result: &mut PipelineResult)
    -> Result<String>;
}
