use anyhow::Result;

use super::traits::Filter;
use super::{FilterEnv, PipelineResult};

/// Turns a leading front matter block into a fenced code block so it shows
/// up as highlighted source instead of a stray paragraph.
pub struct FrontMatterFilter;

const DELIMITERS: &[(&str, &str)] = &[("---", "yaml"), ("+++", "toml"), (";;;", "json")];

impl Filter for FrontMatterFilter {
    fn name(&self) -> &'static str {
        "front_matter"
    }

    fn call(&self, text: String, _env: &FilterEnv<'_>, result: &mut PipelineResult) -> Result<String> {
        let mut lines = text.lines();
        let Some(first) = lines.next().map(str::trim_end) else {
            return Ok(text);
        };
        let Some(&(delimiter, lang)) = DELIMITERS.iter().find(|(d, _)| *d == first) else {
            return Ok(text);
        };

        let mut body = vec![];
        let mut closed = false;
        for line in lines.by_ref() {
            if line.trim_end() == delimiter {
                closed = true;
                break;
            }
            body.push(line);
        }
        if !closed {
            return Ok(text);
        }

        let body = body.join("\n");
        let remainder = lines.collect::<Vec<&str>>().join("\n");

        if lang == "yaml" {
            if let Err(err) = serde_yaml::from_str::<serde_yaml::Value>(&body) {
                result
                    .diagnostics
                    .push(format!("front matter is not valid YAML: {err}"));
            }
        }

        let fence = "`".repeat(longest_backtick_run(&body).max(2) + 1);
        Ok(format!("{fence}{lang}\n{body}\n{fence}\n\n{remainder}"))
    }
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banzai::context::FilterContext;
    use crate::banzai::store::{MemoryStore, Services};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn run(text: &str) -> (String, PipelineResult) {
        let services = Services::from_memory(Arc::new(MemoryStore::default()));
        let context = FilterContext::default();
        let env = FilterEnv::new(&context, &services);
        let mut result = PipelineResult::default();
        let out = FrontMatterFilter
            .call(text.to_string(), &env, &mut result)
            .unwrap();
        (out, result)
    }

    #[test]
    fn fences_yaml_front_matter() {
        let (out, result) = run("---\ntitle: Hello\n---\n# Body");
        assert_eq!(out, "```yaml\ntitle: Hello\n```\n\n# Body");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn toml_uses_its_own_language() {
        let (out, _) = run("+++\ntitle = \"x\"\n+++\nbody");
        assert!(out.starts_with("```toml\n"));
    }

    #[test]
    fn unterminated_block_is_left_alone() {
        let (out, _) = run("---\ntitle: Hello\nbody");
        assert_eq!(out, "---\ntitle: Hello\nbody");
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let (_, result) = run("---\n: : :\n  - [\n---\n");
        assert_eq!(result.diagnostics.len(), 1);
    }
}
