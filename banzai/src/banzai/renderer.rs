use std::collections::HashMap;
use std::iter;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::banzai::cache::{self, CacheKey, CacheStore};
use crate::banzai::config::BanzaiConfig;
use crate::banzai::context::FilterContext;
use crate::banzai::error::BanzaiError;
use crate::banzai::instrumentation::{InstrumentationSink, LogSink, NullSink};
use crate::banzai::object_renderer::MarkdownObject;
use crate::banzai::pipeline::{FilterEnv, Pipeline, PipelineExecutor, PipelineKind, PipelineResult};
use crate::banzai::reference_extractor::ReferenceExtractor;
use crate::banzai::store::Services;

pub const CACHE_NAMESPACE: &str = "banzai";

/// One input of a batch render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderItem {
    pub text: String,
    pub context: FilterContext,
}

impl RenderItem {
    pub fn new(text: impl Into<String>, context: FilterContext) -> Self {
        Self {
            text: text.into(),
            context,
        }
    }
}

/// Entry point for turning Markdown into HTML.
///
/// Output is cached before redaction, keyed by
/// `["banzai", *cache_key, pipeline]`, so one entry serves every viewer.
/// [`Renderer::post_process`] applies the viewer-specific part.
pub struct Renderer {
    services: Services,
    cache: Arc<dyn CacheStore>,
    executor: PipelineExecutor,
    defaults: FilterContext,
}

impl Renderer {
    pub fn new(services: Services, cache: Arc<dyn CacheStore>, sink: Arc<dyn InstrumentationSink>) -> Self {
        Self {
            services,
            cache,
            executor: PipelineExecutor::new(sink),
            defaults: FilterContext::default(),
        }
    }

    pub fn from_config(config: &BanzaiConfig, services: Services) -> Result<Self> {
        let cache = cache::build_cache(&config.cache).context("building render cache")?;
        let sink: Arc<dyn InstrumentationSink> = if config.instrumentation {
            Arc::new(LogSink)
        } else {
            Arc::new(NullSink)
        };

        Ok(Self::new(services, cache, sink).with_defaults(FilterContext {
            base_url: config.base_url.clone(),
            only_path: config.only_path,
            ..FilterContext::default()
        }))
    }

    /// Context every render starts from; per-call contexts are layered on top.
    pub fn with_defaults(mut self, defaults: FilterContext) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn reference_extractor(&self) -> ReferenceExtractor<'_> {
        ReferenceExtractor::new(self)
    }

    /// Render `text`, reading and filling the cache when the context has a key.
    pub fn render(&self, text: &str, context: &FilterContext) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let Some(key) = self.cache_key(context)? else {
            return self.cacheless_render(text, context);
        };

        if let Some(html) = self.cache.get(&key)? {
            log::trace!("cache hit for {}", key.expanded());
            return Ok(html);
        }
        let html = self.cacheless_render(text, context)?;
        self.cache.set(&key, &html)?;
        Ok(html)
    }

    pub fn cacheless_render(&self, text: &str, context: &FilterContext) -> Result<String> {
        Ok(self.render_result(text, context)?.output)
    }

    /// Run the context's pipeline and keep everything the filters collected.
    pub fn render_result(&self, text: &str, context: &FilterContext) -> Result<PipelineResult> {
        let pipeline = Pipeline::get(context.pipeline.as_deref())?;
        self.run(pipeline.kind(), text, context)
    }

    /// HTML for `field` of `object`.
    ///
    /// Objects with their own markdown cache are refreshed when stale and
    /// answer from it; anything else is rendered without the shared cache.
    pub fn render_field<O>(&self, object: &mut O, field: &str, context: &FilterContext) -> Result<String>
    where
        O: MarkdownObject + ?Sized,
    {
        if let Some(cached) = object.cached_markdown() {
            if !cached.cached_html_up_to_date(field) {
                cached
                    .refresh_markdown_cache(self)
                    .with_context(|| format!("refreshing cached {field}"))?;
            }
            return Ok(cached.cached_html_for(field).unwrap_or_default().to_string());
        }

        let text = object.markdown(field).unwrap_or_default().to_string();
        let context = object.render_context(field).merge(context);
        self.cacheless_render(&text, &context)
    }

    /// Render a batch with one cache read. Output order matches input order.
    pub fn cache_collection_render(&self, items: &[RenderItem]) -> Result<Vec<String>> {
        let keys = items
            .iter()
            .map(|item| self.cache_key(&item.context))
            .collect::<Result<Vec<_>, _>>()?;
        let cacheable: Vec<CacheKey> = keys.iter().flatten().cloned().collect();

        let mut cached: HashMap<CacheKey, String> = if cacheable.is_empty() {
            HashMap::new()
        } else {
            self.cache.multi_get(&cacheable)?
        };
        let hits = cached.len();

        let mut output = Vec::with_capacity(items.len());
        for (item, key) in items.iter().zip(keys) {
            if let Some(html) = key.as_ref().and_then(|key| cached.get(key)) {
                output.push(html.clone());
                continue;
            }
            if item.text.is_empty() {
                output.push(String::new());
                continue;
            }

            let html = self.cacheless_render(&item.text, &item.context)?;
            if let Some(key) = key {
                self.cache.set(&key, &html)?;
                cached.insert(key, html.clone());
            }
            output.push(html);
        }

        log::debug!(
            "rendered {} items, {hits} from cache",
            items.len()
        );
        Ok(output)
    }

    /// Re-contextualize rendered HTML for a viewer: relative links, redaction
    /// for `context.current_user` and issuable expansion.
    pub fn post_process(&self, html: &str, context: &FilterContext) -> Result<String> {
        Ok(self.post_process_result(html, context)?.output)
    }

    pub fn post_process_result(&self, html: &str, context: &FilterContext) -> Result<PipelineResult> {
        self.run(PipelineKind::PostProcess, html, context)
    }

    /// `["banzai", *parts, pipeline]` when the context carries a key.
    pub fn cache_key(&self, context: &FilterContext) -> Result<Option<CacheKey>, BanzaiError> {
        let Some(parts) = &context.cache_key else {
            return Ok(None);
        };
        let pipeline = Pipeline::get(context.pipeline.as_deref())?;
        Ok(Some(CacheKey::new(
            iter::once(CACHE_NAMESPACE)
                .chain(parts.iter().map(String::as_str))
                .chain(iter::once(pipeline.name())),
        )))
    }

    pub(crate) fn run(
        &self,
        kind: PipelineKind,
        text: &str,
        context: &FilterContext,
    ) -> Result<PipelineResult> {
        let context = self.defaults.clone().merge(context);
        let env = FilterEnv::new(&context, &self.services);
        self.executor.call(Pipeline::for_kind(kind), text, &env)
    }
}
