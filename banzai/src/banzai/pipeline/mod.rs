//! Named filter chains.
//!
//! Every pipeline is an ordered, immutable list of [`Filter`]s built once into
//! a static registry. [`PipelineExecutor`] runs a chain over one input and
//! reports each filter's wall time to its [`InstrumentationSink`].

pub mod color_chip;
pub mod emoji;
pub mod front_matter;
pub mod issuable_expansion;
pub mod markdown;
pub mod redactor_filter;
pub mod references;
pub mod relative_link;
pub mod sanitization;
pub mod single_line;
pub mod text_nodes;
pub mod traits;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

use crate::banzai::context::FilterContext;
use crate::banzai::error::BanzaiError;
use crate::banzai::instrumentation::InstrumentationSink;
use crate::banzai::redactor::RedactionMetadata;
use crate::banzai::store::Services;
use crate::banzai::types::{RecordKey, ReferenceType};

use self::color_chip::ColorChipFilter;
use self::emoji::EmojiFilter;
use self::front_matter::FrontMatterFilter;
use self::issuable_expansion::IssuableExpansionFilter;
use self::markdown::MarkdownFilter;
use self::redactor_filter::RedactorFilter;
use self::references::ReferenceFilter;
use self::relative_link::RelativeLinkFilter;
use self::sanitization::SanitizationFilter;
use self::single_line::SingleLineFilter;
pub use self::traits::Filter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Full,
    PlainMarkdown,
    Note,
    SingleLine,
    Label,
    ReferenceExtraction,
    RelativeLink,
    PostProcess,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 8] = [
        PipelineKind::Full,
        PipelineKind::PlainMarkdown,
        PipelineKind::Note,
        PipelineKind::SingleLine,
        PipelineKind::Label,
        PipelineKind::ReferenceExtraction,
        PipelineKind::RelativeLink,
        PipelineKind::PostProcess,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Full => "full",
            PipelineKind::PlainMarkdown => "plain_markdown",
            PipelineKind::Note => "note",
            PipelineKind::SingleLine => "single_line",
            PipelineKind::Label => "label",
            PipelineKind::ReferenceExtraction => "reference_extraction",
            PipelineKind::RelativeLink => "relative_link",
            PipelineKind::PostProcess => "post_process",
        }
    }

    fn filters(&self) -> Vec<Box<dyn Filter>> {
        match self {
            PipelineKind::PlainMarkdown => vec![Box::new(MarkdownFilter)],
            PipelineKind::Full | PipelineKind::Note => {
                let mut filters: Vec<Box<dyn Filter>> = vec![
                    Box::new(FrontMatterFilter),
                    Box::new(MarkdownFilter),
                    Box::new(SanitizationFilter),
                    Box::new(EmojiFilter),
                    Box::new(ColorChipFilter),
                ];
                filters.extend(reference_filters());
                filters
            }
            PipelineKind::SingleLine => {
                let mut filters: Vec<Box<dyn Filter>> = vec![
                    Box::new(MarkdownFilter),
                    Box::new(SingleLineFilter),
                    Box::new(SanitizationFilter),
                    Box::new(EmojiFilter),
                ];
                filters.extend(reference_filters());
                filters
            }
            PipelineKind::Label => vec![
                Box::new(SanitizationFilter),
                Box::new(ReferenceFilter::new(ReferenceType::Label)),
            ],
            PipelineKind::ReferenceExtraction => {
                let mut filters: Vec<Box<dyn Filter>> = vec![Box::new(MarkdownFilter)];
                filters.extend(reference_filters());
                filters
            }
            PipelineKind::RelativeLink => vec![Box::new(RelativeLinkFilter)],
            PipelineKind::PostProcess => {
                vec![
                    Box::new(RelativeLinkFilter),
                    Box::new(RedactorFilter),
                    Box::new(IssuableExpansionFilter),
                ]
            }
        }
    }
}

/// Reference filters in the order they run. Users go first so `@group`
/// mentions are linked before anything else claims the text.
fn reference_filters() -> Vec<Box<dyn Filter>> {
    [
        ReferenceType::User,
        ReferenceType::Issue,
        ReferenceType::MergeRequest,
        ReferenceType::Epic,
        ReferenceType::Label,
        ReferenceType::Milestone,
        ReferenceType::Commit,
    ]
    .into_iter()
    .map(|kind| Box::new(ReferenceFilter::new(kind)) as Box<dyn Filter>)
    .collect()
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = BanzaiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let canonical = canonical_name(value);
        if canonical == "gfm" {
            return Ok(PipelineKind::Full);
        }
        PipelineKind::ALL
            .into_iter()
            .find(|kind| kind.name() == canonical)
            .ok_or_else(|| BanzaiError::invalid_pipeline(value))
    }
}

/// `"Single-Line Pipeline"` and `"single_line"` name the same chain.
fn canonical_name(value: &str) -> String {
    let name = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    name.strip_suffix("_pipeline")
        .map(str::to_string)
        .unwrap_or(name)
}

pub struct Pipeline {
    kind: PipelineKind,
    filters: Vec<Box<dyn Filter>>,
}

static REGISTRY: Lazy<HashMap<PipelineKind, Pipeline>> = Lazy::new(|| {
    PipelineKind::ALL
        .into_iter()
        .map(|kind| {
            (
                kind,
                Pipeline {
                    kind,
                    filters: kind.filters(),
                },
            )
        })
        .collect()
});

impl Pipeline {
    /// Resolve a pipeline by name; `None` selects `full`.
    pub fn get(name: Option<&str>) -> Result<&'static Pipeline, BanzaiError> {
        let kind = match name {
            None => PipelineKind::Full,
            Some(name) => name.parse()?,
        };
        Ok(Self::for_kind(kind))
    }

    pub fn for_kind(kind: PipelineKind) -> &'static Pipeline {
        &REGISTRY[&kind]
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("kind", &self.kind)
            .field("filters", &self.filter_names())
            .finish()
    }
}

/// What filters see besides the HTML.
#[derive(Clone, Copy)]
pub struct FilterEnv<'a> {
    pub context: &'a FilterContext,
    pub services: &'a Services,
}

impl<'a> FilterEnv<'a> {
    pub fn new(context: &'a FilterContext, services: &'a Services) -> Self {
        Self { context, services }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineResult {
    pub output: String,
    /// Records linked by reference filters, in link order.
    pub references: Vec<(ReferenceType, RecordKey)>,
    pub diagnostics: Vec<String>,
    /// Set by the redactor filter.
    pub redaction: Option<RedactionMetadata>,
}

impl PipelineResult {
    pub fn references_of(&self, kind: ReferenceType) -> impl Iterator<Item = &RecordKey> {
        self.references
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, key)| key)
    }
}

/// Runs pipelines and reports filter timings.
#[derive(Clone)]
pub struct PipelineExecutor {
    sink: Arc<dyn InstrumentationSink>,
}

impl PipelineExecutor {
    pub fn new(sink: Arc<dyn InstrumentationSink>) -> Self {
        Self { sink }
    }

    pub fn call(
        &self,
        pipeline: &Pipeline,
        text: &str,
        env: &FilterEnv<'_>,
    ) -> Result<PipelineResult> {
        let mut result = PipelineResult::default();
        let mut html = text.to_string();

        for filter in &pipeline.filters {
            let started = Instant::now();
            html = filter
                .call(html, env, &mut result)
                .with_context(|| format!("{} filter in {} pipeline", filter.name(), pipeline.name()))?;
            self.sink
                .record(pipeline.name(), filter.name(), started.elapsed());
        }

        result.output = html;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banzai::instrumentation::RecordingSink;
    use crate::banzai::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, PipelineKind::Full)]
    #[case(Some("gfm"), PipelineKind::Full)]
    #[case(Some("note"), PipelineKind::Note)]
    #[case(Some("single_line_pipeline"), PipelineKind::SingleLine)]
    #[case(Some("single-line"), PipelineKind::SingleLine)]
    #[case(Some("Post Process"), PipelineKind::PostProcess)]
    fn resolves_pipeline_names(#[case] name: Option<&str>, #[case] expected: PipelineKind) {
        assert_eq!(Pipeline::get(name).unwrap().kind(), expected);
    }

    #[test]
    fn unknown_name_is_invalid_pipeline() {
        let err = Pipeline::get(Some("wiki")).unwrap_err();
        assert_eq!(
            err,
            BanzaiError::InvalidPipeline {
                value: "wiki".into(),
                kind: "name"
            }
        );
    }

    #[test]
    fn typed_lookup_is_always_valid() {
        for kind in PipelineKind::ALL {
            assert_eq!(Pipeline::for_kind(kind).kind(), kind);
        }
    }

    #[test]
    fn chains_are_ordered() {
        assert_eq!(
            Pipeline::for_kind(PipelineKind::PostProcess).filter_names(),
            vec!["relative_link", "redactor", "issuable_expansion"]
        );
        let full = Pipeline::for_kind(PipelineKind::Full).filter_names();
        assert_eq!(&full[..3], &["front_matter", "markdown", "sanitization"]);
        assert!(full.contains(&"issue_reference"));
    }

    #[test]
    fn executor_times_every_filter() {
        let sink = Arc::new(RecordingSink::default());
        let executor = PipelineExecutor::new(sink.clone());
        let services = Services::from_memory(Arc::new(MemoryStore::default()));
        let context = FilterContext::default();
        let env = FilterEnv::new(&context, &services);

        let result = executor
            .call(Pipeline::for_kind(PipelineKind::PlainMarkdown), "*hi*", &env)
            .unwrap();

        assert_eq!(result.output.trim(), "<p><em>hi</em></p>");
        assert_eq!(
            sink.calls(),
            vec![("plain_markdown".to_string(), "markdown".to_string())]
        );
    }
}
