pub mod cache;
pub mod color;
pub mod config;
pub mod context;
pub mod cross_reference;
pub mod document;
pub mod error;
pub mod instrumentation;
pub mod issuable_extractor;
pub mod markdown_cache;
pub mod object_renderer;
pub mod pipeline;
pub mod redactor;
pub mod reference_extractor;
pub mod reference_parser;
pub mod renderer;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::BanzaiConfig;
pub use context::{FilterContext, RenderContext, RenderOptions};
pub use document::Document;
pub use error::BanzaiError;
pub use object_renderer::{HasCachedMarkdown, MarkdownObject, ObjectRenderer};
pub use pipeline::{Pipeline, PipelineKind, PipelineResult};
pub use redactor::{RedactionMetadata, Redactor, ReferenceRedactor};
pub use renderer::{RenderItem, Renderer};
pub use store::{Authorizer, DataStore, MemoryStore, Services};
