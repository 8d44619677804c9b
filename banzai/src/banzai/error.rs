use thiserror::Error;

/// Errors raised by the rendering engine itself.
///
/// `InvalidPipeline` and `InvalidReferenceType` are programming errors at the
/// call site. The redactor swallows `InvalidReferenceType` per type group and
/// treats the group as invisible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BanzaiError {
    #[error("invalid pipeline {value:?} ({kind})")]
    InvalidPipeline { value: String, kind: &'static str },

    #[error("invalid reference type {0:?}")]
    InvalidReferenceType(String),

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    #[error("markdown rendering failed: {0}")]
    Markdown(String),

    #[error("cache failure: {0}")]
    Cache(String),
}

impl BanzaiError {
    pub fn invalid_pipeline(value: impl Into<String>) -> Self {
        Self::InvalidPipeline {
            value: value.into(),
            kind: "name",
        }
    }
}

impl From<lol_html::errors::RewritingError> for BanzaiError {
    fn from(err: lol_html::errors::RewritingError) -> Self {
        Self::Rewrite(err.to_string())
    }
}
