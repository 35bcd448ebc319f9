pub mod types;
pub mod normalize;
pub mod knowledge;
pub mod matcher;
pub mod extractor;
pub mod prompt;
pub mod fallback;
pub mod checker;

pub use types::*;
pub use normalize::*;
pub use knowledge::*;
pub use matcher::*;
pub use extractor::*;
pub use prompt::*;
pub use fallback::*;
pub use checker::*;

use thiserror::Error;

use crate::completion::CompletionError;

/// Internal failure kinds. The public check API never returns these; they are
/// contained and recorded as `DegradedReason`s.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Completion text matched no extraction strategy: {0}")]
    ParseFailure(String),

    #[error("Text-completion collaborator failed: {0}")]
    Collaborator(#[from] CompletionError),

    #[error("Interaction lookup failed: {0}")]
    Lookup(#[from] KnowledgeError),
}

impl AdvisorError {
    pub fn degraded_reason(&self) -> DegradedReason {
        match self {
            Self::ParseFailure(detail) => DegradedReason::ParseFailure(detail.clone()),
            Self::Collaborator(e) => DegradedReason::CollaboratorFailure(e.to_string()),
            Self::Lookup(e) => DegradedReason::LookupFailure(e.to_string()),
        }
    }
}
