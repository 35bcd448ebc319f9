pub mod types;
pub mod ollama;

pub use types::*;
pub use ollama::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Text-completion service is not reachable at {0}")]
    Connection(String),

    #[error("Text-completion service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Completion response was empty")]
    EmptyResponse,
}
