use std::future::Future;

use super::CompletionError;

/// Prompt-in, text-out contract of the external text-completion service.
///
/// Implementations own their transport. Callers only see the returned text
/// or a `CompletionError`.
pub trait TextCompletion {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

/// Mock completion client for testing. Returns a configurable response.
#[derive(Debug, Clone)]
pub struct MockCompletion {
    outcome: Result<String, CompletionError>,
    delay: Option<std::time::Duration>,
}

impl MockCompletion {
    pub fn new(response: &str) -> Self {
        Self {
            outcome: Ok(response.to_string()),
            delay: None,
        }
    }

    pub fn failing(error: CompletionError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
        }
    }

    /// Sleep before answering, to exercise caller timeouts.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl TextCompletion for MockCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
