use std::time::Duration;

use super::extractor::{extract_detailed, Extraction};
use super::prompt::build_interaction_prompt;
use super::types::InteractionRisk;
use super::AdvisorError;
use crate::completion::{CompletionError, TextCompletion};

/// Asks the text-completion collaborator about interactions the curated
/// table does not cover, and parses its answer.
pub struct ModelAssistedFallback<C> {
    client: C,
    timeout: Duration,
}

impl<C: TextCompletion> ModelAssistedFallback<C> {
    /// `timeout` bounds the whole exchange, independent of the client's own limits.
    pub fn new(client: C, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Model-derived risks, or nothing if the collaborator fails in any way.
    pub async fn supplement<S: AsRef<str>>(
        &self,
        primary_med: &str,
        current_meds: &[S],
    ) -> Vec<InteractionRisk> {
        match self.try_supplement(primary_med, current_meds).await {
            Ok(extraction) => extraction.risks,
            Err(e) => {
                tracing::warn!(error = %e, "Model-assisted interaction check failed; returning no results");
                Vec::new()
            }
        }
    }

    /// One bounded completion exchange piped through the extractor.
    pub async fn try_supplement<S: AsRef<str>>(
        &self,
        primary_med: &str,
        current_meds: &[S],
    ) -> Result<Extraction, AdvisorError> {
        let prompt = build_interaction_prompt(primary_med, current_meds);

        let text = tokio::time::timeout(self.timeout, self.client.complete(&prompt))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))??;

        let extraction = extract_detailed(&text, primary_med, current_meds);
        match extraction.strategy {
            Some(strategy) => {
                tracing::debug!(
                    strategy = ?strategy,
                    risks = extraction.risks.len(),
                    "Completion text parsed"
                );
                Ok(extraction)
            }
            None => Err(AdvisorError::ParseFailure(format!(
                "{} characters of completion text",
                text.chars().count()
            ))),
        }
    }
}
