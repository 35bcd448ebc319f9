use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::fallback::ModelAssistedFallback;
use super::knowledge::KnowledgeStore;
use super::matcher::RuleBasedMatcher;
use super::normalize::normalize;
use super::prompt::INTERACTION_SYSTEM_PROMPT;
use super::types::{CheckOutcome, DegradedReason, InteractionReport, InteractionRisk};
use super::AdvisorError;
use crate::completion::{OllamaClient, TextCompletion};
use crate::config::{AdvisorConfig, DEFAULT_FALLBACK_THRESHOLD};

/// Entry point for the prescribing workflow.
///
/// Curated lookups always run; the model fallback runs when they find fewer
/// than `fallback_threshold` interactions. Results are deduplicated per
/// medication pair, keeping the strongest evidence.
pub struct InteractionChecker<C> {
    matcher: RuleBasedMatcher,
    fallback: Option<ModelAssistedFallback<C>>,
    fallback_threshold: usize,
}

impl InteractionChecker<OllamaClient> {
    /// Wire a checker from configuration: curated or file dataset, plus an
    /// Ollama-backed fallback unless disabled.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let store = match &config.dataset_path {
            Some(path) => KnowledgeStore::from_path(path)?,
            None => KnowledgeStore::new(),
        };

        let fallback = if config.model_fallback {
            let client = OllamaClient::from_config(config)?.with_system(INTERACTION_SYSTEM_PROMPT);
            Some(ModelAssistedFallback::new(
                client,
                Duration::from_secs(config.timeout_secs),
            ))
        } else {
            None
        };

        tracing::info!(
            model_fallback = config.model_fallback,
            model = %config.model,
            threshold = config.fallback_threshold,
            "Interaction checker configured"
        );

        Ok(Self::new(Arc::new(store), fallback).with_fallback_threshold(config.fallback_threshold))
    }
}

impl<C: TextCompletion> InteractionChecker<C> {
    pub fn new(store: Arc<KnowledgeStore>, fallback: Option<ModelAssistedFallback<C>>) -> Self {
        Self {
            matcher: RuleBasedMatcher::new(store),
            fallback,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
        }
    }

    pub fn with_fallback_threshold(mut self, threshold: usize) -> Self {
        self.fallback_threshold = threshold;
        self
    }

    pub fn matcher(&self) -> &RuleBasedMatcher {
        &self.matcher
    }

    /// Interactions between `candidate` and each of `current`. Never fails;
    /// use `check_interactions_report` to tell "none found" from "not checked".
    pub async fn check_interactions<S: AsRef<str>>(
        &self,
        candidate: &str,
        current: &[S],
    ) -> Vec<InteractionRisk> {
        self.check_interactions_report(candidate, current).await.risks
    }

    pub async fn check_interactions_report<S: AsRef<str>>(
        &self,
        candidate: &str,
        current: &[S],
    ) -> InteractionReport {
        let start = Instant::now();
        let mut reasons: Vec<DegradedReason> = Vec::new();
        let mut risks: Vec<InteractionRisk> = Vec::new();

        for med in current {
            match self.matcher.try_check_pair(candidate, med.as_ref()) {
                Ok(Some(risk)) => risks.push(risk),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Curated interaction lookup failed");
                    let reason = AdvisorError::from(e).degraded_reason();
                    if !reasons.contains(&reason) {
                        reasons.push(reason);
                    }
                }
            }
        }
        let rule_hits = risks.len();

        let mut model_hits = 0;
        let wants_fallback = rule_hits < self.fallback_threshold
            && !current.is_empty()
            && !normalize(candidate).is_empty();
        if let (true, Some(fallback)) = (wants_fallback, &self.fallback) {
            match fallback.try_supplement(candidate, current).await {
                Ok(extraction) => {
                    model_hits = extraction.risks.len();
                    risks.extend(extraction.risks);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Model-assisted check degraded");
                    reasons.push(e.degraded_reason());
                }
            }
        }

        let risks = dedup_by_pair(risks);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        let outcome = if reasons.is_empty() {
            CheckOutcome::Complete
        } else {
            CheckOutcome::Degraded { reasons }
        };

        tracing::info!(
            current = current.len(),
            rule_hits,
            model_hits,
            returned = risks.len(),
            complete = outcome.is_complete(),
            processing_ms = processing_time_ms,
            "Interaction check complete"
        );

        InteractionReport {
            id: Uuid::new_v4(),
            candidate: candidate.trim().to_string(),
            risks,
            outcome,
            rule_hits,
            model_hits,
            checked_at: chrono::Local::now().naive_local(),
            processing_time_ms,
        }
    }
}

/// Collapse risks for the same unordered, case-insensitive medication pair,
/// keeping the highest evidence level. Ties keep the earlier record, and each
/// pair stays at the position where it first appeared.
pub fn dedup_by_pair(risks: Vec<InteractionRisk>) -> Vec<InteractionRisk> {
    let mut kept: Vec<InteractionRisk> = Vec::with_capacity(risks.len());
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for risk in risks {
        match index.get(&risk.pair_key()) {
            Some(&i) => {
                if risk.evidence_level > kept[i].evidence_level {
                    kept[i] = risk;
                }
            }
            None => {
                index.insert(risk.pair_key(), kept.len());
                kept.push(risk);
            }
        }
    }

    kept
}
