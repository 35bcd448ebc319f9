use std::sync::Arc;

use super::knowledge::{KnowledgeBase, KnowledgeError, KnowledgeStore};
use super::normalize::normalize;
use super::types::{EvidenceLevel, InteractionRisk, NormalizedName, Severity};

/// Both keys must be at least this long before substring alias matching applies.
pub const MIN_ALIAS_LEN: usize = 3;

/// Deterministic pair lookup over the curated knowledge base.
#[derive(Clone)]
pub struct RuleBasedMatcher {
    store: Arc<KnowledgeStore>,
}

impl RuleBasedMatcher {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Look up a known interaction between two raw medication names.
    ///
    /// Lookup faults are logged and reported as no match.
    pub fn check_pair(&self, med_a: &str, med_b: &str) -> Option<InteractionRisk> {
        match self.try_check_pair(med_a, med_b) {
            Ok(risk) => risk,
            Err(e) => {
                tracing::warn!(error = %e, "Interaction lookup failed; treating as no match");
                None
            }
        }
    }

    /// Same as `check_pair`, but surfaces knowledge base faults.
    pub fn try_check_pair(
        &self,
        med_a: &str,
        med_b: &str,
    ) -> Result<Option<InteractionRisk>, KnowledgeError> {
        let key_a = normalize(med_a);
        let key_b = normalize(med_b);
        if key_a.is_empty() || key_b.is_empty() {
            return Ok(None);
        }

        let base = self.store.snapshot()?;
        Ok(match_pair(&base, med_a, med_b, &key_a, &key_b))
    }
}

fn match_pair(
    base: &KnowledgeBase,
    med_a: &str,
    med_b: &str,
    key_a: &NormalizedName,
    key_b: &NormalizedName,
) -> Option<InteractionRisk> {
    // Forward: A → B
    if let Some(edge) = base
        .lookup_direct(key_a)
        .iter()
        .find(|e| &e.counterpart == key_b)
    {
        return Some(InteractionRisk::new(
            med_a,
            med_b,
            edge.severity,
            edge.description.clone(),
            EvidenceLevel::Strong,
        ));
    }

    // Reverse: B → A, found either by scanning for A as counterpart or by B's own edges.
    let reverse = base
        .lookup_reverse(key_a)
        .into_iter()
        .find(|(source, _)| *source == key_b)
        .map(|(_, edge)| edge)
        .or_else(|| {
            base.lookup_direct(key_b)
                .iter()
                .find(|e| &e.counterpart == key_a)
        });
    if let Some(edge) = reverse {
        return Some(InteractionRisk::new(
            med_a,
            med_b,
            edge.severity,
            edge.description.clone(),
            EvidenceLevel::Strong,
        ));
    }

    // Alias: one name embedded in the other ("aspirin" / "aspirin ec").
    // Short or embedded names can false-positive; the length floor is the only guard.
    if key_a.len() >= MIN_ALIAS_LEN
        && key_b.len() >= MIN_ALIAS_LEN
        && (key_a.as_str().contains(key_b.as_str()) || key_b.as_str().contains(key_a.as_str()))
    {
        tracing::debug!(a = %key_a, b = %key_b, "Alias substring match");
        return Some(InteractionRisk::new(
            med_a,
            med_b,
            Severity::Medium,
            format!(
                "Possible alias or formulation match: '{}' and '{}' may contain the same \
                 active ingredient; review for duplicate therapy.",
                med_a.trim(),
                med_b.trim()
            ),
            EvidenceLevel::Strong,
        ));
    }

    None
}
