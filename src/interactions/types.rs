use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// NormalizedName
// ---------------------------------------------------------------------------

/// Canonical lookup key for a medication (see `normalize`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedName(pub(crate) String);

impl NormalizedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key never matches anything.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Total classification of free severity text. Unknown text is Medium.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("high") || lower.contains("severe") {
            Self::High
        } else if lower.contains("low") || lower.contains("mild") {
            Self::Low
        } else {
            Self::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

// ---------------------------------------------------------------------------
// EvidenceLevel
// ---------------------------------------------------------------------------

/// Where a risk came from: curated table, parsed model table, or line-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceLevel {
    Weak,
    Moderate,
    Strong,
}

impl EvidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

// ---------------------------------------------------------------------------
// Knowledge base entries
// ---------------------------------------------------------------------------

/// One directed edge of the knowledge base, keyed by its source drug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEdge {
    pub counterpart: NormalizedName,
    pub severity: Severity,
    pub description: String,
}

/// Curated dataset record: a drug and everything it is known to interact with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedEntry {
    pub drug: String,
    pub interactions: Vec<CuratedInteraction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedInteraction {
    pub interacts_with: String,
    /// Free text, classified with `Severity::classify`.
    pub severity: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// InteractionRisk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRisk {
    pub severity: Severity,
    pub description: String,
    pub medications: (String, String),
    pub evidence_level: EvidenceLevel,
}

impl InteractionRisk {
    pub fn new(
        med_a: &str,
        med_b: &str,
        severity: Severity,
        description: impl Into<String>,
        evidence_level: EvidenceLevel,
    ) -> Self {
        Self {
            severity,
            description: description.into(),
            medications: (med_a.trim().to_string(), med_b.trim().to_string()),
            evidence_level,
        }
    }

    /// Unordered, case-insensitive identity of the medication pair.
    pub fn pair_key(&self) -> (String, String) {
        let a = self.medications.0.trim().to_lowercase();
        let b = self.medications.1.trim().to_lowercase();
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome & report
// ---------------------------------------------------------------------------

/// Why a check ran with less than full coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradedReason {
    /// Collaborator text matched no extraction strategy.
    ParseFailure(String),
    /// Timeout, transport error, or malformed collaborator response.
    CollaboratorFailure(String),
    /// The curated table could not be consulted.
    LookupFailure(String),
}

/// Distinguishes "nothing found" from "could not fully check".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Complete,
    Degraded { reasons: Vec<DegradedReason> },
}

impl CheckOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionReport {
    pub id: Uuid,
    pub candidate: String,
    pub risks: Vec<InteractionRisk>,
    pub outcome: CheckOutcome,
    /// Rule-based hits before deduplication.
    pub rule_hits: usize,
    /// Model-assisted hits before deduplication.
    pub model_hits: usize,
    pub checked_at: NaiveDateTime,
    pub processing_time_ms: u64,
}
