//! Turns free-form completion text into interaction records.
//!
//! The completion service formats its answers inconsistently, so parsing is
//! an ordered list of independent strategies. The first one that recognises
//! the text decides the result; text nobody recognises yields no records.

use serde::{Deserialize, Serialize};

use super::normalize::normalize;
use super::types::{EvidenceLevel, InteractionRisk, NormalizedName, Severity};

/// Phrases meaning the model found nothing. Checked before any table parsing.
const NEGATIVE_PHRASES: &[&str] = &["no significant interaction", "no interactions found"];

/// Words a severity cue must sit next to for a line to count.
const ANCHOR_WORDS: &[&str] = &["risk", "risks", "severity", "interaction", "interactions"];

/// Longest description kept from a scanned line, in characters.
const MAX_LINE_DESCRIPTION: usize = 300;

/// Which strategy produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    NegativeResult,
    Table,
    LineScan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub risks: Vec<InteractionRisk>,
    /// `None` when no strategy recognised the text.
    pub strategy: Option<ExtractionStrategy>,
}

type Strategy = fn(&str, &[&str]) -> Option<Vec<InteractionRisk>>;

const STRATEGIES: &[(ExtractionStrategy, Strategy)] = &[
    (ExtractionStrategy::NegativeResult, negative_result),
    (ExtractionStrategy::Table, table_rows),
    (ExtractionStrategy::LineScan, line_scan),
];

/// Extract interaction records from completion text.
pub fn extract<S: AsRef<str>>(
    raw_text: &str,
    primary_med: &str,
    candidate_meds: &[S],
) -> Vec<InteractionRisk> {
    extract_detailed(raw_text, primary_med, candidate_meds).risks
}

/// Like `extract`, also reporting which strategy matched.
pub fn extract_detailed<S: AsRef<str>>(
    raw_text: &str,
    primary_med: &str,
    candidate_meds: &[S],
) -> Extraction {
    let names: Vec<&str> = std::iter::once(primary_med)
        .chain(candidate_meds.iter().map(|m| m.as_ref()))
        .collect();

    for (kind, strategy) in STRATEGIES {
        if let Some(risks) = strategy(raw_text, &names) {
            return Extraction {
                risks,
                strategy: Some(*kind),
            };
        }
    }

    Extraction {
        risks: Vec::new(),
        strategy: None,
    }
}

// ---------------------------------------------------------------------------
// (a) Negative result
// ---------------------------------------------------------------------------

/// An explicit "nothing found" answer, even if a table appears elsewhere.
pub fn negative_result(raw_text: &str, _names: &[&str]) -> Option<Vec<InteractionRisk>> {
    let lower = raw_text.to_lowercase();
    NEGATIVE_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
        .then(Vec::new)
}

// ---------------------------------------------------------------------------
// (b) Pipe table
// ---------------------------------------------------------------------------

/// Rows shaped `drugA | drugB | severity | description`, one record per row.
/// A row directly above a `|---|` separator is a header, whatever its labels.
pub fn table_rows(raw_text: &str, _names: &[&str]) -> Option<Vec<InteractionRisk>> {
    let lines: Vec<&str> = raw_text.lines().collect();
    let risks: Vec<InteractionRisk> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !lines.get(i + 1).is_some_and(|next| is_separator_row(next)))
        .filter_map(|(_, line)| parse_table_row(line))
        .collect();
    (!risks.is_empty()).then_some(risks)
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('|')
        && trimmed.contains('-')
        && trimmed.split('|').all(|cell| is_separator_cell(cell.trim()))
}

fn parse_table_row(line: &str) -> Option<InteractionRisk> {
    let trimmed = line.trim();
    if !trimmed.contains('|') {
        return None;
    }
    // Markdown tables wrap rows in outer pipes.
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let cells: Vec<&str> = inner.split('|').map(clean_cell).collect();
    let [drug_a, drug_b, severity, description] = cells.as_slice() else {
        return None;
    };

    if drug_a.is_empty() || drug_b.is_empty() {
        return None;
    }
    if cells.iter().all(|c| is_separator_cell(c)) {
        return None;
    }
    if severity.eq_ignore_ascii_case("severity") {
        return None;
    }

    Some(InteractionRisk::new(
        drug_a,
        drug_b,
        Severity::classify(severity),
        *description,
        EvidenceLevel::Moderate,
    ))
}

fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches(|c| c == '*' || c == '`').trim()
}

fn is_separator_cell(cell: &str) -> bool {
    cell.chars().all(|c| c == '-' || c == ':' || c == '=' || c.is_whitespace())
}

// ---------------------------------------------------------------------------
// (c) Heuristic line scan
// ---------------------------------------------------------------------------

/// Lines with a severity cue next to "risk"/"severity"/"interaction" that
/// mention at least two of the known medication names.
pub fn line_scan(raw_text: &str, names: &[&str]) -> Option<Vec<InteractionRisk>> {
    let risks: Vec<InteractionRisk> = raw_text
        .lines()
        .filter_map(|line| scan_line(line, names))
        .collect();
    (!risks.is_empty()).then_some(risks)
}

fn scan_line(line: &str, names: &[&str]) -> Option<InteractionRisk> {
    let lower = line.to_lowercase();
    let severity = adjacent_cue(&lower)?;

    // Spellings of one drug ("warfarin", "Warfarin 5mg") share a key and count once.
    let mut matched: Vec<&str> = Vec::new();
    let mut matched_keys: Vec<NormalizedName> = Vec::new();
    for name in names {
        let raw = name.trim();
        let key = normalize(raw);
        if key.is_empty() || matched_keys.contains(&key) {
            continue;
        }
        let present = lower.contains(&raw.to_lowercase()) || lower.contains(key.as_str());
        if present {
            matched.push(raw);
            matched_keys.push(key);
        }
        if matched.len() == 2 {
            break;
        }
    }

    let [med_a, med_b] = matched.as_slice() else {
        return None;
    };

    let description: String = line
        .trim()
        .trim_start_matches(['-', '*', '•', '>'])
        .trim()
        .chars()
        .take(MAX_LINE_DESCRIPTION)
        .collect();

    Some(InteractionRisk::new(
        med_a,
        med_b,
        severity,
        description,
        EvidenceLevel::Weak,
    ))
}

/// Severity of the first cue word directly before or after an anchor word.
fn adjacent_cue(lower_line: &str) -> Option<Severity> {
    let words: Vec<&str> = lower_line
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    words.windows(2).find_map(|pair| {
        let (first, second) = (pair[0], pair[1]);
        if ANCHOR_WORDS.contains(&second) {
            if let Some(severity) = cue_severity(first) {
                return Some(severity);
            }
        }
        if ANCHOR_WORDS.contains(&first) {
            return cue_severity(second);
        }
        None
    })
}

fn cue_severity(word: &str) -> Option<Severity> {
    match word {
        "high" | "severe" | "major" | "serious" | "significant" => Some(Severity::High),
        "moderate" | "medium" => Some(Severity::Medium),
        "low" | "mild" | "minor" => Some(Severity::Low),
        _ => None,
    }
}
