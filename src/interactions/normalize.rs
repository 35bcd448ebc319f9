use std::sync::LazyLock;

use regex::Regex;

use super::types::NormalizedName;

/// Strength patterns: "10 mg", "81mg", "0.5g", "875/125 mg", "5 mg/ml", "1%".
static RE_DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d+(?:[.,]\d+)?(?:\s*/\s*\d+(?:[.,]\d+)?)?\s*(?:(?:mcg|mg|µg|ug|ml|g|iu|units?)\b(?:\s*/\s*(?:ml|dose|hr|h)\b)?|%)",
    )
    .expect("valid dosage regex")
});

/// Punctuation that separates a name from its strength or form.
static RE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;()\[\]]").expect("valid separator regex"));

/// Dosage-form words dropped from the end of a name.
const FORMULATION_WORDS: &[&str] = &[
    "tablet",
    "tablets",
    "capsule",
    "capsules",
    "injection",
    "injections",
    "solution",
    "solutions",
    "suspension",
    "suspensions",
    "suppository",
    "suppositories",
    "patch",
    "patches",
    "cream",
    "creams",
    "ointment",
    "ointments",
    "gel",
    "gels",
];

/// Canonicalize a raw medication string into a comparable key.
///
/// Lowercases, trims, removes strengths and trailing dosage-form words, and
/// collapses whitespace. `normalize(normalize(x)) == normalize(x)`; blank
/// input yields an empty key.
pub fn normalize(raw: &str) -> NormalizedName {
    let lower = raw.to_lowercase();
    let trimmed = lower.trim();
    if trimmed.is_empty() {
        return NormalizedName(String::new());
    }

    // Separators go first so "(50)mg" reads as "50 mg" before dosage stripping.
    let spaced = RE_SEPARATORS.replace_all(trimmed, " ");
    let without_dose = RE_DOSAGE.replace_all(&spaced, " ");

    let mut words: Vec<&str> = without_dose.split_whitespace().collect();
    // A lone form word ("cream") is kept rather than erased to nothing.
    while words.len() > 1 {
        match words.last() {
            Some(last) if FORMULATION_WORDS.contains(last) => {
                words.pop();
            }
            _ => break,
        }
    }

    NormalizedName(words.join(" "))
}
