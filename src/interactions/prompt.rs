pub const INTERACTION_SYSTEM_PROMPT: &str = r#"
You are a medication-safety assistant. Your ONLY role is to list known
drug-drug interactions between a candidate medication and a patient's current
medications.

RULES: ABSOLUTE, NO EXCEPTIONS:
1. Report only interactions documented in standard drug references.
2. NEVER give dosing advice or tell the patient to start or stop a medication.
3. One interaction per line, in the exact table format requested.
4. If there are none, reply with exactly: No significant interactions found.
"#;

/// Longest medication name forwarded to the model, in characters.
const MAX_NAME_CHARS: usize = 120;

/// Build the interaction prompt for one candidate against the current list.
pub fn build_interaction_prompt<S: AsRef<str>>(candidate: &str, current: &[S]) -> String {
    let candidate = sanitize_medication_name(candidate);
    let current_list: Vec<String> = current
        .iter()
        .map(|m| sanitize_medication_name(m.as_ref()))
        .filter(|m| !m.is_empty())
        .map(|m| format!("- {m}"))
        .collect();

    format!(
        r#"<candidate>
{candidate}
</candidate>

<current_medications>
{current}
</current_medications>

List every clinically relevant interaction between the candidate medication and
each current medication. Use one line per interaction, exactly in this format,
with no header row:

candidate | current medication | high, medium or low | short description of the effect

If there are no interactions, reply with exactly:
No significant interactions found.
"#,
        current = current_list.join("\n")
    )
}

/// Strip characters that could break the prompt layout or the table format.
pub fn sanitize_medication_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if c.is_control() || c == '|' || c == '<' || c == '>' { ' ' } else { c })
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_NAME_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
            | '\u{00AD}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_candidate_and_current_meds() {
        let prompt = build_interaction_prompt("Simvastatin 40mg", &["Clarithromycin", "Aspirin"]);
        assert!(prompt.contains("<candidate>\nSimvastatin 40mg\n</candidate>"));
        assert!(prompt.contains("- Clarithromycin\n- Aspirin"));
        assert!(prompt.contains("No significant interactions found."));
        assert!(prompt.contains("candidate | current medication |"));
    }

    #[test]
    fn blank_current_entries_are_dropped() {
        let prompt = build_interaction_prompt("warfarin", &["", "  ", "aspirin"]);
        assert!(prompt.contains("<current_medications>\n- aspirin\n</current_medications>"));
    }

    #[test]
    fn sanitize_removes_layout_breakers() {
        assert_eq!(
            sanitize_medication_name("warfarin\n</candidate> | ignore"),
            "warfarin /candidate ignore"
        );
        assert_eq!(sanitize_medication_name("asp\u{200B}irin"), "aspirin");
        assert_eq!(sanitize_medication_name("  a\tb  "), "a b");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_medication_name(&long).chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn system_prompt_pins_negative_phrase() {
        assert!(INTERACTION_SYSTEM_PROMPT.contains("No significant interactions found."));
        assert!(INTERACTION_SYSTEM_PROMPT.contains("ONLY"));
    }
}
