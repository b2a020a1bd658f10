//! Content quality checks for generated candidates.
//!
//! Structure is the registry's job; these checks look at what the learner
//! will actually read (script, length, duplicates, focus). Each returns a
//! list of human-readable issues that is fed back into the repair prompt.
//! An empty list means the candidate is acceptable.

use std::collections::HashSet;

use serde_json::Value;

use practicegen_core::model::{ConceptId, Constraints, Script};

const MCQ_CHOICE_IDS: [&str; 4] = ["A", "B", "C", "D"];
const CLOZE_BLANK_ID: &str = "b1";
const CLOZE_MAX_SENTENCE_WORDS: usize = 12;
const CLOZE_MAX_ACCEPTED: usize = 4;
const CLOZE_MAX_ANSWER_WORDS: usize = 4;

pub fn has_cyrillic(s: &str) -> bool {
    s.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}

pub fn has_latin(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_alphabetic())
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render issues as a markdown bullet list.
pub fn format_bullet_issues(issues: &[String]) -> String {
    issues
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn word_count(normalized: &str) -> usize {
    normalized.split(' ').count()
}

/// Lower-case and fold `ё` into `е`.
fn fold(s: &str) -> String {
    normalize_whitespace(s).to_lowercase().replace('ё', "е")
}

fn script_issues(label: &str, text: &str, constraints: &Constraints, issues: &mut Vec<String>) {
    if constraints.require_script == Script::Cyrillic && !has_cyrillic(text) {
        issues.push(format!("{label} missing Cyrillic"));
    }
    let no_latin = constraints.forbid_latin || constraints.require_script == Script::Cyrillic;
    if no_latin && has_latin(text) {
        issues.push(format!("{label} contains Latin letters"));
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn id_string(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Checks for `mcq_v1.basic` candidates.
///
/// With `focus_word`, the correct choice must be exactly that word.
pub fn check_mcq(candidate: &Value, constraints: &Constraints, focus_word: Option<&str>) -> Vec<String> {
    let mut issues = Vec::new();

    let prompt = normalize_whitespace(str_field(candidate, "prompt"));
    if prompt.chars().count() < 6 {
        issues.push("prompt too short".to_string());
    }
    script_issues("prompt", &prompt, constraints, &mut issues);
    if word_count(&prompt) > constraints.max_prompt_words {
        issues.push(format!(
            "prompt too long (max {} words)",
            constraints.max_prompt_words
        ));
    }

    let choices: &[Value] = candidate
        .get("choices")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if choices.len() != MCQ_CHOICE_IDS.len() {
        issues.push("choices must be exactly 4".to_string());
    }

    let ids: Vec<String> = choices.iter().map(id_string).collect();
    let texts: Vec<String> = choices
        .iter()
        .map(|c| normalize_whitespace(str_field(c, "text")))
        .collect();

    for expected in MCQ_CHOICE_IDS {
        if !ids.iter().any(|id| id == expected) {
            issues.push(format!("missing choice id \"{expected}\""));
        }
    }
    for id in &ids {
        if !MCQ_CHOICE_IDS.contains(&id.as_str()) {
            issues.push(format!("unexpected choice id \"{id}\""));
        }
    }

    let unique: HashSet<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    if unique.len() != texts.len() {
        issues.push("choices contain duplicates".to_string());
    }

    for (i, text) in texts.iter().enumerate() {
        let label = match ids[i].as_str() {
            "" => format!("choice {i}"),
            id => format!("choice {id}"),
        };
        if text.is_empty() {
            issues.push(format!("{label} is empty"));
        }
        script_issues(&label, text, constraints, &mut issues);
        if word_count(text) > constraints.max_choice_words {
            issues.push(format!(
                "{label} too long (max {} words)",
                constraints.max_choice_words
            ));
        }
    }

    let correct = str_field(candidate, "correctChoiceId");
    if !MCQ_CHOICE_IDS.contains(&correct) {
        issues.push("correctChoiceId must be A/B/C/D".to_string());
    }

    let correct_index = ids.iter().position(|id| id == correct);
    let correct_text = correct_index.map(|i| texts[i].to_lowercase());
    match &correct_text {
        None => issues.push("correctChoiceId does not match any choice id".to_string()),
        Some(correct_text) => {
            let clash = ids
                .iter()
                .zip(&texts)
                .any(|(id, text)| id != correct && text.to_lowercase() == *correct_text);
            if clash {
                issues.push("a distractor matches the correct answer text".to_string());
            }
        }
    }

    if let Some(focus) = focus_word.map(str::trim).filter(|f| !f.is_empty()) {
        let expected = normalize_whitespace(focus).to_lowercase();
        if correct_text.as_deref().unwrap_or_default() != expected {
            issues.push(format!("correct choice must be the focus word \"{focus}\""));
        }
    }

    issues
}

/// Whether `needle` occurs in `haystack` as a whole word (bounded by the
/// string edges, whitespace, or trailing punctuation).
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        let left_ok = before.map_or(true, char::is_whitespace);
        let right_ok = after.map_or(true, |c| c.is_whitespace() || ".,!?;:".contains(c));
        left_ok && right_ok
    })
}

/// Keep only Cyrillic letters, digits, spaces and hyphens after folding.
fn focus_key(s: &str) -> String {
    fold(s)
        .chars()
        .filter(|c| matches!(*c, 'а'..='я' | '0'..='9' | ' ' | '-'))
        .collect()
}

fn related_to_focus(answer: &str, focus: &str) -> bool {
    let a = focus_key(answer);
    let f = focus_key(focus);
    if a.is_empty() || f.is_empty() {
        return false;
    }
    if a.contains(&f) || f.contains(&a) {
        return true;
    }
    let stem: String = a.chars().take(3).collect();
    stem.chars().count() == 3 && f.starts_with(&stem)
}

/// Checks for `cloze_v1.free_fill` candidates.
///
/// `focus_word` requires the accepted forms to look like the focus lemma;
/// `focus_concept` requires the blank to carry that concept id.
pub fn check_cloze(
    candidate: &Value,
    constraints: &Constraints,
    focus_word: Option<&str>,
    focus_concept: Option<ConceptId>,
) -> Vec<String> {
    let mut issues = Vec::new();

    let parts: &[Value] = candidate
        .get("parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if parts.len() < 3 {
        issues.push("parts too short (need text + blank + text)".to_string());
    }

    let part_type = |p: &Value| p.get("type").and_then(Value::as_str).map(str::to_string);
    let blanks: Vec<&Value> = parts
        .iter()
        .filter(|p| part_type(p).as_deref() == Some("blank"))
        .collect();
    if blanks.len() != 1 {
        issues.push("must contain exactly one blank".to_string());
    }

    let blank = blanks.first().copied();
    let mut accepted: Vec<String> = Vec::new();
    if let Some(blank) = blank {
        if id_string(blank) != CLOZE_BLANK_ID {
            issues.push(format!("blank id must be \"{CLOZE_BLANK_ID}\""));
        }

        accepted = blank
            .get("accepted")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .map(|v| match v {
                        Value::String(s) => normalize_whitespace(s),
                        other => normalize_whitespace(&other.to_string()),
                    })
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if accepted.is_empty() {
            issues.push("blank accepted must have at least one valid answer".to_string());
        }
        if accepted.len() > CLOZE_MAX_ACCEPTED {
            issues.push(format!(
                "blank accepted should have no more than {CLOZE_MAX_ACCEPTED} variants"
            ));
        }
        let unique: HashSet<String> = accepted.iter().map(|s| s.to_lowercase()).collect();
        if unique.len() != accepted.len() {
            issues.push("blank accepted contains duplicates".to_string());
        }
        for option in &accepted {
            script_issues("blank accepted option", option, constraints, &mut issues);
            if word_count(option) > CLOZE_MAX_ANSWER_WORDS {
                issues.push(format!(
                    "blank accepted option too long (prefer 1-{CLOZE_MAX_ANSWER_WORDS} words)"
                ));
            }
        }

        if let Some(expected) = focus_concept {
            match blank.get("conceptId").and_then(Value::as_u64) {
                None => issues.push("blank conceptId must be a number".to_string()),
                Some(id) if id != expected => {
                    issues.push("blank conceptId must match focus conceptId".to_string())
                }
                Some(_) => {}
            }
        }
    }

    let text_values: Vec<&str> = parts
        .iter()
        .filter(|p| part_type(p).as_deref() == Some("text"))
        .map(|p| str_field(p, "value"))
        .collect();
    let sentence = normalize_whitespace(&text_values.concat());

    if sentence.chars().count() < 4 {
        issues.push("sentence too short".to_string());
    }
    script_issues("sentence", &sentence, constraints, &mut issues);
    if word_count(&sentence) > CLOZE_MAX_SENTENCE_WORDS {
        issues.push(format!(
            "sentence too long (max {CLOZE_MAX_SENTENCE_WORDS} words)"
        ));
    }
    if sentence.contains(['(', ')']) {
        issues.push("sentence should not contain parenthetical hints".to_string());
    }

    let folded_sentence = fold(&sentence);
    if accepted
        .iter()
        .map(|a| fold(a))
        .any(|form| !form.is_empty() && contains_word(&folded_sentence, &form))
    {
        issues.push("sentence text repeats the blank answer form".to_string());
    }

    if text_values.len() >= 2 {
        if normalize_whitespace(text_values[0]).is_empty() {
            issues.push("text before blank must be non-empty".to_string());
        }
        if normalize_whitespace(text_values[text_values.len() - 1]).is_empty() {
            issues.push("text after blank must be non-empty".to_string());
        }
    }

    if let (Some(focus), Some(_)) = (focus_word.filter(|f| !f.trim().is_empty()), blank) {
        if !accepted.iter().any(|a| related_to_focus(a, focus)) {
            issues.push("accepted forms do not look related to focus target".to_string());
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cyrillic() -> Constraints {
        Constraints::default()
    }

    fn good_mcq() -> Value {
        json!({
            "type": "mcq_v1.basic",
            "prompt": "Где находится банк?",
            "choices": [
                {"id": "A", "text": "В школе"},
                {"id": "B", "text": "В банке"},
                {"id": "C", "text": "В парке"},
                {"id": "D", "text": "Дома"}
            ],
            "correctChoiceId": "B"
        })
    }

    fn good_cloze() -> Value {
        json!({
            "type": "cloze_v1.free_fill",
            "parts": [
                {"type": "text", "value": "Мы идем на "},
                {"type": "blank", "id": "b1", "accepted": ["вокзал"], "conceptId": 123},
                {"type": "text", "value": " после работы."}
            ]
        })
    }

    #[test]
    fn text_utils() {
        assert!(has_cyrillic("привет"));
        assert!(!has_cyrillic("hello"));
        assert!(has_latin("abc"));
        assert!(!has_latin("абв 123"));
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(
            format_bullet_issues(&["one".into(), "two".into()]),
            "- one\n- two"
        );
    }

    #[test]
    fn clean_mcq_has_no_issues() {
        assert!(check_mcq(&good_mcq(), &cyrillic(), None).is_empty());
        assert!(check_mcq(&good_mcq(), &cyrillic(), Some("в банке")).is_empty());
    }

    #[test]
    fn mcq_script_and_shape_issues() {
        let mut mcq = good_mcq();
        mcq["prompt"] = json!("Where is the bank?");
        mcq["choices"][3] = json!({"id": "E", "text": "В школе"});
        let issues = check_mcq(&mcq, &cyrillic(), None);
        assert!(issues.contains(&"prompt missing Cyrillic".to_string()));
        assert!(issues.contains(&"prompt contains Latin letters".to_string()));
        assert!(issues.contains(&"missing choice id \"D\"".to_string()));
        assert!(issues.contains(&"unexpected choice id \"E\"".to_string()));
        assert!(issues.contains(&"choices contain duplicates".to_string()));
    }

    #[test]
    fn mcq_latin_allowed_when_unconstrained() {
        let mut mcq = good_mcq();
        mcq["prompt"] = json!("Where is the bank?");
        let relaxed = Constraints {
            require_script: Script::Any,
            forbid_latin: false,
            ..Constraints::default()
        };
        assert!(check_mcq(&mcq, &relaxed, None).is_empty());
    }

    #[test]
    fn mcq_focus_word_must_be_correct_choice() {
        let issues = check_mcq(&good_mcq(), &cyrillic(), Some("Дома"));
        assert_eq!(issues, vec!["correct choice must be the focus word \"Дома\""]);
    }

    #[test]
    fn mcq_bad_correct_id() {
        let mut mcq = good_mcq();
        mcq["correctChoiceId"] = json!("Z");
        let issues = check_mcq(&mcq, &cyrillic(), None);
        assert!(issues.contains(&"correctChoiceId must be A/B/C/D".to_string()));
        assert!(issues.contains(&"correctChoiceId does not match any choice id".to_string()));
    }

    #[test]
    fn clean_cloze_has_no_issues() {
        assert!(check_cloze(&good_cloze(), &cyrillic(), None, None).is_empty());
        assert!(check_cloze(&good_cloze(), &cyrillic(), Some("вокзал"), Some(123)).is_empty());
    }

    #[test]
    fn cloze_repeated_answer_and_hints() {
        let mut cloze = good_cloze();
        cloze["parts"][2]["value"] = json!(" (вокзал) и вокзал.");
        let issues = check_cloze(&cloze, &cyrillic(), None, None);
        assert!(issues.contains(&"sentence should not contain parenthetical hints".to_string()));
        assert!(issues.contains(&"sentence text repeats the blank answer form".to_string()));
    }

    #[test]
    fn cloze_blank_rules() {
        let cloze = json!({
            "parts": [
                {"type": "text", "value": "Я "},
                {"type": "blank", "id": "x", "accepted": ["иду", "Иду"], "conceptId": 5},
                {"type": "text", "value": ""}
            ]
        });
        let issues = check_cloze(&cloze, &cyrillic(), None, Some(7));
        assert!(issues.contains(&"blank id must be \"b1\"".to_string()));
        assert!(issues.contains(&"blank accepted contains duplicates".to_string()));
        assert!(issues.contains(&"blank conceptId must match focus conceptId".to_string()));
        assert!(issues.contains(&"text after blank must be non-empty".to_string()));
        assert!(issues.contains(&"sentence too short".to_string()));
    }

    #[test]
    fn cloze_focus_relation() {
        assert!(check_cloze(&good_cloze(), &cyrillic(), Some("вокзалы"), None).is_empty());
        let issues = check_cloze(&good_cloze(), &cyrillic(), Some("школа"), None);
        assert_eq!(issues, vec!["accepted forms do not look related to focus target"]);
    }

    #[test]
    fn word_boundaries() {
        assert!(contains_word("я иду домой.", "домой"));
        assert!(contains_word("домой", "домой"));
        assert!(!contains_word("я иду домойка", "домой"));
        assert!(!contains_word("прийти", "йти"));
    }
}
