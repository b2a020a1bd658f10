//! `cloze_v1.free_fill`: a sentence with free-text blanks.
//!
//! Scoring: each blank is correct when the trimmed, lower-cased response is
//! one of its accepted forms (an empty response never is). The item score is
//! the fraction of correct blanks. Blanks are attributed to their own
//! `conceptId`, or to the item's first concept when they carry none.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{fraction_correct, normalize_answer, rollup_by_concept, Mark};
use crate::model::{ConceptId, EvaluationResult, ExerciseType, RawCandidate, Submission};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClozePart {
    Text {
        value: String,
    },
    Blank {
        id: String,
        accepted: Vec<String>,
        #[serde(rename = "conceptId", default, skip_serializing_if = "Option::is_none")]
        concept_id: Option<ConceptId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClozePayload {
    pub parts: Vec<ClozePart>,
}

impl ClozePayload {
    /// The sentence with every blank rendered as `___`.
    pub fn display_text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                ClozePart::Text { value } => value.as_str(),
                ClozePart::Blank { .. } => "___",
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ClozeSubmission {
    responses: HashMap<String, String>,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::CLOZE_FREE_FILL, raw)?;

    let parts: Vec<ClozePart> = fields.non_empty_vec("parts")?;

    let mut blank_ids = HashSet::new();
    for part in &parts {
        if let ClozePart::Blank { id, accepted, .. } = part {
            if id.trim().is_empty() {
                return Err(fields.malformed("parts", "blank id must not be empty"));
            }
            if !blank_ids.insert(id.as_str()) {
                return Err(fields.malformed("parts", format!("duplicate blank id \"{id}\"")));
            }
            if accepted.is_empty() || accepted.iter().any(|a| a.trim().is_empty()) {
                return Err(fields.malformed(
                    "parts",
                    format!("blank \"{id}\" needs at least one non-empty accepted answer"),
                ));
            }
        }
    }
    if blank_ids.is_empty() {
        return Err(fields.malformed("parts", "cloze must include at least one blank part"));
    }

    Ok(PracticeItem::new(base, ItemPayload::Cloze(ClozePayload { parts })))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::Cloze(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::CLOZE_FREE_FILL));
    };
    let submission: ClozeSubmission = parse_submission(item, submission)?;

    let marks: Vec<Mark> = payload
        .parts
        .iter()
        .filter_map(|part| match part {
            ClozePart::Blank {
                id,
                accepted,
                concept_id,
            } => Some((id, accepted, concept_id)),
            ClozePart::Text { .. } => None,
        })
        .enumerate()
        .map(|(index, (id, accepted, concept_id))| {
            let response = submission
                .responses
                .get(id)
                .map(|r| normalize_answer(r))
                .unwrap_or_default();
            let correct = !response.is_empty()
                && accepted.iter().any(|a| normalize_answer(a) == response);
            Mark {
                concept_id: concept_id.unwrap_or_else(|| item.primary_concept()),
                correct,
                evidence: json!({
                    "index": index,
                    "blankId": id,
                    "response": response,
                    "accepted": accepted,
                }),
            }
        })
        .collect();

    let score = fraction_correct(&marks);
    let is_correct = score == 1.0;

    Ok(item.evaluation(
        score,
        is_correct,
        rollup_by_concept(marks),
        if is_correct {
            "All blanks correct."
        } else {
            "Some blanks incorrect."
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemError;
    use serde_json::{json, Value};

    fn raw() -> Value {
        json!({
            "type": "cloze_v1.free_fill",
            "mode": "production",
            "skills": ["writing"],
            "conceptIds": [123, 200],
            "parts": [
                {"type": "text", "value": "Мы идем в "},
                {"type": "blank", "id": "b1", "accepted": ["вокзал"], "conceptId": 123},
                {"type": "text", "value": " после "},
                {"type": "blank", "id": "b2", "accepted": ["работы"]},
                {"type": "text", "value": "."}
            ]
        })
    }

    #[test]
    fn partial_credit_per_blank() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(
            &item,
            &json!({"responses": {"b1": " Вокзал ", "b2": "школы"}}),
        )
        .unwrap();
        assert_eq!(result.score, 0.5);
        assert!(!result.is_correct);
        // b2 has no conceptId and falls back to 123, so both blanks roll up together
        assert_eq!(result.concept_results.len(), 1);
        assert_eq!(result.concept_results[0].concept_id, 123);
        assert_eq!(result.concept_results[0].score, 1.0);
        assert_eq!(result.concept_results[0].max_score, 2.0);
        assert!(!result.concept_results[0].is_correct);
    }

    #[test]
    fn unattributed_blank_goes_to_first_concept() {
        let mut raw = raw();
        raw["conceptIds"] = json!([77]);
        let item = construct(&raw).unwrap();
        let result = evaluate(&item, &json!({"responses": {"b1": "вокзал", "b2": "работы"}}))
            .unwrap();
        assert_eq!(result.score, 1.0);
        let ids: Vec<_> = result.concept_results.iter().map(|c| c.concept_id).collect();
        assert_eq!(ids, vec![123, 77]);
    }

    #[test]
    fn missing_response_is_wrong_not_invalid() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"responses": {}})).unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn missing_responses_map_is_invalid() {
        let item = construct(&raw()).unwrap();
        let err = evaluate(&item, &json!({"b1": "вокзал"})).unwrap_err();
        assert!(matches!(err, ItemError::InvalidSubmission { .. }));
    }

    #[test]
    fn requires_a_blank() {
        let mut raw = raw();
        raw["parts"] = json!([{"type": "text", "value": "Привет"}]);
        assert_eq!(construct(&raw).unwrap_err().field(), Some("parts"));
    }

    #[test]
    fn display_text_masks_blanks() {
        let item = construct(&raw()).unwrap();
        let ItemPayload::Cloze(payload) = item.payload() else {
            panic!("expected cloze payload");
        };
        assert_eq!(payload.display_text(), "Мы идем в ___ после ___.");
    }
}
