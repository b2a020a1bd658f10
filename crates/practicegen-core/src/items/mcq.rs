//! `mcq_v1.basic`: single-correct multiple choice.
//!
//! Scoring: `1.0` when the submitted `choiceId` equals the stored correct id,
//! otherwise `0.0`. Every concept receives the same score.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::model::{EvaluationResult, ExerciseType, RawCandidate, Submission};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McqPayload {
    pub prompt: String,
    pub choices: Vec<Choice>,
    pub correct_choice_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McqSubmission {
    choice_id: String,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::MCQ_BASIC, raw)?;

    let prompt = fields.non_empty_string("prompt")?;
    let choices: Vec<Choice> = fields.required("choices")?;
    if choices.len() < 2 {
        return Err(fields.malformed("choices", "needs at least two choices"));
    }

    let mut seen = HashSet::new();
    for choice in &choices {
        if choice.id.trim().is_empty() || choice.text.trim().is_empty() {
            return Err(fields.malformed("choices", "choice id and text must not be empty"));
        }
        if !seen.insert(choice.id.as_str()) {
            return Err(fields.malformed(
                "choices",
                format!("duplicate choice id \"{}\"", choice.id),
            ));
        }
    }

    let correct_choice_id = fields.non_empty_string("correctChoiceId")?;
    if !seen.contains(correct_choice_id.as_str()) {
        return Err(fields.malformed(
            "correctChoiceId",
            "must match one of choices[].id",
        ));
    }

    Ok(PracticeItem::new(
        base,
        ItemPayload::Mcq(McqPayload {
            prompt,
            choices,
            correct_choice_id,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::Mcq(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::MCQ_BASIC));
    };
    let submission: McqSubmission = parse_submission(item, submission)?;

    let is_correct = submission.choice_id == payload.correct_choice_id;
    let score = if is_correct { 1.0 } else { 0.0 };
    let evidence = json!({
        "chosen": submission.choice_id,
        "correctChoiceId": payload.correct_choice_id,
    });

    Ok(item.evaluation(
        score,
        is_correct,
        item.uniform_concept_results(score, is_correct, evidence),
        if is_correct { "Correct." } else { "Incorrect." },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemError;
    use serde_json::{json, Value};

    fn raw() -> Value {
        json!({
            "type": "mcq_v1.basic",
            "mode": "reception",
            "skills": ["reading"],
            "conceptIds": [123, 124],
            "prompt": "Где метро?",
            "choices": [
                {"id": "A", "text": "Там"},
                {"id": "B", "text": "Здесь"},
                {"id": "C", "text": "Сейчас"},
                {"id": "D", "text": "Потом"}
            ],
            "correctChoiceId": "B"
        })
    }

    #[test]
    fn scores_correct_and_incorrect_choice() {
        let item = construct(&raw()).unwrap();

        let good = evaluate(&item, &json!({"choiceId": "B"})).unwrap();
        assert_eq!(good.score, 1.0);
        assert!(good.is_correct);
        assert_eq!(good.concept_results.len(), item.concept_ids().len());

        let bad = evaluate(&item, &json!({"choiceId": "A"})).unwrap();
        assert_eq!(bad.score, 0.0);
        assert!(!bad.is_correct);
        assert_eq!(bad.concept_results.len(), item.concept_ids().len());
    }

    #[test]
    fn unknown_choice_id_scores_zero() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"choiceId": "Z"})).unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn missing_choice_id_is_invalid_submission() {
        let item = construct(&raw()).unwrap();
        let err = evaluate(&item, &json!({"choice": "B"})).unwrap_err();
        assert!(matches!(err, ItemError::InvalidSubmission { .. }));
    }

    #[test]
    fn correct_id_must_be_a_choice() {
        let mut raw = raw();
        raw["correctChoiceId"] = json!("E");
        assert_eq!(construct(&raw).unwrap_err().field(), Some("correctChoiceId"));
    }

    #[test]
    fn rejects_single_choice_and_duplicates() {
        let mut raw1 = raw();
        raw1["choices"] = json!([{"id": "B", "text": "Здесь"}]);
        assert_eq!(construct(&raw1).unwrap_err().field(), Some("choices"));

        let mut raw2 = raw();
        raw2["choices"] = json!([{"id": "B", "text": "Здесь"}, {"id": "B", "text": "Там"}]);
        assert_eq!(construct(&raw2).unwrap_err().field(), Some("choices"));
    }

    #[test]
    fn missing_prompt_is_malformed() {
        let mut raw = raw();
        raw.as_object_mut().unwrap().remove("prompt");
        let err = construct(&raw).unwrap_err();
        assert_eq!(err.field(), Some("prompt"));
    }
}
