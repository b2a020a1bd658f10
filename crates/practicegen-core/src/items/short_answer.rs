//! `short_answer_v1.basic`: free-text answer checked against accepted strings.
//!
//! Scoring (heuristic):
//! - empty response → 0.0
//! - exact (normalised) match with an accepted answer → 1.0, correct
//! - otherwise with keywords → fraction of keywords present, capped at 0.9
//! - otherwise → 0.5 attempt credit
//!
//! Every concept receives the same score.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::normalize_answer;
use crate::model::{EvaluationResult, ExerciseType, RawCandidate, Submission};

const KEYWORD_SCORE_CAP: f64 = 0.9;
const ATTEMPT_CREDIT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortAnswerPayload {
    pub prompt: String,
    pub accepted_answers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ShortAnswerSubmission {
    text: String,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::SHORT_ANSWER_BASIC, raw)?;

    let prompt = fields.non_empty_string("prompt")?;
    let accepted_answers: Vec<String> = fields.non_empty_vec("acceptedAnswers")?;
    if accepted_answers.iter().all(|a| a.trim().is_empty()) {
        return Err(fields.malformed("acceptedAnswers", "needs a non-empty answer"));
    }
    let keywords: Vec<String> = fields.optional("keywords")?.unwrap_or_default();

    Ok(PracticeItem::new(
        base,
        ItemPayload::ShortAnswer(ShortAnswerPayload {
            prompt,
            accepted_answers,
            keywords,
        }),
    ))
}

fn score_response(payload: &ShortAnswerPayload, response: &str) -> (f64, bool) {
    if response.is_empty() {
        return (0.0, false);
    }
    if payload
        .accepted_answers
        .iter()
        .any(|a| normalize_answer(a) == response)
    {
        return (1.0, true);
    }
    if !payload.keywords.is_empty() {
        let hits = payload
            .keywords
            .iter()
            .map(|k| normalize_answer(k))
            .filter(|k| !k.is_empty() && response.contains(k.as_str()))
            .count();
        let ratio = hits as f64 / payload.keywords.len() as f64;
        return (ratio.min(KEYWORD_SCORE_CAP), false);
    }
    (ATTEMPT_CREDIT, false)
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::ShortAnswer(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::SHORT_ANSWER_BASIC));
    };
    let submission: ShortAnswerSubmission = parse_submission(item, submission)?;

    let response = normalize_answer(&submission.text);
    let (score, is_correct) = score_response(payload, &response);
    let evidence = json!({
        "response": response,
        "accepted": payload.accepted_answers,
        "keywords": payload.keywords,
    });

    Ok(item.evaluation(
        score,
        is_correct,
        item.uniform_concept_results(score, is_correct, evidence),
        if is_correct {
            "Correct."
        } else {
            "Submitted. (Heuristic scoring.)"
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(keywords: Value) -> Value {
        json!({
            "type": "short_answer_v1.basic",
            "mode": "production",
            "skills": ["writing"],
            "conceptIds": [1, 2],
            "prompt": "Как тебя зовут?",
            "acceptedAnswers": ["Меня зовут Анна"],
            "keywords": keywords
        })
    }

    #[test]
    fn exact_match_is_full_credit() {
        let item = construct(&raw(json!([]))).unwrap();
        let result = evaluate(&item, &json!({"text": "  меня зовут анна "})).unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.is_correct);
        assert_eq!(result.concept_results.len(), 2);
    }

    #[test]
    fn keywords_give_capped_partial_credit() {
        let item = construct(&raw(json!(["зовут", "анна"]))).unwrap();
        let half = evaluate(&item, &json!({"text": "зовут Петя"})).unwrap();
        assert_eq!(half.score, 0.5);

        let all = evaluate(&item, &json!({"text": "Анна, так меня зовут"})).unwrap();
        assert_eq!(all.score, 0.9);
        assert!(!all.is_correct);
    }

    #[test]
    fn attempt_credit_without_keywords() {
        let item = construct(&raw(Value::Null)).unwrap();
        assert_eq!(evaluate(&item, &json!({"text": "привет"})).unwrap().score, 0.5);
        assert_eq!(evaluate(&item, &json!({"text": "   "})).unwrap().score, 0.0);
    }

    #[test]
    fn accepted_answers_required() {
        let mut raw = raw(json!([]));
        raw["acceptedAnswers"] = json!([]);
        assert_eq!(construct(&raw).unwrap_err().field(), Some("acceptedAnswers"));
    }
}
