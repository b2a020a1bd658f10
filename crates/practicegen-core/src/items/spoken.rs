//! `short_answer_v1.spoken_stub`: a spoken answer scored from its transcript.
//!
//! There is no speech scoring yet. A transcript matching an accepted one
//! earns full credit; any other non-empty transcript earns attempt credit.
//! Every concept receives the same score.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::normalize_answer;
use crate::model::{EvaluationResult, ExerciseType, RawCandidate, Submission};

const ATTEMPT_CREDIT: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpokenAnswerPayload {
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accepted_transcripts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpokenSubmission {
    #[serde(default)]
    transcript: String,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::SHORT_ANSWER_SPOKEN_STUB, raw)?;

    let prompt = fields.non_empty_string("prompt")?;
    let accepted_transcripts: Vec<String> =
        fields.optional("acceptedTranscripts")?.unwrap_or_default();

    Ok(PracticeItem::new(
        base,
        ItemPayload::SpokenAnswer(SpokenAnswerPayload {
            prompt,
            accepted_transcripts,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::SpokenAnswer(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::SHORT_ANSWER_SPOKEN_STUB));
    };
    let submission: SpokenSubmission = parse_submission(item, submission)?;
    let transcript = normalize_answer(&submission.transcript);

    let accepted = !transcript.is_empty()
        && payload
            .accepted_transcripts
            .iter()
            .any(|t| normalize_answer(t) == transcript);
    let score = if accepted {
        1.0
    } else if transcript.is_empty() {
        0.0
    } else {
        ATTEMPT_CREDIT
    };

    let evidence = json!({ "transcript": submission.transcript });
    Ok(item.evaluation(
        score,
        accepted,
        item.uniform_concept_results(score, accepted, evidence),
        "Spoken evaluation is stubbed (no speech scoring yet).",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw() -> Value {
        json!({
            "type": "short_answer_v1.spoken_stub",
            "mode": "production",
            "skills": ["speaking"],
            "conceptIds": [7, 8],
            "prompt": "Say: I am going home.",
            "acceptedTranscripts": ["Я иду домой"]
        })
    }

    #[test]
    fn accepted_transcript_is_correct() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"transcript": "  я иду ДОМОЙ "})).unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.is_correct);
        assert_eq!(result.concept_results.len(), 2);
        assert!(result.concept_results.iter().all(|c| c.is_correct));
    }

    #[test]
    fn other_transcript_gets_attempt_credit() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"transcript": "я иду"})).unwrap();
        assert_eq!(result.score, ATTEMPT_CREDIT);
        assert!(!result.is_correct);
        assert!(result.feedback.contains("stubbed"));
    }

    #[test]
    fn missing_transcript_scores_zero() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({})).unwrap();
        assert_eq!(result.score, 0.0);
        assert!(!result.is_correct);
    }

    #[test]
    fn without_accepted_transcripts_nothing_is_correct() {
        let mut raw = raw();
        raw.as_object_mut().unwrap().remove("acceptedTranscripts");
        let item = construct(&raw).unwrap();
        let result = evaluate(&item, &json!({"transcript": "я иду домой"})).unwrap();
        assert_eq!(result.score, ATTEMPT_CREDIT);
        assert!(!result.is_correct);
    }

    #[test]
    fn transcript_must_be_text() {
        let item = construct(&raw()).unwrap();
        assert!(evaluate(&item, &json!({"transcript": 42})).is_err());
    }
}
