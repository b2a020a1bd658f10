//! `flashcard_v1.basic`: self-graded recall card.
//!
//! Scoring: `easy` → 1.0, `hard` → 0.5, `forgot` → 0.0, and an absent or
//! `unknown` confidence → 0.25 (engagement credit). Only `easy` and `hard`
//! count as correct.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::model::{EvaluationResult, ExerciseType, RawCandidate, Submission};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashcardPayload {
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Learner's self-reported recall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Easy,
    Hard,
    Forgot,
    #[default]
    Unknown,
}

impl Confidence {
    pub fn score(self) -> f64 {
        match self {
            Confidence::Easy => 1.0,
            Confidence::Hard => 0.5,
            Confidence::Forgot => 0.0,
            Confidence::Unknown => 0.25,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FlashcardSubmission {
    #[serde(default)]
    revealed: bool,
    #[serde(default)]
    confidence: Confidence,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::FLASHCARD_BASIC, raw)?;

    let front = fields.non_empty_string("front")?;
    let back = fields.non_empty_string("back")?;
    let example: Option<String> = fields.optional("example")?;

    Ok(PracticeItem::new(
        base,
        ItemPayload::Flashcard(FlashcardPayload {
            front,
            back,
            example,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    if !matches!(item.payload(), ItemPayload::Flashcard(_)) {
        return Err(item.payload_mismatch(ExerciseType::FLASHCARD_BASIC));
    }
    let submission: FlashcardSubmission = parse_submission(item, submission)?;

    let confidence = submission.confidence;
    let is_correct = matches!(confidence, Confidence::Easy | Confidence::Hard);
    let score = confidence.score();
    let evidence = json!({
        "revealed": submission.revealed,
        "confidence": confidence,
    });

    Ok(item.evaluation(
        score,
        is_correct,
        item.uniform_concept_results(score, is_correct, evidence),
        "Flashcard reviewed.",
    ))
}
