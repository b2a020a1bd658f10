//! `mediation_v1.summarize_text`: summarise a source text in a word range.
//!
//! Scoring (heuristic):
//! - empty summary → 0.0
//! - no key points → 0.8 inside the word range, 0.6 outside it
//! - otherwise `0.2 + 0.6 · coverage`, plus 0.2 inside the word range
//!
//! Key points are matched as normalised substrings and each yields its own
//! concept result. Only a full-coverage summary inside the range is correct.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{hits, normalize_answer, presence_results, word_count};
use crate::model::{ConceptId, EvaluationResult, ExerciseType, RawCandidate, Submission};

const DEFAULT_MIN_WORDS: usize = 5;
const DEFAULT_MAX_WORDS: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPoint {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<ConceptId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizePayload {
    pub source_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<KeyPoint>,
    pub min_words: usize,
    pub max_words: usize,
}

#[derive(Debug, Deserialize)]
struct SummarySubmission {
    #[serde(default)]
    text: String,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::MEDIATION_SUMMARIZE_TEXT, raw)?;

    let source_text = fields.non_empty_string("sourceText")?;
    let key_points: Vec<KeyPoint> = fields.optional("keyPoints")?.unwrap_or_default();
    if key_points.iter().any(|k| k.text.trim().is_empty()) {
        return Err(fields.malformed("keyPoints", "key points must not be empty"));
    }
    let min_words = fields.optional("minWords")?.unwrap_or(DEFAULT_MIN_WORDS);
    let max_words = fields.optional("maxWords")?.unwrap_or(DEFAULT_MAX_WORDS);
    if min_words > max_words {
        return Err(fields.malformed(
            "maxWords",
            format!("{max_words} is below minWords {min_words}"),
        ));
    }

    Ok(PracticeItem::new(
        base,
        ItemPayload::Summarize(SummarizePayload {
            source_text,
            key_points,
            min_words,
            max_words,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::Summarize(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::MEDIATION_SUMMARIZE_TEXT));
    };
    let submission: SummarySubmission = parse_submission(item, submission)?;
    let summary = normalize_answer(&submission.text);

    let words = word_count(&summary);
    let within_bounds = (payload.min_words..=payload.max_words).contains(&words);
    let length_bonus = if within_bounds { 0.2 } else { 0.0 };

    if payload.key_points.is_empty() {
        let score = match (words, within_bounds) {
            (0, _) => 0.0,
            (_, true) => 0.8,
            (_, false) => 0.6,
        };
        let evidence = json!({ "wordCount": words, "withinBounds": within_bounds });
        return Ok(item.evaluation(
            score,
            false,
            item.uniform_concept_results(score, false, evidence),
            length_feedback(payload, words, within_bounds),
        ));
    }

    let results = presence_results(
        item,
        payload.key_points.iter().map(|k| (k.text.as_str(), k.concept_id)),
        &summary,
        "keyPoint",
    );
    let covered = hits(&results);
    let score = if words == 0 {
        0.0
    } else {
        let coverage = covered as f64 / payload.key_points.len() as f64;
        0.2 + 0.6 * coverage + length_bonus
    };
    let is_correct = words > 0 && covered == payload.key_points.len() && within_bounds;

    Ok(item.evaluation(
        score,
        is_correct,
        results,
        format!(
            "Covered {covered} of {} key point(s). {}",
            payload.key_points.len(),
            length_feedback(payload, words, within_bounds)
        ),
    ))
}

fn length_feedback(payload: &SummarizePayload, words: usize, within_bounds: bool) -> String {
    if words == 0 {
        "No summary given.".to_string()
    } else if within_bounds {
        format!("{words} words, within range.")
    } else {
        format!(
            "{words} words, outside {}-{}.",
            payload.min_words, payload.max_words
        )
    }
}
