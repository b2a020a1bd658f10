//! `matching_v1.pairwise`: match each left entry to a right entry.
//!
//! Scoring: fraction of left entries matched to their expected right entry.
//! Each left entry is attributed to its own `conceptId`, or to the item's
//! first concept.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{fraction_correct, rollup_by_concept, Mark};
use crate::model::{ConceptId, EvaluationResult, ExerciseType, RawCandidate, Submission};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<ConceptId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub left: Vec<MatchEntry>,
    pub right: Vec<MatchEntry>,
    /// Left id → right id.
    pub correct_matches: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MatchingSubmission {
    matches: HashMap<String, String>,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::MATCHING_PAIRWISE, raw)?;

    let prompt: Option<String> = fields.optional("prompt")?;
    let left: Vec<MatchEntry> = fields.non_empty_vec("left")?;
    let right: Vec<MatchEntry> = fields.non_empty_vec("right")?;
    let correct_matches: BTreeMap<String, String> = fields.required("correctMatches")?;

    let right_ids: HashSet<&str> = right.iter().map(|r| r.id.as_str()).collect();
    let mut left_ids = HashSet::new();
    for entry in &left {
        if !left_ids.insert(entry.id.as_str()) {
            return Err(fields.malformed("left", format!("duplicate id \"{}\"", entry.id)));
        }
        match correct_matches.get(&entry.id) {
            None => {
                return Err(fields.malformed(
                    "correctMatches",
                    format!("no match given for \"{}\"", entry.id),
                ))
            }
            Some(target) if !right_ids.contains(target.as_str()) => {
                return Err(fields.malformed(
                    "correctMatches",
                    format!("\"{}\" maps to unknown right id \"{target}\"", entry.id),
                ))
            }
            Some(_) => {}
        }
    }

    Ok(PracticeItem::new(
        base,
        ItemPayload::Matching(MatchingPayload {
            prompt,
            left,
            right,
            correct_matches,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::Matching(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::MATCHING_PAIRWISE));
    };
    let submission: MatchingSubmission = parse_submission(item, submission)?;

    let marks: Vec<Mark> = payload
        .left
        .iter()
        .map(|entry| {
            let expected = payload.correct_matches.get(&entry.id);
            let actual = submission.matches.get(&entry.id);
            Mark {
                concept_id: entry.concept_id.unwrap_or_else(|| item.primary_concept()),
                correct: expected.is_some() && actual == expected,
                evidence: json!({
                    "leftId": entry.id,
                    "expected": expected,
                    "actual": actual,
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
            "All matches correct."
        } else {
            "Some matches incorrect."
        },
    ))
}
