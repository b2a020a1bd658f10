//! `ordering_v1.word_order`: arrange tokens into the correct sequence.
//!
//! Scoring: fraction of positions whose submitted token id equals the expected
//! one. Each position is attributed to its expected token's `conceptId`, or
//! round-robin over the item's concepts when the token carries none.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{fraction_correct, rollup_by_concept, Mark};
use crate::model::{ConceptId, EvaluationResult, ExerciseType, RawCandidate, Submission};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderToken {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<ConceptId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub tokens: Vec<OrderToken>,
    pub correct_order: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OrderingSubmission {
    order: Vec<String>,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::ORDERING_WORD_ORDER, raw)?;

    let prompt: Option<String> = fields.optional("prompt")?;
    let tokens: Vec<OrderToken> = fields.non_empty_vec("tokens")?;
    let correct_order: Vec<String> = fields.non_empty_vec("correctOrder")?;

    let mut token_ids = HashSet::new();
    for token in &tokens {
        if !token_ids.insert(token.id.as_str()) {
            return Err(fields.malformed("tokens", format!("duplicate token id \"{}\"", token.id)));
        }
    }
    if let Some(unknown) = correct_order.iter().find(|id| !token_ids.contains(id.as_str())) {
        return Err(fields.malformed(
            "correctOrder",
            format!("unknown token id \"{unknown}\""),
        ));
    }

    Ok(PracticeItem::new(
        base,
        ItemPayload::Ordering(OrderingPayload {
            prompt,
            tokens,
            correct_order,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::Ordering(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::ORDERING_WORD_ORDER));
    };
    let submission: OrderingSubmission = parse_submission(item, submission)?;
    let concept_ids = item.concept_ids();

    let marks: Vec<Mark> = payload
        .correct_order
        .iter()
        .enumerate()
        .map(|(index, expected)| {
            let actual = submission.order.get(index);
            let concept_id = payload
                .tokens
                .iter()
                .find(|t| &t.id == expected)
                .and_then(|t| t.concept_id)
                .unwrap_or(concept_ids[index % concept_ids.len()]);
            Mark {
                concept_id,
                correct: actual == Some(expected),
                evidence: json!({
                    "index": index,
                    "expectedId": expected,
                    "actualId": actual,
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
            "Perfect order."
        } else {
            "Some tokens out of order."
        },
    ))
}
