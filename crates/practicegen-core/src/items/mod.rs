//! Built-in practice item types.
//!
//! Each submodule supplies a payload type, a constructor that validates raw
//! candidate data, and an evaluator that scores a submission. They are wired
//! into a registry by [`register_builtin_items`].

pub mod audio_matching;
pub mod cloze;
pub mod flashcard;
pub mod interaction;
pub mod matching;
pub mod mcq;
pub mod ordering;
pub mod short_answer;
pub mod spoken;
pub mod summarize;
pub mod translate;

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::item::PracticeItem;
use crate::model::{ConceptId, ConceptResult, ExerciseType};
use crate::registry::ItemRegistry;

/// Register every built-in item type on `registry`.
pub fn register_builtin_items(registry: &mut ItemRegistry) {
    registry.register(ExerciseType::MCQ_BASIC, mcq::construct, mcq::evaluate);
    registry.register(ExerciseType::CLOZE_FREE_FILL, cloze::construct, cloze::evaluate);
    registry.register(
        ExerciseType::FLASHCARD_BASIC,
        flashcard::construct,
        flashcard::evaluate,
    );
    registry.register(
        ExerciseType::SHORT_ANSWER_BASIC,
        short_answer::construct,
        short_answer::evaluate,
    );
    registry.register(
        ExerciseType::ORDERING_WORD_ORDER,
        ordering::construct,
        ordering::evaluate,
    );
    registry.register(
        ExerciseType::MATCHING_PAIRWISE,
        matching::construct,
        matching::evaluate,
    );
    registry.register(
        ExerciseType::MATCHING_AUDIO_TO_TEXT,
        audio_matching::construct,
        audio_matching::evaluate,
    );
    registry.register(
        ExerciseType::SHORT_ANSWER_SPOKEN_STUB,
        spoken::construct,
        spoken::evaluate,
    );
    registry.register(
        ExerciseType::INTERACTION_FREE_REPLY_TURN,
        interaction::construct_free_reply,
        interaction::evaluate_free_reply,
    );
    registry.register(
        ExerciseType::INTERACTION_RESPOND_TO_PROMPT,
        interaction::construct_respond_to_prompt,
        interaction::evaluate_respond_to_prompt,
    );
    registry.register(
        ExerciseType::MEDIATION_SUMMARIZE_TEXT,
        summarize::construct,
        summarize::evaluate,
    );
    registry.register(
        ExerciseType::MEDIATION_TRANSLATE_SENTENCE,
        translate::construct,
        translate::evaluate,
    );
}

/// Normalise a free-text answer for comparison.
pub(crate) fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase()
}

/// One scored unit (a blank, a position, a pair) attributed to a concept.
pub(crate) struct Mark {
    pub concept_id: ConceptId,
    pub correct: bool,
    pub evidence: Value,
}

/// Roll per-unit marks up into one result per concept.
///
/// A concept's `score` is the number of its units answered correctly and its
/// `max_score` the number of units attributed to it, so the overall item
/// score equals `Σ score / Σ max_score`. Concepts keep first-seen order.
pub(crate) fn rollup_by_concept(marks: Vec<Mark>) -> Vec<ConceptResult> {
    let mut order: Vec<ConceptId> = Vec::new();
    let mut by_concept: HashMap<ConceptId, (f64, f64, bool, Vec<Value>)> = HashMap::new();

    for mark in marks {
        let entry = by_concept.entry(mark.concept_id).or_insert_with(|| {
            order.push(mark.concept_id);
            (0.0, 0.0, false, Vec::new())
        });
        if mark.correct {
            entry.0 += 1.0;
        }
        entry.1 += 1.0;
        entry.2 |= !mark.correct;
        entry.3.push(mark.evidence);
    }

    order
        .into_iter()
        .filter_map(|concept_id| {
            by_concept
                .remove(&concept_id)
                .map(|(score, max_score, any_wrong, evidence)| ConceptResult {
                    concept_id,
                    score,
                    max_score,
                    is_correct: !any_wrong,
                    evidence: Value::Array(evidence),
                })
        })
        .collect()
}

/// Fraction of marks that are correct; `0.0` for no marks.
pub(crate) fn fraction_correct(marks: &[Mark]) -> f64 {
    if marks.is_empty() {
        return 0.0;
    }
    marks.iter().filter(|m| m.correct).count() as f64 / marks.len() as f64
}

/// One result per target phrase: full credit when the normalised phrase
/// occurs in `response`, which must already be normalised.
///
/// Targets without a concept are attributed to the item's first concept.
/// Evidence records the phrase under `evidence_key`.
pub(crate) fn presence_results<'a>(
    item: &PracticeItem,
    targets: impl IntoIterator<Item = (&'a str, Option<ConceptId>)>,
    response: &str,
    evidence_key: &str,
) -> Vec<ConceptResult> {
    targets
        .into_iter()
        .map(|(phrase, concept_id)| {
            let phrase = normalize_answer(phrase);
            let hit = !response.is_empty() && !phrase.is_empty() && response.contains(&phrase);
            ConceptResult {
                concept_id: concept_id.unwrap_or_else(|| item.primary_concept()),
                score: if hit { 1.0 } else { 0.0 },
                max_score: 1.0,
                is_correct: hit,
                evidence: json!({ evidence_key: phrase }),
            }
        })
        .collect()
}

/// Number of presence results that scored.
pub(crate) fn hits(results: &[ConceptResult]) -> usize {
    results.iter().filter(|r| r.is_correct).count()
}

/// Whitespace-separated word count.
pub(crate) fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}
