//! Item registry: maps an exercise type to its constructor and evaluator.
//!
//! The registry is an owned value. Build it once at startup (or per test),
//! then share it read-only, typically behind an `Arc`. Registration takes
//! `&mut self`, so writes can't race with lookups.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ItemError, Result};
use crate::item::PracticeItem;
use crate::items::register_builtin_items;
use crate::model::{EvaluationResult, ExerciseType, RawCandidate, Submission};

/// Builds a typed item from raw candidate data.
pub type Constructor = Arc<dyn Fn(&RawCandidate) -> Result<PracticeItem> + Send + Sync>;

/// Scores a submission against an item. Must be pure.
pub type Evaluator =
    Arc<dyn Fn(&PracticeItem, &Submission) -> Result<EvaluationResult> + Send + Sync>;

#[derive(Clone)]
struct Handlers {
    construct: Constructor,
    evaluate: Evaluator,
}

/// Dispatch table from exercise type to constructor/evaluator pair.
#[derive(Clone, Default)]
pub struct ItemRegistry {
    handlers: HashMap<ExerciseType, Handlers>,
}

impl ItemRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in item type registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtin_items(&mut registry);
        registry
    }

    /// Add or replace the handlers for `item_type`.
    pub fn register<C, E>(&mut self, item_type: impl Into<ExerciseType>, construct: C, evaluate: E)
    where
        C: Fn(&RawCandidate) -> Result<PracticeItem> + Send + Sync + 'static,
        E: Fn(&PracticeItem, &Submission) -> Result<EvaluationResult> + Send + Sync + 'static,
    {
        let item_type = item_type.into();
        let replaced = self
            .handlers
            .insert(
                item_type.clone(),
                Handlers {
                    construct: Arc::new(construct),
                    evaluate: Arc::new(evaluate),
                },
            )
            .is_some();
        if replaced {
            tracing::debug!("re-registered item type {item_type}");
        }
    }

    pub fn is_supported(&self, item_type: &str) -> bool {
        self.handlers.contains_key(&ExerciseType::from(item_type))
    }

    /// Registered type ids, sorted.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .handlers
            .keys()
            .map(|t| t.as_str().to_string())
            .collect();
        types.sort();
        types
    }

    /// Validate raw data and construct the item its `type` field names.
    pub fn create(&self, raw: &RawCandidate) -> Result<PracticeItem> {
        let Some(object) = raw.as_object() else {
            return Err(ItemError::malformed(
                "(unknown)",
                "(root)",
                "expected a JSON object",
            ));
        };
        let item_type = match object.get("type") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.as_str(),
            Some(Value::String(_)) => {
                return Err(ItemError::malformed("(unknown)", "type", "must not be empty"))
            }
            Some(_) => return Err(ItemError::malformed("(unknown)", "type", "must be a string")),
            None => {
                return Err(ItemError::malformed(
                    "(unknown)",
                    "type",
                    "required field is missing",
                ))
            }
        };

        let handlers = self.lookup(item_type)?;
        (handlers.construct)(raw)
    }

    /// Score `submission` with the evaluator registered for the item's type.
    ///
    /// Results are normalised so the score lies in `0.0..=1.0` and at least
    /// one concept result is present, whatever the evaluator returned.
    pub fn evaluate(&self, item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
        let handlers = self.lookup(item.item_type().as_str())?;
        let mut result = (handlers.evaluate)(item, submission)?;

        if !(0.0..=1.0).contains(&result.score) {
            tracing::warn!(
                "evaluator for {} returned out-of-range score {}; clamping",
                item.item_type(),
                result.score
            );
            result.score = if result.score.is_nan() {
                0.0
            } else {
                result.score.clamp(0.0, 1.0)
            };
        }
        if result.concept_results.is_empty() {
            result.concept_results =
                item.uniform_concept_results(result.score, result.is_correct, Value::Null);
        }
        Ok(result)
    }

    fn lookup(&self, item_type: &str) -> Result<&Handlers> {
        self.handlers
            .get(&ExerciseType::from(item_type))
            .ok_or_else(|| ItemError::UnknownType {
                item_type: item_type.to_string(),
                supported: self.supported_types(),
            })
    }
}

impl fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRegistry")
            .field("types", &self.supported_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{parse_submission, ItemBase, ItemPayload};
    use serde_json::json;

    fn mcq_json() -> Value {
        json!({
            "type": "mcq_v1.basic",
            "mode": "reception",
            "skills": ["reading"],
            "conceptIds": [123],
            "prompt": "Где метро?",
            "choices": [{"id": "A", "text": "Там"}, {"id": "B", "text": "Здесь"}],
            "correctChoiceId": "B"
        })
    }

    fn echo_construct(raw: &RawCandidate) -> Result<PracticeItem> {
        let base = ItemBase::parse(raw)?;
        Ok(PracticeItem::custom(base, raw.clone()))
    }

    fn echo_evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
        #[derive(serde::Deserialize)]
        struct Echo {
            score: f64,
        }
        let echo: Echo = parse_submission(item, submission)?;
        Ok(EvaluationResult {
            item_type: item.item_type().clone(),
            mode: item.mode(),
            skills: item.skills().to_vec(),
            is_correct: echo.score >= 1.0,
            score: echo.score,
            concept_results: vec![],
            feedback: String::new(),
        })
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ItemRegistry::with_builtins();
        assert_eq!(
            registry.supported_types(),
            vec![
                "cloze_v1.free_fill",
                "flashcard_v1.basic",
                "matching_v1.pairwise",
                "mcq_v1.basic",
                "ordering_v1.word_order",
                "short_answer_v1.basic",
            ]
        );
        assert!(registry.is_supported("mcq_v1.basic"));
        assert!(!registry.is_supported("mcq_v2.basic"));
    }

    #[test]
    fn create_unknown_type_fails() {
        let registry = ItemRegistry::with_builtins();
        let mut raw = mcq_json();
        raw["type"] = json!("essay_v1.long");
        let err = registry.create(&raw).unwrap_err();
        match err {
            ItemError::UnknownType {
                item_type,
                supported,
            } => {
                assert_eq!(item_type, "essay_v1.long");
                assert_eq!(supported.len(), 12);
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn create_without_concepts_is_malformed() {
        let registry = ItemRegistry::with_builtins();
        let mut raw = mcq_json();
        raw["conceptIds"] = json!([]);
        assert_eq!(registry.create(&raw).unwrap_err().field(), Some("conceptIds"));

        raw.as_object_mut().unwrap().remove("conceptIds");
        assert_eq!(registry.create(&raw).unwrap_err().field(), Some("conceptIds"));
    }

    #[test]
    fn create_without_type_is_malformed() {
        let registry = ItemRegistry::with_builtins();
        let mut raw = mcq_json();
        raw.as_object_mut().unwrap().remove("type");
        assert_eq!(registry.create(&raw).unwrap_err().field(), Some("type"));
        assert_eq!(
            registry.create(&json!("mcq")).unwrap_err().field(),
            Some("(root)")
        );
    }

    #[test]
    fn evaluate_unregistered_type_fails() {
        let registry = ItemRegistry::with_builtins();
        let item = registry.create(&mcq_json()).unwrap();
        let empty = ItemRegistry::new();
        let err = empty.evaluate(&item, &json!({"choiceId": "B"})).unwrap_err();
        assert!(matches!(err, ItemError::UnknownType { .. }));
    }

    #[test]
    fn fixture_types_register_and_normalise() {
        let mut registry = ItemRegistry::new();
        registry.register("fixture_v1.echo", echo_construct, echo_evaluate);

        let item = registry
            .create(&json!({
                "type": "fixture_v1.echo",
                "mode": "mediation",
                "skills": ["speaking"],
                "conceptIds": [1, 2, 3]
            }))
            .unwrap();

        let result = registry.evaluate(&item, &json!({"score": 4.0})).unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.concept_results.len(), 3);

        let result = registry.evaluate(&item, &json!({"score": -1.0})).unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn re_registration_overwrites() {
        let mut registry = ItemRegistry::with_builtins();
        registry.register(
            "mcq_v1.basic",
            |raw: &RawCandidate| {
                let base = ItemBase::parse(raw)?;
                Ok(PracticeItem::custom(base, json!({})))
            },
            |item: &PracticeItem, _: &Submission| Ok(item.evaluation(1.0, true, vec![], "always")),
        );
        assert_eq!(registry.supported_types().len(), 12);

        let item = registry.create(&mcq_json()).unwrap();
        assert!(matches!(item.payload(), ItemPayload::Custom(_)));
        let result = registry.evaluate(&item, &json!({"choiceId": "A"})).unwrap();
        assert_eq!(result.feedback, "always");
    }

    #[test]
    fn clones_are_independent() {
        let base = ItemRegistry::with_builtins();
        let mut extended = base.clone();
        extended.register("fixture_v1.echo", echo_construct, echo_evaluate);
        assert!(!base.is_supported("fixture_v1.echo"));
        assert!(extended.is_supported("fixture_v1.echo"));
    }

    #[test]
    fn to_json_round_trips_through_create() {
        let registry = ItemRegistry::with_builtins();
        let item = registry.create(&mcq_json()).unwrap();
        let again = registry.create(&item.to_json().unwrap()).unwrap();
        assert_eq!(item, again);
    }

    #[test]
    fn mismatched_payload_is_reported() {
        let mut registry = ItemRegistry::with_builtins();
        registry.register("mcq_v1.basic", echo_construct, crate::items::mcq::evaluate);
        let item = registry.create(&mcq_json()).unwrap();
        let err = registry.evaluate(&item, &json!({"choiceId": "B"})).unwrap_err();
        assert!(matches!(err, ItemError::PayloadMismatch { .. }));
    }
}
