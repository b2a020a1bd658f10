//! The validated practice item and the helpers item types use to build one.
//!
//! Every item type shares the same metadata contract (`type`, `mode`,
//! `skills`, `conceptIds`) and carries one variant of [`ItemPayload`].
//! Items are immutable once constructed: fields are only reachable through
//! accessors, and the only way to obtain an [`ItemBase`] is [`ItemBase::parse`],
//! which enforces the non-empty `conceptIds` invariant.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ItemError, Result};
use crate::items::{
    audio_matching::AudioMatchingPayload,
    cloze::ClozePayload,
    flashcard::FlashcardPayload,
    interaction::{FreeReplyPayload, RespondToPromptPayload},
    matching::MatchingPayload,
    mcq::McqPayload,
    ordering::OrderingPayload,
    short_answer::ShortAnswerPayload,
    spoken::SpokenAnswerPayload,
    summarize::SummarizePayload,
    translate::TranslatePayload,
};
use crate::model::{
    ConceptId, ConceptResult, EvaluationResult, ExerciseType, PracticeMode, RawCandidate, Skill,
    Submission,
};

/// Type-specific content of a practice item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemPayload {
    Mcq(McqPayload),
    Cloze(ClozePayload),
    Flashcard(FlashcardPayload),
    ShortAnswer(ShortAnswerPayload),
    Ordering(OrderingPayload),
    Matching(MatchingPayload),
    AudioMatching(AudioMatchingPayload),
    SpokenAnswer(SpokenAnswerPayload),
    FreeReply(FreeReplyPayload),
    RespondToPrompt(RespondToPromptPayload),
    Summarize(SummarizePayload),
    Translate(TranslatePayload),
    /// Payload of a type registered at runtime outside the built-in set.
    Custom(Value),
}

impl ItemPayload {
    /// Short name of the variant, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemPayload::Mcq(_) => "mcq",
            ItemPayload::Cloze(_) => "cloze",
            ItemPayload::Flashcard(_) => "flashcard",
            ItemPayload::ShortAnswer(_) => "short_answer",
            ItemPayload::Ordering(_) => "ordering",
            ItemPayload::Matching(_) => "matching",
            ItemPayload::AudioMatching(_) => "audio_matching",
            ItemPayload::SpokenAnswer(_) => "spoken_answer",
            ItemPayload::FreeReply(_) => "free_reply",
            ItemPayload::RespondToPrompt(_) => "respond_to_prompt",
            ItemPayload::Summarize(_) => "summarize",
            ItemPayload::Translate(_) => "translate",
            ItemPayload::Custom(_) => "custom",
        }
    }
}

/// Shared, validated metadata of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBase {
    item_type: ExerciseType,
    mode: PracticeMode,
    skills: Vec<Skill>,
    concept_ids: Vec<ConceptId>,
}

impl ItemBase {
    /// Validate the metadata fields common to every item type.
    pub fn parse(raw: &RawCandidate) -> Result<Self> {
        let declared = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("(unknown)");
        let fields = Fields::of(declared, raw)?;

        let item_type: String = fields.non_empty_string("type")?;
        let mode: PracticeMode = fields.required("mode")?;
        let skills: Vec<Skill> = fields.non_empty_vec("skills")?;
        let concept_ids: Vec<ConceptId> = fields.non_empty_vec("conceptIds")?;

        Ok(Self {
            item_type: ExerciseType::new(item_type),
            mode,
            skills,
            concept_ids,
        })
    }

    pub fn item_type(&self) -> &ExerciseType {
        &self.item_type
    }

    pub fn concept_ids(&self) -> &[ConceptId] {
        &self.concept_ids
    }
}

/// A validated, typed practice item.
///
/// Built-in items come only from the registry's constructors; outside the
/// crate a payload cannot be attached to an item without going through them.
///
/// ```compile_fail
/// use practicegen_core::items::mcq::McqPayload;
/// use practicegen_core::item::{ItemBase, ItemPayload, PracticeItem};
///
/// let base = ItemBase::parse(&serde_json::json!({
///     "type": "mcq_v1.basic", "mode": "reception",
///     "skills": ["reading"], "conceptIds": [1]
/// }))
/// .unwrap();
/// let payload = McqPayload {
///     prompt: "?".into(),
///     choices: vec![],
///     correct_choice_id: "Z".into(),
/// };
/// let item = PracticeItem::new(base, ItemPayload::Mcq(payload));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeItem {
    base: ItemBase,
    payload: ItemPayload,
}

impl PracticeItem {
    /// Built-in constructors only: they validate `payload` before calling this.
    pub(crate) fn new(base: ItemBase, payload: ItemPayload) -> Self {
        Self { base, payload }
    }

    /// An item of a type registered outside the built-in set, carrying its
    /// raw payload as-is.
    pub fn custom(base: ItemBase, payload: Value) -> Self {
        Self::new(base, ItemPayload::Custom(payload))
    }

    pub fn item_type(&self) -> &ExerciseType {
        &self.base.item_type
    }

    pub fn mode(&self) -> PracticeMode {
        self.base.mode
    }

    pub fn skills(&self) -> &[Skill] {
        &self.base.skills
    }

    /// Concepts under test; never empty.
    pub fn concept_ids(&self) -> &[ConceptId] {
        &self.base.concept_ids
    }

    /// The first concept, used as the fallback attribution target.
    pub fn primary_concept(&self) -> ConceptId {
        self.base.concept_ids[0]
    }

    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    /// Serialise back to the raw candidate form accepted by the registry.
    pub fn to_json(&self) -> serde_json::Result<RawCandidate> {
        let mut object = match serde_json::to_value(&self.payload)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("type".into(), serde_json::to_value(&self.base.item_type)?);
        object.insert("mode".into(), serde_json::to_value(self.base.mode)?);
        object.insert("skills".into(), serde_json::to_value(&self.base.skills)?);
        object.insert(
            "conceptIds".into(),
            serde_json::to_value(&self.base.concept_ids)?,
        );
        Ok(Value::Object(object))
    }

    /// Assemble an evaluation result carrying this item's metadata.
    ///
    /// The score is clamped into `0.0..=1.0`; an empty concept list is
    /// replaced by one entry per concept id carrying the overall score.
    pub fn evaluation(
        &self,
        score: f64,
        is_correct: bool,
        concept_results: Vec<ConceptResult>,
        feedback: impl Into<String>,
    ) -> EvaluationResult {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let concept_results = if concept_results.is_empty() {
            self.uniform_concept_results(score, is_correct, Value::Null)
        } else {
            concept_results
        };

        EvaluationResult {
            item_type: self.base.item_type.clone(),
            mode: self.base.mode,
            skills: self.base.skills.clone(),
            is_correct,
            score,
            concept_results,
            feedback: feedback.into(),
        }
    }

    /// One concept result per concept id, all with the same score.
    pub fn uniform_concept_results(
        &self,
        score: f64,
        is_correct: bool,
        evidence: Value,
    ) -> Vec<ConceptResult> {
        self.base
            .concept_ids
            .iter()
            .map(|&concept_id| ConceptResult {
                concept_id,
                score,
                max_score: 1.0,
                is_correct,
                evidence: evidence.clone(),
            })
            .collect()
    }

    /// Error for an evaluator handed an item of a different payload variant.
    pub fn payload_mismatch(&self, expected: &str) -> ItemError {
        ItemError::PayloadMismatch {
            expected: expected.to_string(),
            actual: format!("{} ({})", self.base.item_type, self.payload.kind()),
        }
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Field-by-field reader over a raw JSON object.
///
/// Each accessor reports the offending field name in its error.
pub struct Fields<'a> {
    item_type: &'a str,
    object: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn of(item_type: &'a str, raw: &'a RawCandidate) -> Result<Self> {
        match raw.as_object() {
            Some(object) => Ok(Self { item_type, object }),
            None => Err(ItemError::malformed(
                item_type,
                "(root)",
                "expected a JSON object",
            )),
        }
    }

    /// A required field deserialised into `T`.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        match self.object.get(name) {
            None | Some(Value::Null) => Err(self.malformed(name, "required field is missing")),
            Some(value) => T::deserialize(value).map_err(|e| self.malformed(name, e.to_string())),
        }
    }

    /// An optional field; absent and `null` both yield `None`.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.object.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| self.malformed(name, e.to_string())),
        }
    }

    /// A required string with at least one non-whitespace character.
    pub fn non_empty_string(&self, name: &str) -> Result<String> {
        let value: String = self.required(name)?;
        if value.trim().is_empty() {
            return Err(self.malformed(name, "must not be empty"));
        }
        Ok(value)
    }

    /// A required array with at least one element.
    pub fn non_empty_vec<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let values: Vec<T> = self.required(name)?;
        if values.is_empty() {
            return Err(self.malformed(name, "must contain at least one entry"));
        }
        Ok(values)
    }

    pub fn malformed(&self, field: &str, reason: impl Into<String>) -> ItemError {
        ItemError::malformed(self.item_type, field, reason)
    }
}

/// Deserialise a submission into the evaluator's expected shape.
pub fn parse_submission<T: DeserializeOwned>(item: &PracticeItem, submission: &Submission) -> Result<T> {
    if !submission.is_object() {
        return Err(ItemError::invalid_submission(
            item.item_type().as_str(),
            "expected a JSON object",
        ));
    }
    T::deserialize(submission)
        .map_err(|e| ItemError::invalid_submission(item.item_type().as_str(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_json() -> Value {
        json!({
            "type": "fixture_v1.echo",
            "mode": "reception",
            "skills": ["reading"],
            "conceptIds": [3, 4]
        })
    }

    #[test]
    fn parses_base_fields() {
        let base = ItemBase::parse(&base_json()).unwrap();
        assert_eq!(base.item_type(), &ExerciseType::from("fixture_v1.echo"));
        assert_eq!(base.concept_ids(), &[3, 4]);
    }

    #[test]
    fn rejects_missing_or_empty_concepts() {
        let mut raw = base_json();
        raw["conceptIds"] = json!([]);
        let err = ItemBase::parse(&raw).unwrap_err();
        assert_eq!(err.field(), Some("conceptIds"));

        raw.as_object_mut().unwrap().remove("conceptIds");
        let err = ItemBase::parse(&raw).unwrap_err();
        assert_eq!(err.field(), Some("conceptIds"));
    }

    #[test]
    fn rejects_bad_mode_and_skills() {
        let mut raw = base_json();
        raw["mode"] = json!("dictation");
        assert_eq!(ItemBase::parse(&raw).unwrap_err().field(), Some("mode"));

        let mut raw = base_json();
        raw["skills"] = json!([]);
        assert_eq!(ItemBase::parse(&raw).unwrap_err().field(), Some("skills"));
    }

    #[test]
    fn rejects_non_object() {
        let err = ItemBase::parse(&json!([1, 2])).unwrap_err();
        assert_eq!(err.field(), Some("(root)"));
    }

    #[test]
    fn evaluation_clamps_and_fills_concepts() {
        let item = PracticeItem::custom(ItemBase::parse(&base_json()).unwrap(), json!({}));
        let result = item.evaluation(1.7, true, vec![], "ok");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.concept_results.len(), 2);

        let result = item.evaluation(f64::NAN, false, vec![], "");
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn submission_must_be_object() {
        #[derive(Debug, serde::Deserialize)]
        struct Echo {
            #[allow(dead_code)]
            text: String,
        }
        let item = PracticeItem::custom(ItemBase::parse(&base_json()).unwrap(), json!({}));
        let err = parse_submission::<Echo>(&item, &json!("hi")).unwrap_err();
        assert!(matches!(err, ItemError::InvalidSubmission { .. }));
        let err = parse_submission::<Echo>(&item, &json!({"txt": "hi"})).unwrap_err();
        assert!(err.to_string().contains("text"));
    }
}
