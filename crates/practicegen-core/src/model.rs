//! Core data model types for practicegen.
//!
//! These are the shared types that flow between the generation port, the
//! prefetch buffer, and the item registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a concept under test (a vocabulary entry or grammar point).
pub type ConceptId = u64;

/// Untyped structured data produced by a generation port, not yet validated.
pub type RawCandidate = serde_json::Value;

/// Untyped structured data representing a learner's answer.
pub type Submission = serde_json::Value;

/// Identifier selecting an item type's constructor/evaluator and prompt family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseType(String);

impl ExerciseType {
    pub const MCQ_BASIC: &'static str = "mcq_v1.basic";
    pub const CLOZE_FREE_FILL: &'static str = "cloze_v1.free_fill";
    pub const FLASHCARD_BASIC: &'static str = "flashcard_v1.basic";
    pub const SHORT_ANSWER_BASIC: &'static str = "short_answer_v1.basic";
    pub const ORDERING_WORD_ORDER: &'static str = "ordering_v1.word_order";
    pub const MATCHING_PAIRWISE: &'static str = "matching_v1.pairwise";
    pub const MATCHING_AUDIO_TO_TEXT: &'static str = "matching_v1.audio_to_text";
    pub const SHORT_ANSWER_SPOKEN_STUB: &'static str = "short_answer_v1.spoken_stub";
    pub const INTERACTION_FREE_REPLY_TURN: &'static str = "interaction_v1.free_reply_turn";
    pub const INTERACTION_RESPOND_TO_PROMPT: &'static str = "interaction_v1.respond_to_prompt";
    pub const MEDIATION_SUMMARIZE_TEXT: &'static str = "mediation_v1.summarize_text";
    pub const MEDIATION_TRANSLATE_SENTENCE: &'static str = "mediation_v1.translate_sentence";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExerciseType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ExerciseType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for ExerciseType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ExerciseType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Presentation/elicitation mode of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    Reception,
    Production,
    Interaction,
    Mediation,
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeMode::Reception => write!(f, "reception"),
            PracticeMode::Production => write!(f, "production"),
            PracticeMode::Interaction => write!(f, "interaction"),
            PracticeMode::Mediation => write!(f, "mediation"),
        }
    }
}

impl FromStr for PracticeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reception" => Ok(PracticeMode::Reception),
            "production" => Ok(PracticeMode::Production),
            "interaction" => Ok(PracticeMode::Interaction),
            "mediation" => Ok(PracticeMode::Mediation),
            other => Err(format!("unknown practice mode: {other}")),
        }
    }
}

/// Atomic language skill exercised by an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skill::Reading => write!(f, "reading"),
            Skill::Listening => write!(f, "listening"),
            Skill::Writing => write!(f, "writing"),
            Skill::Speaking => write!(f, "speaking"),
        }
    }
}

/// CEFR proficiency band of the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cefr {
    A1,
    A2,
    B1,
    B2,
}

impl fmt::Display for Cefr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cefr::A1 => write!(f, "A1"),
            Cefr::A2 => write!(f, "A2"),
            Cefr::B1 => write!(f, "B1"),
            Cefr::B2 => write!(f, "B2"),
        }
    }
}

/// Script restriction applied to generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Cyrillic,
    Latin,
    Any,
}

// ---------------------------------------------------------------------------
// Generation context
// ---------------------------------------------------------------------------

/// Caller-supplied pedagogical context for generation.
///
/// The prefetch buffer never looks inside it; it is passed through to the
/// generation port unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub learner: Learner,
    pub session: SessionFocus,
    pub targets: Targets,
    #[serde(default)]
    pub focus: Focus,
    #[serde(default)]
    pub constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learner {
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_cefr")]
    pub cefr: Cefr,
    #[serde(default = "default_native_language")]
    pub native_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFocus {
    pub mode: PracticeMode,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub concept_ids: Vec<ConceptId>,
    #[serde(default)]
    pub vocab: Vec<VocabEntry>,
    #[serde(default)]
    pub grammar_focus: Vec<String>,
}

/// A known vocabulary item and how well the learner knows it (0..=1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub lemma: String,
    #[serde(default)]
    pub mastery: f64,
}

/// The concept being drilled and the surface forms to use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Focus {
    #[serde(default)]
    pub concept_id: Option<ConceptId>,
    /// Dictionary form of the target.
    #[serde(default)]
    pub target: Option<String>,
    /// Inflected form resolved for this exercise.
    #[serde(default)]
    pub resolved: Option<String>,
    #[serde(default)]
    pub distractors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default = "default_max_prompt_words")]
    pub max_prompt_words: usize,
    #[serde(default = "default_max_choice_words")]
    pub max_choice_words: usize,
    #[serde(default = "default_require_script")]
    pub require_script: Script,
    #[serde(default = "default_true")]
    pub forbid_latin: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_prompt_words: default_max_prompt_words(),
            max_choice_words: default_max_choice_words(),
            require_script: default_require_script(),
            forbid_latin: true,
        }
    }
}

fn default_cefr() -> Cefr {
    Cefr::A1
}
fn default_native_language() -> String {
    "English".to_string()
}
fn default_target_language() -> String {
    "Russian".to_string()
}
fn default_max_prompt_words() -> usize {
    10
}
fn default_max_choice_words() -> usize {
    8
}
fn default_require_script() -> Script {
    Script::Cyrillic
}
fn default_true() -> bool {
    true
}

impl GenerationContext {
    /// Start building a context for the given session and concepts.
    pub fn builder(
        mode: PracticeMode,
        skills: Vec<Skill>,
        concept_ids: Vec<ConceptId>,
    ) -> GenerationContextBuilder {
        GenerationContextBuilder {
            context: GenerationContext {
                learner: Learner {
                    user_id: String::new(),
                    cefr: default_cefr(),
                    native_language: default_native_language(),
                    target_language: default_target_language(),
                },
                session: SessionFocus { mode, skills },
                targets: Targets {
                    concept_ids,
                    vocab: Vec::new(),
                    grammar_focus: Vec::new(),
                },
                focus: Focus::default(),
                constraints: Constraints::default(),
            },
        }
    }
}

/// Builder applying learner and constraint defaults.
#[derive(Debug, Clone)]
pub struct GenerationContextBuilder {
    context: GenerationContext,
}

impl GenerationContextBuilder {
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.context.learner.user_id = user_id.into();
        self
    }

    pub fn cefr(mut self, cefr: Cefr) -> Self {
        self.context.learner.cefr = cefr;
        self
    }

    pub fn languages(mut self, native: impl Into<String>, target: impl Into<String>) -> Self {
        self.context.learner.native_language = native.into();
        self.context.learner.target_language = target.into();
        self
    }

    pub fn vocab(mut self, vocab: Vec<VocabEntry>) -> Self {
        self.context.targets.vocab = vocab;
        self
    }

    pub fn grammar_focus(mut self, grammar_focus: Vec<String>) -> Self {
        self.context.targets.grammar_focus = grammar_focus;
        self
    }

    pub fn focus(mut self, focus: Focus) -> Self {
        self.context.focus = focus;
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.context.constraints = constraints;
        self
    }

    pub fn build(self) -> GenerationContext {
        self.context
    }
}

// ---------------------------------------------------------------------------
// Evaluation results
// ---------------------------------------------------------------------------

/// Credit attributed to one concept by an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptResult {
    pub concept_id: ConceptId,
    pub score: f64,
    pub max_score: f64,
    pub is_correct: bool,
    #[serde(default)]
    pub evidence: serde_json::Value,
}

/// Outcome of scoring a submission against an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    #[serde(rename = "type")]
    pub item_type: ExerciseType,
    pub mode: PracticeMode,
    pub skills: Vec<Skill>,
    pub is_correct: bool,
    /// Overall score in `0.0..=1.0`.
    pub score: f64,
    /// Per-concept credit, never empty.
    pub concept_results: Vec<ConceptResult>,
    #[serde(default)]
    pub feedback: String,
}
