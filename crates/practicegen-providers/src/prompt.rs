//! Prompt specs: how to ask a model for one item of a given type, and which
//! quality checks its answer must pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use practicegen_core::model::{
    ExerciseType, GenerationContext, RawCandidate, Script, Skill,
};

use crate::quality::{check_cloze, check_mcq};

/// Upper bound on vocabulary/distractor entries quoted in a prompt.
pub const MAX_LISTED_WORDS: usize = 12;

/// System and user message for the first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub type PromptBuilder = Arc<dyn Fn(&GenerationContext) -> PromptPair + Send + Sync>;
pub type QualityCheck = Arc<dyn Fn(&RawCandidate, &GenerationContext) -> Vec<String> + Send + Sync>;

/// Prompt construction and quality checks for one exercise type.
#[derive(Clone)]
pub struct PromptSpec {
    item_type: ExerciseType,
    build_prompt: PromptBuilder,
    quality_checks: Vec<QualityCheck>,
}

impl PromptSpec {
    pub fn new<B>(item_type: impl Into<ExerciseType>, build_prompt: B) -> Self
    where
        B: Fn(&GenerationContext) -> PromptPair + Send + Sync + 'static,
    {
        Self {
            item_type: item_type.into(),
            build_prompt: Arc::new(build_prompt),
            quality_checks: Vec::new(),
        }
    }

    pub fn with_check<Q>(mut self, check: Q) -> Self
    where
        Q: Fn(&RawCandidate, &GenerationContext) -> Vec<String> + Send + Sync + 'static,
    {
        self.quality_checks.push(Arc::new(check));
        self
    }

    pub fn item_type(&self) -> &ExerciseType {
        &self.item_type
    }

    pub fn build_prompt(&self, context: &GenerationContext) -> PromptPair {
        (self.build_prompt)(context)
    }

    /// Run every quality check; issues are concatenated in check order.
    pub fn quality_issues(&self, candidate: &RawCandidate, context: &GenerationContext) -> Vec<String> {
        self.quality_checks
            .iter()
            .flat_map(|check| check(candidate, context))
            .collect()
    }
}

impl fmt::Debug for PromptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptSpec")
            .field("item_type", &self.item_type)
            .field("quality_checks", &self.quality_checks.len())
            .finish()
    }
}

/// Prompt specs keyed by exercise type.
#[derive(Debug, Clone, Default)]
pub struct PromptSpecs {
    specs: HashMap<ExerciseType, PromptSpec>,
}

impl PromptSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specs for `mcq_v1.basic` and `cloze_v1.free_fill`.
    pub fn with_builtins() -> Self {
        let mut specs = Self::new();
        specs.register(mcq_basic());
        specs.register(cloze_free_fill());
        specs
    }

    /// Add or replace the spec for its type.
    pub fn register(&mut self, spec: PromptSpec) {
        self.specs.insert(spec.item_type.clone(), spec);
    }

    pub fn get(&self, item_type: &str) -> Option<&PromptSpec> {
        self.specs.get(&ExerciseType::from(item_type))
    }

    pub fn contains(&self, item_type: &str) -> bool {
        self.get(item_type).is_some()
    }

    /// Types with a spec, sorted.
    pub fn item_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.specs.keys().map(|t| t.to_string()).collect();
        types.sort();
        types
    }
}

// ---------------------------------------------------------------------------
// Shared prompt pieces
// ---------------------------------------------------------------------------

/// Surface form the item should drill: resolved form, then dictionary form,
/// then the first known vocabulary lemma.
pub fn focus_surface(context: &GenerationContext) -> Option<&str> {
    [
        context.focus.resolved.as_deref(),
        context.focus.target.as_deref(),
        context.targets.vocab.first().map(|v| v.lemma.as_str()),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|s| !s.is_empty())
}

fn script_line(context: &GenerationContext) -> Option<&'static str> {
    match (context.constraints.require_script, context.constraints.forbid_latin) {
        (Script::Cyrillic, _) => Some("- Use Cyrillic only (no Latin letters)."),
        (_, true) => Some("- Do not use Latin letters."),
        _ => None,
    }
}

fn id_list(context: &GenerationContext) -> String {
    let ids: Vec<String> = context
        .targets
        .concept_ids
        .iter()
        .map(ToString::to_string)
        .collect();
    format!("[{}]", ids.join(","))
}

fn skill_list(skills: &[Skill]) -> String {
    let quoted: Vec<String> = skills.iter().map(|s| format!("\"{s}\"")).collect();
    format!("[{}]", quoted.join(","))
}

fn familiar_vocab(context: &GenerationContext) -> Vec<String> {
    context
        .targets
        .vocab
        .iter()
        .take(MAX_LISTED_WORDS)
        .map(|v| format!("{} ({:.2})", v.lemma, v.mastery))
        .collect()
}

fn json_only_system(subject: &str) -> String {
    let role = format!("You generate {subject} for a language-learning app.");
    [
        role.as_str(),
        "Return ONLY valid JSON (no markdown, no commentary).",
        "All keys and strings must use double quotes.",
        "No trailing commas.",
    ]
    .join(" ")
}

// ---------------------------------------------------------------------------
// mcq_v1.basic
// ---------------------------------------------------------------------------

const MCQ_EXAMPLE: &str = r#"{
  "type": "mcq_v1.basic",
  "mode": "reception",
  "skills": ["reading"],
  "conceptIds": [123],
  "prompt": "Где метро?",
  "choices": [{"id":"A","text":"Там"},{"id":"B","text":"Здесь"},{"id":"C","text":"Сейчас"},{"id":"D","text":"Потом"}],
  "correctChoiceId": "B"
}"#;

fn build_mcq_prompt(context: &GenerationContext) -> PromptPair {
    let ids = id_list(context);
    let mut constraints = vec![
        format!("- Target language: {}", context.learner.target_language),
        format!("- Learner level: {}", context.learner.cefr),
        format!("- conceptIds must be {ids}"),
        format!(
            "- Keep the prompt under {} words; each choice under {} words.",
            context.constraints.max_prompt_words, context.constraints.max_choice_words
        ),
        "- Use EXACTLY these choice ids: \"A\",\"B\",\"C\",\"D\".".to_string(),
    ];
    if let Some(line) = script_line(context) {
        constraints.insert(2, line.to_string());
    }
    if let Some(focus) = focus_surface(context) {
        constraints.push(format!("- The correct choice must be exactly: {focus}"));
    }
    let distractors: Vec<&str> = context
        .focus
        .distractors
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .take(MAX_LISTED_WORDS)
        .collect();
    if !distractors.is_empty() {
        constraints.push(format!(
            "- Prefer these distractors: {}",
            distractors.join(", ")
        ));
    }

    let mut user = vec![
        "Generate ONE practice item JSON for this schema:".to_string(),
        "{".to_string(),
        "  \"type\": \"mcq_v1.basic\",".to_string(),
        format!("  \"mode\": \"{}\",", context.session.mode),
        format!("  \"skills\": {},", skill_list(&context.session.skills)),
        format!("  \"conceptIds\": {ids},"),
        "  \"prompt\": string,".to_string(),
        "  \"choices\": [{\"id\":\"A\",\"text\":string},{\"id\":\"B\",\"text\":string},{\"id\":\"C\",\"text\":string},{\"id\":\"D\",\"text\":string}],".to_string(),
        "  \"correctChoiceId\": \"A\" | \"B\" | \"C\" | \"D\"".to_string(),
        "}".to_string(),
        String::new(),
        "Constraints:".to_string(),
    ];
    user.extend(constraints);
    user.push(String::new());
    user.push("Example valid output:".to_string());
    user.push(MCQ_EXAMPLE.to_string());

    PromptPair {
        system: json_only_system("content"),
        user: user.join("\n"),
    }
}

/// Spec for `mcq_v1.basic`.
pub fn mcq_basic() -> PromptSpec {
    PromptSpec::new(ExerciseType::MCQ_BASIC, build_mcq_prompt)
        .with_check(|candidate, context| check_mcq(candidate, &context.constraints, None))
}

// ---------------------------------------------------------------------------
// cloze_v1.free_fill
// ---------------------------------------------------------------------------

const CLOZE_EXAMPLE: &str = r#"{"type":"cloze_v1.free_fill","mode":"production","skills":["writing"],"conceptIds":[123],"parts":[{"type":"text","value":"Мы идем на "},{"type":"blank","id":"b1","accepted":["вокзал"],"conceptId":123},{"type":"text","value":" после работы."}]}"#;

const CLOZE_RULES: &[&str] = &[
    "- Keep it short (<= 12 words total).",
    "- Keep total JSON output concise (target <= 420 characters).",
    "- parts must be EXACTLY 3 elements: text, blank, text.",
    "- blank can be anywhere in the sentence, but text before and after must both be non-empty.",
    "- Use exactly ONE blank with id \"b1\".",
    "- accepted must be an inflected/conjugated form set of the SAME target lemma (word family), not a different word.",
    "- The blank accepted list must include all valid answer forms for this exact sentence context.",
    "- Do not use the blank answer form anywhere else in the sentence text.",
    "- Do not include distractors in accepted.",
    "- If there is only one valid form, accepted should have exactly one value.",
    "- If multiple forms are valid (e.g., gender variants), include each valid form.",
    "- Keep accepted to 1-4 concise forms.",
    "- The blank conceptId must be one of conceptIds.",
    "- Do NOT include glosses, translations, or lemma hints in parentheses in the sentence.",
    "- The sentence itself must stay entirely in the target language/script.",
];

fn build_cloze_prompt(context: &GenerationContext) -> PromptPair {
    let ids = id_list(context);
    let skills = skill_list(&context.session.skills);

    let mut constraints = vec![
        format!("- Target language: {}", context.learner.target_language),
        format!("- Learner level: {}", context.learner.cefr),
        format!("- conceptIds must be {ids}"),
        format!("- Mode must be \"{}\".", context.session.mode),
        format!("- Skills must be {skills}."),
    ];
    constraints.extend(CLOZE_RULES.iter().map(|r| r.to_string()));
    if let Some(line) = script_line(context) {
        constraints.insert(2, line.to_string());
    }

    let vocab = familiar_vocab(context);
    let familiarity = if vocab.is_empty() {
        "- No familiarity list available. Use level-appropriate words.".to_string()
    } else {
        format!(
            "- Prefer using familiar vocabulary for non-blank words when natural: {}",
            vocab.join(", ")
        )
    };

    let mut user = vec![
        "Generate ONE cloze JSON object.".to_string(),
        "{".to_string(),
        "  \"type\": \"cloze_v1.free_fill\",".to_string(),
        format!("  \"mode\": \"{}\",", context.session.mode),
        format!("  \"skills\": {skills},"),
        format!("  \"conceptIds\": {ids},"),
        "  \"parts\": Array<".to_string(),
        "    | { \"type\":\"text\",  \"value\": string }".to_string(),
        "    | { \"type\":\"blank\", \"id\": string, \"accepted\": string[], \"conceptId\": number }"
            .to_string(),
        "  >".to_string(),
        "}".to_string(),
        String::new(),
        "Constraints:".to_string(),
    ];
    user.extend(constraints);
    user.extend([
        String::new(),
        "Preferred familiarity guidance (soft constraint):".to_string(),
        familiarity,
        "- This is guidance, not a hard rule.".to_string(),
        format!(
            "- Focus target lemma: {}",
            focus_surface(context).unwrap_or_default()
        ),
        String::new(),
        "Example valid output:".to_string(),
        CLOZE_EXAMPLE.to_string(),
        String::new(),
        "Return ONLY one compact JSON object.".to_string(),
    ]);

    PromptPair {
        system: [
            "You generate cloze items for a language-learning app.",
            "Return ONLY valid compact JSON on one line.",
            "No markdown, no code fences, no commentary.",
            "Use double quotes for all keys and strings.",
        ]
        .join(" "),
        user: user.join("\n"),
    }
}

/// Spec for `cloze_v1.free_fill`.
pub fn cloze_free_fill() -> PromptSpec {
    PromptSpec::new(ExerciseType::CLOZE_FREE_FILL, build_cloze_prompt).with_check(
        |candidate, context| {
            check_cloze(
                candidate,
                &context.constraints,
                focus_surface(context),
                context.focus.concept_id,
            )
        },
    )
}
