//! LLM-backed generation port.
//!
//! [`LlmGenerator`] turns a prompt spec into chat completions and keeps
//! asking until the model returns a candidate that parses, constructs through
//! the item registry, and passes the spec's quality checks. Every failure is
//! folded into the returned [`GenerateOutcome`]; nothing is raised.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use practicegen_core::model::{ExerciseType, GenerationContext};
use practicegen_core::registry::ItemRegistry;
use practicegen_core::traits::{
    extract_json, ChatMessage, CompletionRequest, GenerateOptions, GenerateOutcome,
    GenerationPort, LlmProvider, PartialSink,
};

use crate::prompt::{PromptPair, PromptSpecs};
use crate::quality::format_bullet_issues;

/// Completion parameters for the attempt loop.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    pub model: String,
    /// Per-attempt completion timeout.
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Temperature of the first attempt.
    pub first_temperature: f64,
    /// Temperature of repair attempts.
    pub repair_temperature: f64,
    pub stop: Vec<String>,
    /// Characters of raw output kept in failure logs.
    pub log_raw_chars: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: "claude-haiku-4-5-20251001".to_string(),
            timeout: Duration::from_millis(25_000),
            max_tokens: 260,
            first_temperature: 0.4,
            repair_temperature: 0.2,
            stop: Vec::new(),
            log_raw_chars: 500,
        }
    }
}

/// Generation port backed by a chat-completion provider.
pub struct LlmGenerator {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ItemRegistry>,
    specs: Arc<PromptSpecs>,
    settings: GeneratorSettings,
}

impl LlmGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ItemRegistry>,
        specs: Arc<PromptSpecs>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            provider,
            registry,
            specs,
            settings,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn specs(&self) -> &PromptSpecs {
        &self.specs
    }
}

/// What the previous attempt left behind, for the repair prompt.
#[derive(Default)]
struct AttemptState {
    raw_text: String,
    json_text: String,
    had_parsable_json: bool,
    last_error: String,
    quality_issues: Vec<String>,
}

impl AttemptState {
    fn fail(&mut self, error: String) {
        self.quality_issues.clear();
        self.last_error = error;
    }

    fn repair_prompt(&self) -> String {
        let mut prompt = String::from(
            "Fix the JSON to satisfy BOTH structure and quality requirements. Return ONLY corrected JSON.\n\n",
        );
        if self.had_parsable_json {
            prompt.push_str(&format!("Current JSON:\n{}\n\n", self.json_text));
        } else {
            prompt.push_str(&format!(
                "Previous output (may be invalid):\n{}\n\n",
                self.raw_text
            ));
        }
        if !self.last_error.is_empty() {
            prompt.push_str(&format!(
                "Structure/validation errors:\n{}\n\n",
                self.last_error
            ));
        }
        if !self.quality_issues.is_empty() {
            prompt.push_str(&format!(
                "Quality issues:\n{}\n\n",
                format_bullet_issues(&self.quality_issues)
            ));
        }
        prompt.push_str("Return ONLY corrected JSON.");
        prompt
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl GenerationPort for LlmGenerator {
    async fn generate(
        &self,
        item_type: &ExerciseType,
        context: &GenerationContext,
        on_partial: Option<&PartialSink<'_>>,
        options: GenerateOptions,
    ) -> GenerateOutcome {
        let Some(spec) = self.specs.get(item_type.as_str()) else {
            tracing::warn!("no prompt spec registered for {item_type}");
            return GenerateOutcome::failure(
                format!("no prompt spec registered for type \"{item_type}\""),
                0,
            );
        };

        let PromptPair { system, user } = spec.build_prompt(context);
        let max_attempts = options.max_attempts.max(1);
        let mut state = AttemptState::default();

        tracing::debug!(
            system_chars = system.len(),
            user_chars = user.len(),
            "generate({item_type}) start, up to {max_attempts} attempts"
        );

        for attempt in 1..=max_attempts {
            let (follow_up, temperature) = if attempt == 1 || state.raw_text.is_empty() {
                (user.clone(), self.settings.first_temperature)
            } else {
                (state.repair_prompt(), self.settings.repair_temperature)
            };
            let request = CompletionRequest {
                model: self.settings.model.clone(),
                messages: vec![ChatMessage::system(system.clone()), ChatMessage::user(follow_up)],
                max_tokens: self.settings.max_tokens,
                temperature,
                stop: self.settings.stop.clone(),
            };

            let started = Instant::now();
            let completion = tokio::time::timeout(
                self.settings.timeout,
                self.provider.complete(&request, on_partial),
            )
            .await;
            let elapsed_ms = started.elapsed().as_millis();

            let response = match completion {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    state.fail(format!("{e:#}"));
                    tracing::warn!(
                        "({item_type}) attempt {attempt}/{max_attempts} LLM error after {elapsed_ms}ms: {}",
                        state.last_error
                    );
                    continue;
                }
                Err(_) => {
                    state.fail(format!(
                        "LLM({item_type}) timed out after {}ms",
                        self.settings.timeout.as_millis()
                    ));
                    tracing::warn!("({item_type}) attempt {attempt}/{max_attempts} timed out");
                    continue;
                }
            };

            tracing::debug!(
                raw_chars = response.text.len(),
                "({item_type}) attempt {attempt} completed in {elapsed_ms}ms"
            );

            state.raw_text = response.text;
            state.json_text = extract_json(&state.raw_text)
                .unwrap_or(&state.raw_text)
                .to_string();

            let parsed: Value = match serde_json::from_str(&state.json_text) {
                Ok(parsed) => {
                    state.had_parsable_json = true;
                    parsed
                }
                Err(e) => {
                    state.had_parsable_json = false;
                    state.fail(format!("JSON parse error: {e}"));
                    tracing::warn!(
                        "({item_type}) attempt {attempt} parse failed: {}",
                        state.last_error
                    );
                    tracing::debug!(
                        "({item_type}) raw snippet: {}",
                        snippet(&state.raw_text, self.settings.log_raw_chars)
                    );
                    continue;
                }
            };

            let validation = self.registry.create(&parsed).and_then(|item| {
                if item.item_type() == item_type {
                    Ok(())
                } else {
                    Err(practicegen_core::ItemError::malformed(
                        item.item_type().as_str(),
                        "type",
                        format!("expected \"{item_type}\""),
                    ))
                }
            });
            if let Err(e) = validation {
                state.fail(e.to_string());
                tracing::warn!(
                    "({item_type}) attempt {attempt} schema failed: {}",
                    state.last_error
                );
                tracing::debug!(
                    "({item_type}) json snippet: {}",
                    snippet(&state.json_text, self.settings.log_raw_chars)
                );
                continue;
            }

            let issues = spec.quality_issues(&parsed, context);
            if issues.is_empty() {
                tracing::debug!("generate({item_type}) succeeded on attempt {attempt}");
                return GenerateOutcome::success(parsed, state.raw_text, attempt);
            }

            tracing::warn!("({item_type}) attempt {attempt} quality issues: {issues:?}");
            state.quality_issues = issues;
            state.last_error.clear();
        }

        let error = if !state.last_error.is_empty() {
            state.last_error
        } else if !state.quality_issues.is_empty() {
            "quality check failed".to_string()
        } else {
            "unknown error".to_string()
        };
        tracing::warn!(
            "generate({item_type}) failed after {max_attempts} attempts: {error}"
        );

        GenerateOutcome {
            ok: false,
            parsed: None,
            raw_text: state.raw_text,
            attempts: max_attempts,
            error: Some(error),
            quality_issues: state.quality_issues,
        }
    }
}
