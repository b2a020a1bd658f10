//! Core trait definitions for generation ports and LLM providers.
//!
//! `GenerationPort` is what the prefetch buffer consumes; `LlmProvider` is the
//! lower-level chat completion backend that the LLM-backed generator in
//! `practicegen-providers` builds on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ExerciseType, GenerationContext, RawCandidate};

/// Callback receiving the accumulated text of a streaming completion.
pub type PartialSink<'a> = dyn Fn(&str) + Send + Sync + 'a;

// ---------------------------------------------------------------------------
// Generation port
// ---------------------------------------------------------------------------

/// Default attempt budget handed to a generation port.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Options for one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Attempts the port may spend before reporting failure.
    pub max_attempts: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Result of one generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOutcome {
    /// Whether a usable candidate was produced.
    pub ok: bool,
    /// The candidate; present exactly when `ok`.
    pub parsed: Option<RawCandidate>,
    /// Raw model text of the last attempt.
    pub raw_text: String,
    /// Attempts actually spent.
    pub attempts: u32,
    /// Last structural/transport error, if the request failed.
    pub error: Option<String>,
    /// Quality issues reported for the last attempt.
    pub quality_issues: Vec<String>,
}

impl GenerateOutcome {
    pub fn success(parsed: RawCandidate, raw_text: impl Into<String>, attempts: u32) -> Self {
        Self {
            ok: true,
            parsed: Some(parsed),
            raw_text: raw_text.into(),
            attempts,
            error: None,
            quality_issues: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>, attempts: u32) -> Self {
        Self {
            ok: false,
            parsed: None,
            raw_text: String::new(),
            attempts,
            error: Some(error.into()),
            quality_issues: Vec::new(),
        }
    }

    /// The candidate, if the request succeeded.
    pub fn into_candidate(self) -> Option<RawCandidate> {
        if self.ok {
            self.parsed
        } else {
            None
        }
    }
}

/// Produces raw exercise candidates for a type and context.
///
/// Implementations must be safe to call repeatedly and concurrently, and
/// report failures through `GenerateOutcome::ok` rather than by panicking.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(
        &self,
        item_type: &ExerciseType,
        context: &GenerationContext,
        on_partial: Option<&PartialSink<'_>>,
        options: GenerateOptions,
    ) -> GenerateOutcome;
}

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Run one chat completion. `on_partial` receives accumulated text as it
    /// arrives; non-streaming backends call it once with the full text.
    async fn complete(
        &self,
        request: &CompletionRequest,
        on_partial: Option<&PartialSink<'_>>,
    ) -> anyhow::Result<CompletionResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation, system message first.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Stop sequences.
    #[serde(default)]
    pub stop: Vec<String>,
}

impl CompletionRequest {
    /// The system message, if the conversation starts with one.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Every non-system message, in order.
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text.
    pub text: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Cost per 1K input tokens in USD.
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens in USD.
    pub cost_per_1k_output: f64,
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Extract the outermost `{ ... }` slice from model output.
///
/// Handles prose before/after the object and markdown fences around it.
/// Returns `None` when there is no opening brace followed by a closing one.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}
