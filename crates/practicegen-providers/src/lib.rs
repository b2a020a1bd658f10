//! practicegen-providers: LLM backends and the LLM-backed item generator.
//!
//! Implements `LlmProvider` for Anthropic, OpenAI, and Ollama, and wires a
//! provider, per-type prompt specs, and quality checks into an
//! [`LlmGenerator`] that satisfies the core `GenerationPort`.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod generator;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod quality;

pub use config::{create_provider, load_config, load_config_from, PracticegenConfig, ProviderConfig};
pub use error::ProviderError;
pub use generator::{GeneratorSettings, LlmGenerator};
pub use mock::MockProvider;
pub use prompt::{PromptPair, PromptSpec, PromptSpecs};
