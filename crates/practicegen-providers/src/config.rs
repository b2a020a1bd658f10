//! Configuration loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use practicegen_core::prefetch::PrefetchConfig;
use practicegen_core::traits::{LlmProvider, DEFAULT_MAX_ATTEMPTS};

use crate::anthropic::AnthropicProvider;
use crate::generator::GeneratorSettings;
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    /// Offline provider answering every prompt with `response`.
    Mock {
        #[serde(default)]
        response: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { response } => f
                .debug_struct("Mock")
                .field("response_chars", &response.len())
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Completion and retry settings for the LLM generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_attempts: u32,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub first_temperature: f64,
    pub repair_temperature: f64,
    pub stop: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_ms: 25_000,
            max_tokens: 260,
            first_temperature: 0.4,
            repair_temperature: 0.2,
            stop: Vec::new(),
        }
    }
}

/// Watermarks for the prefetch buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchSettings {
    pub batch_size: usize,
    pub target_level: usize,
    pub low_watermark: usize,
    pub parallel: bool,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        let defaults = PrefetchConfig::default();
        Self {
            batch_size: defaults.batch_size,
            target_level: defaults.target_level,
            low_watermark: defaults.low_watermark,
            parallel: defaults.parallel,
        }
    }
}

/// Top-level practicegen configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticegenConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default provider to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Default model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub prefetch: PrefetchSettings,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

impl Default for PracticegenConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            generation: GenerationSettings::default(),
            prefetch: PrefetchSettings::default(),
        }
    }
}

impl PracticegenConfig {
    /// Generator settings for `model`, or the default model.
    pub fn generator_settings(&self, model: Option<&str>) -> GeneratorSettings {
        GeneratorSettings {
            model: model.unwrap_or(&self.default_model).to_string(),
            timeout: Duration::from_millis(self.generation.timeout_ms),
            max_tokens: self.generation.max_tokens,
            first_temperature: self.generation.first_temperature,
            repair_temperature: self.generation.repair_temperature,
            stop: self.generation.stop.clone(),
            ..GeneratorSettings::default()
        }
    }

    /// Buffer configuration; validated when the buffer is built.
    pub fn prefetch_config(&self) -> PrefetchConfig {
        PrefetchConfig {
            batch_size: self.prefetch.batch_size,
            target_level: self.prefetch.target_level,
            low_watermark: self.prefetch.low_watermark,
            max_attempts: self.generation.max_attempts,
            parallel: self.prefetch.parallel,
        }
    }

    /// The configuration for `name`, or the default provider.
    pub fn provider(&self, name: Option<&str>) -> Result<(&str, &ProviderConfig)> {
        let name = name.unwrap_or(&self.default_provider);
        self.providers
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| {
                let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
                known.sort();
                format!(
                    "provider '{name}' is not configured (configured: {})",
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        ProviderConfig::Mock { response } => ProviderConfig::Mock {
            response: response.clone(),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `practicegen.toml` in the current directory
/// 2. `~/.config/practicegen/config.toml`
///
/// Environment variable overrides: `PRACTICEGEN_ANTHROPIC_KEY`, `PRACTICEGEN_OPENAI_KEY`.
pub fn load_config() -> Result<PracticegenConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PracticegenConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("practicegen.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<PracticegenConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PracticegenConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("PRACTICEGEN_ANTHROPIC_KEY") {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("PRACTICEGEN_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    // Resolve env vars in all provider configs
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("practicegen"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            Arc::new(AnthropicProvider::new(api_key, base_url.clone())?)
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        )?),
        ProviderConfig::Ollama { base_url } => Arc::new(OllamaProvider::new(base_url)?),
        ProviderConfig::Mock { response } => Arc::new(MockProvider::with_fixed_response(response)),
    };
    tracing::debug!("created provider '{name}' ({})", provider.name());
    Ok(provider)
}
