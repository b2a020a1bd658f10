//! OpenAI-compatible chat completions provider.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use practicegen_core::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelInfo, PartialSink, TokenUsage,
};

use crate::error::{http_client, retry_after_ms, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client: http_client(DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request, on_partial), fields(model = %request.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        on_partial: Option<&PartialSink<'_>>,
    ) -> anyhow::Result<CompletionResponse> {
        let start = Instant::now();

        let body = OpenAiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stop: &request.stop,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_send(e, DEFAULT_TIMEOUT_SECS))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after_ms(response.headers()),
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if let Some(sink) = on_partial {
            sink(&text);
        }

        // GPT-4.1 mini pricing: $0.40/$1.60 per 1M tokens
        let estimated_cost = (api_response.usage.prompt_tokens as f64 * 0.4
            + api_response.usage.completion_tokens as f64 * 1.6)
            / 1_000_000.0;

        Ok(CompletionResponse {
            text,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
                estimated_cost_usd: estimated_cost,
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.0004,
                cost_per_1k_output: 0.0016,
            },
            ModelInfo {
                id: "gpt-4.1-nano".into(),
                name: "GPT-4.1 Nano".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.0001,
                cost_per_1k_output: 0.0004,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practicegen_core::traits::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.into(),
            messages: vec![
                ChatMessage::system("Return ONLY valid JSON."),
                ChatMessage::user("Generate ONE cloze JSON object."),
            ],
            max_tokens: 260,
            temperature: 0.2,
            stop: vec!["</s>".into()],
        }
    }

    #[tokio::test]
    async fn successful_completion() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"content": "{\"type\":\"cloze_v1.free_fill\"}", "role": "assistant"}, "index": 0}],
            "model": "gpt-4.1-mini",
            "usage": {"prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55}
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "Return ONLY valid JSON."},
                    {"role": "user", "content": "Generate ONE cloze JSON object."}
                ],
                "stop": ["</s>"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", Some(server.uri()), None).unwrap();
        let response = provider
            .complete(&request("gpt-4.1-mini"), None)
            .await
            .unwrap();
        assert!(response.text.contains("cloze_v1.free_fill"));
        assert_eq!(response.token_usage.total_tokens, 55);
    }

    #[tokio::test]
    async fn custom_base_url() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"content": "{}", "role": "assistant"}, "index": 0}],
            "model": "custom-model",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let response = provider
            .complete(&request("custom-model"), None)
            .await
            .unwrap();
        assert_eq!(response.model, "custom-model");
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let err = provider
            .complete(&request("gpt-4.1-mini"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }
}
