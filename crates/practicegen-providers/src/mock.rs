//! Mock provider for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use practicegen_core::traits::{
    CompletionRequest, CompletionResponse, LlmProvider, ModelInfo, PartialSink, TokenUsage,
};

/// A mock LLM provider for exercising the generator without real API calls.
///
/// Replies come from, in order: the scripted queue, the first prompt-substring
/// mapping that matches the last message, then the default response.
pub struct MockProvider {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    /// One-shot replies consumed front to back; `Err` becomes a provider error.
    script: Mutex<VecDeque<Result<String, String>>>,
    /// Default response if nothing else matches.
    default_response: String,
    /// Simulated latency per call.
    delay: Option<Duration>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Every request received.
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            script: Mutex::new(VecDeque::new()),
            default_response: "{}".to_string(),
            delay: None,
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock that replays `script` call by call, then falls back to
    /// `fallback`.
    pub fn scripted<I, S>(script: I, fallback: &str) -> Self
    where
        I: IntoIterator<Item = Result<S, S>>,
        S: Into<String>,
    {
        let script = script
            .into_iter()
            .map(|r| r.map(Into::into).map_err(Into::into))
            .collect();
        Self {
            script: Mutex::new(script),
            ..Self::with_fixed_response(fallback)
        }
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self, request: &CompletionRequest) -> Result<String, String> {
        if let Some(reply) = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            return reply;
        }

        let prompt = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(self
            .responses
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone()))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        on_partial: Option<&PartialSink<'_>>,
    ) -> anyhow::Result<CompletionResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = self.next_reply(request).map_err(anyhow::Error::msg)?;
        if let Some(sink) = on_partial {
            sink(&text);
        }

        let prompt_chars: usize = request.messages.iter().map(|m| m.content.len()).sum();
        let prompt_tokens = (prompt_chars / 4) as u32; // Rough estimate
        let completion_tokens = (text.len() / 4) as u32;

        Ok(CompletionResponse {
            text,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practicegen_core::traits::ChatMessage;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: "mock".into(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user(prompt)],
            max_tokens: 100,
            temperature: 0.0,
            stop: vec![],
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let provider = MockProvider::with_fixed_response("{\"ok\":true}");
        let response = provider.complete(&request("anything"), None).await.unwrap();
        assert_eq!(response.text, "{\"ok\":true}");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn prompt_matching() {
        let mut responses = HashMap::new();
        responses.insert("cloze".to_string(), "{\"type\":\"cloze_v1.free_fill\"}".to_string());
        responses.insert("Fix the JSON".to_string(), "{\"fixed\":true}".to_string());

        let provider = MockProvider::new(responses);

        let resp = provider
            .complete(&request("Generate ONE cloze JSON object."), None)
            .await
            .unwrap();
        assert!(resp.text.contains("cloze_v1"));

        let resp = provider
            .complete(&request("Fix the JSON to satisfy BOTH ..."), None)
            .await
            .unwrap();
        assert!(resp.text.contains("fixed"));
        assert_eq!(provider.call_count(), 2);
        assert_eq!(
            provider.last_request().unwrap().messages[1].content,
            "Fix the JSON to satisfy BOTH ..."
        );
    }

    #[tokio::test]
    async fn script_then_fallback() {
        let provider = MockProvider::scripted([Err("boom"), Ok("first")], "rest");

        let err = provider.complete(&request("a"), None).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(provider.complete(&request("b"), None).await.unwrap().text, "first");
        assert_eq!(provider.complete(&request("c"), None).await.unwrap().text, "rest");
        assert_eq!(provider.requests().len(), 3);
    }
}
