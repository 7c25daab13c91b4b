//! OpenAI-compatible chat completion client (works with OpenAI, Ollama, etc.)

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use crate::ai::budget::{estimate_usage, TokenUsage};
use crate::ai::error::AiError;
use crate::ai::{AiProvider, CompletionRequest};

/// Output tokens requested per completion.
const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Chat message in the request body.
#[derive(Serialize, Debug)]
struct Message {
    role: String,
    content: String,
}

/// `response_format` field requesting a JSON object response.
#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat completion request body.
#[derive(Serialize, Debug)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

/// Chat completion response choice.
#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

/// Chat completion response message.
#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: String,
}

/// Chat completion response body.
#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

/// Builds the message list shared by all OpenAI-compatible providers.
fn build_messages(request: &CompletionRequest) -> Vec<Message> {
    let mut messages = Vec::new();
    if let Some(system_prompt) = request
        .system_prompt
        .as_deref()
        .filter(|text| !text.is_empty())
    {
        messages.push(Message {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        });
    }
    messages.push(Message {
        role: "user".to_string(),
        content: request.prompt.clone(),
    });
    messages
}

/// Builds the request body for a chat completions call.
pub(crate) fn build_chat_body(
    model: &str,
    request: &CompletionRequest,
) -> impl Serialize + std::fmt::Debug {
    ChatRequest {
        model: model.to_string(),
        messages: build_messages(request),
        max_tokens: MAX_OUTPUT_TOKENS,
        temperature: request.temperature,
        response_format: request.json_output.then(|| ResponseFormat {
            format_type: "json_object".to_string(),
        }),
        stream: false,
    }
}

/// Extracts the text of the first choice from a chat completions response.
pub(crate) async fn read_chat_response(response: reqwest::Response) -> Result<String> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(AiError::ApiRequestFailed(format!("HTTP {status}: {error_text}")).into());
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .map_err(|e| AiError::InvalidResponseFormat(e.to_string()))?;

    chat_response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| AiError::InvalidResponseFormat("No choices in response".to_string()).into())
}

/// OpenAI-compatible API provider.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    /// API key for authentication (absent for Ollama).
    api_key: Option<String>,
    model: String,
    base_url: String,
    provider_name: &'static str,
}

impl OpenAiProvider {
    /// Creates a provider for the OpenAI API.
    pub fn new_openai(model: String, api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key),
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            provider_name: "openai",
        }
    }

    /// Creates a provider for a local Ollama instance.
    pub fn new_ollama(model: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: None,
            model,
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            provider_name: "ollama",
        }
    }

    fn api_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1/chat/completions")
    }
}

impl AiProvider for OpenAiProvider {
    fn generate_completion<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let body = build_chat_body(&self.model, request);
            let url = self.api_url();
            info!(url = %url, model = %self.model, "Sending OpenAI-compatible chat request");
            debug!(temperature = request.temperature, json = request.json_output, "Request options");

            let mut builder = self.client.post(&url).json(&body);
            if let Some(ref api_key) = self.api_key {
                builder = builder.header("Authorization", format!("Bearer {api_key}"));
            }

            let response = builder
                .send()
                .await
                .map_err(|e| AiError::NetworkError(e.to_string()))?;
            read_chat_response(response).await
        })
    }

    fn calculate_token_usage(&self, prompt: &str) -> TokenUsage {
        estimate_usage(prompt, &self.model)
    }

    fn name(&self) -> &str {
        self.provider_name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(json_output: bool) -> CompletionRequest {
        CompletionRequest {
            system_prompt: Some("system".to_string()),
            prompt: "user".to_string(),
            temperature: 0.7,
            json_output,
        }
    }

    #[test]
    fn api_url_tolerates_trailing_slash() {
        let provider =
            OpenAiProvider::new_ollama("llama3".to_string(), Some("http://host:1234/".to_string()));
        assert_eq!(provider.api_url(), "http://host:1234/v1/chat/completions");
    }

    #[test]
    fn token_usage_uses_model_pricing() {
        let cheap = OpenAiProvider::new_ollama("gpt-4o-mini".to_string(), None);
        let pricey = OpenAiProvider::new_ollama("gpt-4".to_string(), None);
        let prompt = "x".repeat(1000);
        assert!(
            cheap.calculate_token_usage(&prompt).estimated_cost
                < pricey.calculate_token_usage(&prompt).estimated_cost
        );
        assert_eq!(
            cheap.calculate_token_usage(&prompt).count,
            pricey.calculate_token_usage(&prompt).count
        );
    }

    #[tokio::test]
    async fn completion_extracts_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new_openai(
            "gpt-4o".to_string(),
            "sk-test".to_string(),
            Some(server.uri()),
        );
        let text = provider.generate_completion(&request(true)).await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new_ollama("llama3".to_string(), Some(server.uri()));
        let err = provider
            .generate_completion(&request(false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 429"));
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new_ollama("llama3".to_string(), Some(server.uri()));
        let err = provider
            .generate_completion(&request(false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No choices"));
    }
}
