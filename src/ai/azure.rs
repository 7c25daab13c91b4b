//! Azure OpenAI chat completion client.
//!
//! Azure routes requests by deployment name in the URL path and
//! authenticates with an `api-key` header; the wire format of the body and
//! response otherwise matches the OpenAI chat completions API.

use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use crate::ai::budget::{estimate_usage, TokenUsage};
use crate::ai::error::AiError;
use crate::ai::openai::{build_chat_body, read_chat_response};
use crate::ai::{AiProvider, CompletionRequest};
use crate::config::AiSettings;

/// Azure OpenAI API provider.
#[derive(Debug)]
pub struct AzureOpenAiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl AzureOpenAiProvider {
    /// Creates a provider from resolved settings.
    ///
    /// Fails when the endpoint is missing; the deployment and API version
    /// carry defaults so only the endpoint is truly required.
    pub fn from_settings(settings: &AiSettings, api_key: String) -> Result<Self> {
        let azure = &settings.azure;
        if azure.endpoint.is_empty() {
            return Err(AiError::IncompleteConfiguration(
                "Azure OpenAI endpoint is not set (ai.azure.endpoint or AZURE_OPENAI_ENDPOINT)"
                    .to_string(),
            )
            .into());
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint: azure.endpoint.clone(),
            deployment: azure.deployment.clone(),
            api_version: azure.api_version.clone(),
        })
    }

    /// Creates a provider from explicit parts (used by tests).
    pub fn new(api_key: String, endpoint: String, deployment: String, api_version: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
            deployment,
            api_version,
        }
    }

    fn api_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        format!(
            "{base}/openai/deployments/{}/chat/completions?api-version={}",
            self.deployment, self.api_version
        )
    }
}

impl AiProvider for AzureOpenAiProvider {
    fn generate_completion<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let body = build_chat_body(&self.deployment, request);
            let url = self.api_url();
            info!(deployment = %self.deployment, "Sending Azure OpenAI chat request");
            debug!(api_version = %self.api_version, json = request.json_output, "Request options");

            let response = self
                .client
                .post(&url)
                .header("api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| AiError::NetworkError(e.to_string()))?;
            read_chat_response(response).await
        })
    }

    fn calculate_token_usage(&self, prompt: &str) -> TokenUsage {
        // Azure deployments are conventionally named after the model.
        estimate_usage(prompt, &self.deployment)
    }

    fn name(&self) -> &str {
        "azure"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::AzureSettings;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn missing_endpoint_is_rejected() {
        let settings = AiSettings::default();
        let err = AzureOpenAiProvider::from_settings(&settings, "key".to_string()).unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn url_includes_deployment_and_api_version() {
        let provider = AzureOpenAiProvider::new(
            "key".to_string(),
            "https://example.openai.azure.com/".to_string(),
            "gpt-4o".to_string(),
            "2024-02-15-preview".to_string(),
        );
        assert_eq!(
            provider.api_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn from_settings_uses_configured_endpoint() {
        let settings = AiSettings {
            azure: AzureSettings {
                endpoint: "https://example.openai.azure.com".to_string(),
                ..AzureSettings::default()
            },
            ..AiSettings::default()
        };
        let provider = AzureOpenAiProvider::from_settings(&settings, "key".to_string()).unwrap();
        assert_eq!(provider.name(), "azure");
        assert_eq!(provider.deployment, "gpt-4o");
    }

    #[tokio::test]
    async fn completion_authenticates_with_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(query_param("api-version", "2024-02-15-preview"))
            .and(header("api-key", "azure-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "done"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(
            "azure-secret".to_string(),
            server.uri(),
            "gpt-4o".to_string(),
            "2024-02-15-preview".to_string(),
        );
        let request = CompletionRequest {
            system_prompt: None,
            prompt: "hello".to_string(),
            temperature: 0.7,
            json_output: false,
        };
        let text = provider.generate_completion(&request).await.unwrap();
        assert_eq!(text, "done");
    }
}
