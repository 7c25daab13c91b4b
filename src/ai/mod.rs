//! Provider-agnostic AI pipeline.
//!
//! Multiple providers (Azure OpenAI, OpenAI, Ollama) conform to one
//! capability interface; selection happens once at construction via
//! [`create_provider`], never via dispatch scattered through the engine.
//! The orchestrator layers budget gating and response validation on top.

pub mod azure;
pub mod budget;
pub mod error;
pub mod openai;
pub mod orchestrator;

use std::env;
use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

use crate::config::AiSettings;

pub use azure::AzureOpenAiProvider;
pub use budget::{estimate_usage, PromptBudget, TokenUsage};
pub use error::AiError;
pub use openai::OpenAiProvider;
pub use orchestrator::{AiOrchestrator, AiOutcome};

/// One completion request, provider-independent.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system prompt; omitted from the message list when empty.
    pub system_prompt: Option<String>,
    /// The user prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request a JSON object response from the provider.
    pub json_output: bool,
}

/// Capability interface every AI provider implements.
pub trait AiProvider: std::fmt::Debug + Send + Sync {
    /// Sends a completion request and returns the raw response text.
    fn generate_completion<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Estimates token count and cost for a prompt against this
    /// provider's model.
    fn calculate_token_usage(&self, prompt: &str) -> TokenUsage;

    /// Provider name for logging and reporting.
    fn name(&self) -> &str;
}

/// Constructs the configured provider.
///
/// Credentials come from the environment: `AZURE_OPENAI_API_KEY` for
/// Azure, `OPENAI_API_KEY` for OpenAI. Ollama needs none.
pub fn create_provider(settings: &AiSettings) -> Result<Box<dyn AiProvider>> {
    match settings.provider.as_str() {
        "azure" => {
            let api_key = env::var("AZURE_OPENAI_API_KEY")
                .map_err(|_| AiError::ApiKeyNotFound("AZURE_OPENAI_API_KEY"))?;
            Ok(Box::new(AzureOpenAiProvider::from_settings(
                settings, api_key,
            )?))
        }
        "openai" => {
            let api_key = env::var("OPENAI_API_KEY")
                .map_err(|_| AiError::ApiKeyNotFound("OPENAI_API_KEY"))?;
            Ok(Box::new(OpenAiProvider::new_openai(
                settings.model.clone(),
                api_key,
                settings.base_url.clone(),
            )))
        }
        "ollama" => Ok(Box::new(OpenAiProvider::new_ollama(
            settings.model.clone(),
            settings.base_url.clone(),
        ))),
        other => Err(AiError::UnknownProvider(other.to_string()).into()),
    }
}
