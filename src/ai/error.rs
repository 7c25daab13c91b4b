//! AI provider error handling.

use thiserror::Error;

/// Errors from AI providers and the orchestration layer.
#[derive(Error, Debug)]
pub enum AiError {
    /// API key not found for the selected provider.
    #[error("API key not found. Set the {0} environment variable")]
    ApiKeyNotFound(&'static str),

    /// Provider name in configuration is not recognized.
    #[error("Unknown AI provider '{0}'. Expected one of: azure, openai, ollama")]
    UnknownProvider(String),

    /// Provider configuration is incomplete.
    #[error("Incomplete AI provider configuration: {0}")]
    IncompleteConfiguration(String),

    /// Provider request failed with an error status.
    #[error("AI API request failed: {0}")]
    ApiRequestFailed(String),

    /// Response body did not match the expected wire shape.
    #[error("Invalid response format from AI API: {0}")]
    InvalidResponseFormat(String),

    /// Network connectivity error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Estimated prompt tokens exceed the configured ceiling.
    #[error("Prompt too large: estimated {estimated_tokens} tokens exceeds limit of {max_tokens}")]
    PromptTooLarge {
        /// Estimated prompt token count.
        estimated_tokens: usize,
        /// Configured `max_prompt_tokens`.
        max_tokens: usize,
    },

    /// Estimated prompt cost exceeds the configured ceiling.
    #[error(
        "Prompt too expensive: estimated ${estimated_cost:.4} exceeds limit of ${max_cost:.4}"
    )]
    PromptTooExpensive {
        /// Estimated prompt cost in USD.
        estimated_cost: f64,
        /// Configured `max_prompt_cost`.
        max_cost: f64,
    },
}
