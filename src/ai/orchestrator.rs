//! Budgeted, validated AI generation.
//!
//! The orchestrator owns the one provider chosen at construction, gates
//! every call on the configured token/cost budget, and parses responses
//! against a strict expected schema. Provider failures and invalid
//! responses never propagate as errors; callers always get an outcome
//! they can fall back from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::budget::PromptBudget;
use crate::ai::{AiProvider, CompletionRequest};
use crate::analysis::{validate_split_selection, FileChange};
use crate::config::AiSettings;
use crate::template::RenderedPrompt;

/// Sampling temperature used when neither the template nor the
/// configuration supplies one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Outcome of one orchestrated generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutcome<T> {
    /// The provider returned a response that parsed and validated.
    Generated(T),
    /// The call was refused before reaching the provider.
    Skipped {
        /// Why the call was refused (budget breach).
        reason: String,
    },
    /// The provider failed or returned an unusable response.
    Unavailable,
}

impl<T> AiOutcome<T> {
    /// The generated value, discarding skip/unavailable detail.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Generated(value) => Some(value),
            Self::Skipped { .. } | Self::Unavailable => None,
        }
    }
}

/// One proposed conventional-commit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessageSuggestion {
    /// Conventional-commit type.
    #[serde(rename = "type")]
    pub commit_type: String,
    /// Optional scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Imperative description line.
    pub description: String,
    /// Optional body text.
    #[serde(default)]
    pub body: Option<String>,
}

/// Expected schema for commit and PR message generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSuggestions {
    /// Proposed messages, best first.
    pub suggestions: Vec<CommitMessageSuggestion>,
}

/// One proposed group in an AI split response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSplitGroup {
    /// Files in this group.
    pub files: Vec<String>,
    /// Full conventional-commit message or PR title.
    pub message: String,
    /// Conventional-commit type.
    #[serde(rename = "type", default)]
    pub commit_type: Option<String>,
    /// Optional scope.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Expected schema for split proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSplitResponse {
    /// Why the AI proposes this partition.
    pub reason: String,
    /// Proposed groups in dependency order.
    pub suggestions: Vec<AiSplitGroup>,
    /// Optional git commands, usually regenerated locally.
    #[serde(default)]
    pub commands: Vec<String>,
}

/// Runs budgeted, validated generations against one provider.
pub struct AiOrchestrator {
    provider: Box<dyn AiProvider>,
    budget: PromptBudget,
    temperature: Option<f32>,
}

impl AiOrchestrator {
    /// Creates an orchestrator around a constructed provider.
    pub fn new(provider: Box<dyn AiProvider>, settings: &AiSettings) -> Self {
        Self {
            provider,
            budget: PromptBudget {
                max_prompt_tokens: settings.max_prompt_tokens,
                max_prompt_cost: settings.max_prompt_cost,
            },
            temperature: settings.temperature,
        }
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generates a value of type `T` from a rendered prompt.
    ///
    /// The provider is never called when the estimated prompt usage
    /// breaches the budget; the breach is reported in the outcome rather
    /// than silently truncating the prompt. Provider failures, malformed
    /// JSON, and validator rejections all yield [`AiOutcome::Unavailable`]
    /// so the caller can fall back to the deterministic path.
    pub async fn generate<T, F>(
        &self,
        prompt: &RenderedPrompt,
        temperature: Option<f32>,
        validate: F,
    ) -> AiOutcome<T>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let full_prompt = match prompt.system_prompt.as_deref() {
            Some(system) => format!("{system}\n{}", prompt.prompt),
            None => prompt.prompt.clone(),
        };
        let usage = self.provider.calculate_token_usage(&full_prompt);
        debug!(
            tokens = usage.count,
            cost = usage.estimated_cost,
            provider = self.provider.name(),
            "Estimated prompt usage"
        );
        if let Err(breach) = self.budget.check(usage) {
            warn!(reason = %breach, "Refusing AI call over budget");
            return AiOutcome::Skipped {
                reason: breach.to_string(),
            };
        }

        let request = CompletionRequest {
            system_prompt: prompt.system_prompt.clone(),
            prompt: prompt.prompt.clone(),
            temperature: temperature
                .or(self.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            json_output: true,
        };

        let response = match self.provider.generate_completion(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, provider = self.provider.name(), "AI provider call failed");
                return AiOutcome::Unavailable;
            }
        };

        let json = extract_json(&response);
        let parsed: T = match serde_json::from_str(json) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "AI response did not match expected schema");
                return AiOutcome::Unavailable;
            }
        };

        if validate(&parsed) {
            AiOutcome::Generated(parsed)
        } else {
            warn!("AI response failed validation, discarding");
            AiOutcome::Unavailable
        }
    }

    /// Generates commit message suggestions.
    pub async fn generate_commit_suggestions(
        &self,
        prompt: &RenderedPrompt,
        temperature: Option<f32>,
    ) -> AiOutcome<CommitSuggestions> {
        self.generate(prompt, temperature, |result: &CommitSuggestions| {
            !result.suggestions.is_empty()
                && result
                    .suggestions
                    .iter()
                    .all(|s| !s.commit_type.is_empty() && !s.description.is_empty())
        })
        .await
    }

    /// Generates a split proposal, validated as a partition of `files`.
    ///
    /// An AI partition is held to the same rules as the deterministic
    /// fallback: every file covered, no file in two groups, no file
    /// outside the original change set.
    pub async fn generate_split(
        &self,
        prompt: &RenderedPrompt,
        temperature: Option<f32>,
        files: &[FileChange],
    ) -> AiOutcome<AiSplitResponse> {
        self.generate(prompt, temperature, |result: &AiSplitResponse| {
            if result.suggestions.is_empty()
                || result.suggestions.iter().any(|group| group.files.is_empty())
            {
                return false;
            }
            let file_sets: Vec<Vec<String>> = result
                .suggestions
                .iter()
                .map(|group| group.files.clone())
                .collect();
            let all_indices: Vec<usize> = (0..file_sets.len()).collect();
            validate_split_selection(&all_indices, &file_sets, files, true).is_valid
        })
        .await
    }
}

/// Strips markdown code fences some models wrap around JSON output.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
