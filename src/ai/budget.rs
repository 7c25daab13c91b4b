//! Token and cost estimation for AI prompt budgeting.
//!
//! Provides a lightweight heuristic to estimate token counts and prompt
//! cost before any API request is sent. Estimates gate whether a call is
//! attempted at all; they are never persisted.

use serde::{Deserialize, Serialize};

use crate::ai::error::AiError;

/// Approximate characters per token for heuristic estimation.
///
/// Modern tokenizers average roughly 3.5 characters per token for English
/// text with code mixed in.
const CHARS_PER_TOKEN: f64 = 3.5;

/// Safety margin multiplier applied to token estimates.
///
/// Adds 10% overhead to account for tokenizer variance (special tokens,
/// whitespace handling, non-ASCII characters).
const SAFETY_MARGIN: f64 = 1.10;

/// Input price in USD per 1000 tokens, by model identifier prefix.
///
/// Longest matching prefix wins; unknown models fall back to
/// [`DEFAULT_PRICE_PER_1K`].
const PRICE_PER_1K: &[(&str, f64)] = &[
    ("gpt-4o-mini", 0.000_15),
    ("gpt-4o", 0.002_5),
    ("gpt-4-turbo", 0.01),
    ("gpt-4", 0.03),
    ("gpt-3.5", 0.000_5),
];

/// Fallback input price for models missing from the table.
const DEFAULT_PRICE_PER_1K: f64 = 0.002_5;

/// Estimated prompt size and cost for one AI call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Estimated prompt token count.
    pub count: usize,
    /// Estimated prompt cost in USD.
    pub estimated_cost: f64,
}

/// Estimates the token count for a text string.
///
/// Uses 1 token per 3.5 characters with a 10% safety margin.
/// Intentionally conservative: overestimating refuses a borderline call,
/// underestimating would let one through.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let raw_estimate = text.len() as f64 / CHARS_PER_TOKEN;
    (raw_estimate * SAFETY_MARGIN).ceil() as usize
}

/// Input price per 1000 tokens for a model identifier.
#[must_use]
pub fn price_per_1k_tokens(model: &str) -> f64 {
    PRICE_PER_1K
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map_or(DEFAULT_PRICE_PER_1K, |(_, price)| *price)
}

/// Estimates token count and cost for a prompt against one model.
#[must_use]
pub fn estimate_usage(text: &str, model: &str) -> TokenUsage {
    let count = estimate_tokens(text);
    TokenUsage {
        count,
        estimated_cost: (count as f64 / 1000.0) * price_per_1k_tokens(model),
    }
}

/// Configured ceilings on prompt size and cost.
#[derive(Debug, Clone, Copy)]
pub struct PromptBudget {
    /// Maximum estimated prompt tokens.
    pub max_prompt_tokens: usize,
    /// Maximum estimated prompt cost in USD.
    pub max_prompt_cost: f64,
}

impl PromptBudget {
    /// Checks a usage estimate against both ceilings.
    ///
    /// Token breaches are reported before cost breaches when both apply.
    pub fn check(&self, usage: TokenUsage) -> Result<(), AiError> {
        if usage.count > self.max_prompt_tokens {
            return Err(AiError::PromptTooLarge {
                estimated_tokens: usage.count,
                max_tokens: self.max_prompt_tokens,
            });
        }
        if usage.estimated_cost > self.max_prompt_cost {
            return Err(AiError::PromptTooExpensive {
                estimated_cost: usage.estimated_cost,
                max_cost: self.max_prompt_cost,
            });
        }
        Ok(())
    }
}
