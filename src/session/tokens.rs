//! Token counting and expense estimation
//!
//! Pure accounting helpers for the session store. Token counts use a
//! heuristic tokenizer (characters / 4 per message, plus the per-message
//! framing overhead of the chat-completion counting rule); the goal is a
//! cost estimate close enough to the provider's own accounting to be
//! meaningful, not exact parity.

use crate::providers::Message;
use serde::{Deserialize, Serialize};

/// Cumulative per-role token counters for a session
///
/// The charging convention is asymmetric on purpose: a user turn is
/// charged the token count of the entire conversation so far (the provider
/// re-processes full history as prompt on every call), while an assistant
/// turn is charged only its own generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTally {
    /// Tokens charged to prompts (full-history per user turn)
    pub user: usize,
    /// Tokens charged to completions (per assistant message)
    pub assistant: usize,
}

impl TokenTally {
    /// Total tokens charged across both roles
    pub fn total(&self) -> usize {
        self.user + self.assistant
    }
}

/// Per-1000-token pricing for a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingRate {
    /// Currency per 1000 prompt tokens
    pub prompt: f64,
    /// Currency per 1000 completion tokens
    pub completion: f64,
}

/// Estimate the token count of a span of text.
///
/// Rounds up so short non-empty fragments are never free.
fn estimate_text_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Per-message framing overhead for the given model family.
///
/// The gpt-3.5 family frames each message with 4 tokens; gpt-4 and later
/// families use 3.
fn tokens_per_message(model: &str) -> usize {
    if model.starts_with("gpt-3.5") {
        4
    } else {
        3
    }
}

/// Count the tokens a chat-completion endpoint would charge for `messages`.
///
/// Every message costs its framing overhead plus its content estimate;
/// a non-empty conversation pays 3 more tokens of reply priming.
pub fn count_tokens(messages: &[Message], model: &str) -> usize {
    if messages.is_empty() {
        return 0;
    }
    let per_message = tokens_per_message(model);
    let body: usize = messages
        .iter()
        .map(|m| per_message + estimate_text_tokens(&m.content))
        .sum();
    body + 3
}

/// Convert per-role token counts to a monetary estimate.
///
/// `(user/1000) * prompt_rate + (assistant/1000) * completion_rate`,
/// rounded to 6 decimal places for display.
pub fn estimate_cost(user_tokens: usize, assistant_tokens: usize, rate: PricingRate) -> f64 {
    let raw = (user_tokens as f64 / 1000.0) * rate.prompt
        + (assistant_tokens as f64 / 1000.0) * rate.completion;
    (raw * 1_000_000.0).round() / 1_000_000.0
}
