//! Session state, token accounting, and session file persistence

pub mod conversation;
pub mod persistence;
pub mod tokens;

pub use conversation::{Baseline, MultilineMode, Session};
pub use tokens::{count_tokens, estimate_cost, PricingRate, TokenTally};
