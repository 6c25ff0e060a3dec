//! Converse - Interactive streaming chat client library
//!
//! This library provides the core functionality for the converse chat
//! client: session state and persistence, slash-command dispatch, the
//! streaming provider abstraction, token and cost accounting, and the
//! interactive loop.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Conversation store, token accounting, session files
//! - `commands`: Slash-command parsing and dispatch
//! - `providers`: Streaming completion provider abstraction (OpenAI)
//! - `chat`: Interactive loop and streaming turn driver
//! - `render`: Terminal output
//! - `config`: Configuration loading and pricing tables
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use converse::providers::{Message, OpenAiProvider, Provider, Role};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = OpenAiProvider::new("sk-...".to_string(), None, None)?;
//!     let mut stream = provider
//!         .stream_complete("gpt-4", &[Message::user("Hello!")])
//!         .await?;
//!     while let Some(delta) = stream.next().await {
//!         if let Some(text) = delta?.content {
//!             print!("{}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod render;
pub mod session;

// Re-export commonly used types
pub use chat::Chat;
pub use config::Config;
pub use error::{ConverseError, Result};
pub use session::Session;
