//! Provider abstraction and message types for Converse
//!
//! This module defines the Provider trait that completion providers
//! implement, along with the message types shared by the session store,
//! the command dispatcher, and the streaming driver.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

pub mod openai;

pub use openai::OpenAiProvider;

/// Role of a conversation message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System/context message, always first in the conversation if present
    System,
    /// A message typed by the user
    User,
    /// A completion produced by the model
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Message structure for conversation
///
/// Immutable once appended; insertion order is conversation order.
/// Serializes to the `{"role": ..., "content": ...}` wire shape consumed
/// by chat-completion endpoints and used by session files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use converse::providers::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use converse::providers::{Message, Role};
    ///
    /// let msg = Message::system("You are a helpful assistant");
    /// assert_eq!(msg.role, Role::System);
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// One incremental unit of a streamed response
///
/// The first delta of a stream carries the responder `role` and usually no
/// content; subsequent deltas carry content fragments. A delta may carry
/// neither (metadata-only chunks are valid and skipped by accumulation).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResponseDelta {
    /// Responder role, present on the first delta only
    #[serde(default)]
    pub role: Option<Role>,
    /// Text fragment, absent on metadata-only deltas
    #[serde(default)]
    pub content: Option<String>,
}

/// A lazy, finite, single-pass sequence of streamed deltas
///
/// Deltas arrive in order over an unbounded channel fed by the provider's
/// SSE parsing task; the channel closes at stream end. Each item is either
/// a parsed delta or the turn-level failure that ended the stream.
pub struct DeltaStream {
    rx: mpsc::UnboundedReceiver<Result<ResponseDelta>>,
}

impl fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaStream").finish_non_exhaustive()
    }
}

impl DeltaStream {
    /// Wrap a receiver produced by a provider's streaming task.
    pub fn new(rx: mpsc::UnboundedReceiver<Result<ResponseDelta>>) -> Self {
        Self { rx }
    }

    /// Receive the next delta, or `None` at stream end.
    pub async fn next(&mut self) -> Option<Result<ResponseDelta>> {
        self.rx.recv().await
    }
}

/// Provider trait for streaming completion providers
///
/// The session loop holds a boxed provider and never issues a second
/// request while one stream is outstanding.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a streaming completion exchange with the full conversation.
    ///
    /// Returns a single-pass delta stream. Errors surfaced before the
    /// stream opens (authentication, rate limit, connection, timeout) are
    /// returned directly; errors mid-stream arrive through the stream.
    ///
    /// # Errors
    ///
    /// Returns `ConverseError::Authentication` on a 401 response,
    /// `ConverseError::RateLimited` on 429, `ConverseError::Connection`
    /// or `ConverseError::Timeout` on transport failures.
    async fn stream_complete(&self, model: &str, messages: &[Message]) -> Result<DeltaStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_message_assistant() {
        let msg = Message::assistant("Hi there");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_message_system() {
        let msg = Message::system("System prompt");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "System prompt");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("Test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Test\""));
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::assistant("answer");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_delta_deserialization_role_only() {
        let delta: ResponseDelta = serde_json::from_str(r#"{"role":"assistant"}"#).unwrap();
        assert_eq!(delta.role, Some(Role::Assistant));
        assert!(delta.content.is_none());
    }

    #[test]
    fn test_delta_deserialization_content_only() {
        let delta: ResponseDelta = serde_json::from_str(r#"{"content":"Hel"}"#).unwrap();
        assert!(delta.role.is_none());
        assert_eq!(delta.content.as_deref(), Some("Hel"));
    }

    #[test]
    fn test_delta_deserialization_empty() {
        let delta: ResponseDelta = serde_json::from_str("{}").unwrap();
        assert!(delta.role.is_none());
        assert!(delta.content.is_none());
    }

    #[test]
    fn test_delta_stream_is_debuggable() {
        // Result<DeltaStream> must support unwrap_err in callers' tests.
        let (_tx, rx) = mpsc::unbounded_channel();
        let stream = DeltaStream::new(rx);
        let formatted = format!("{:?}", stream);
        assert!(formatted.contains("DeltaStream"));
    }

    #[tokio::test]
    async fn test_delta_stream_order_preserved() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Ok(ResponseDelta {
            role: Some(Role::Assistant),
            content: None,
        }))
        .unwrap();
        tx.send(Ok(ResponseDelta {
            role: None,
            content: Some("a".to_string()),
        }))
        .unwrap();
        drop(tx);

        let mut stream = DeltaStream::new(rx);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.role, Some(Role::Assistant));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.content.as_deref(), Some("a"));
        assert!(stream.next().await.is_none());
    }
}
