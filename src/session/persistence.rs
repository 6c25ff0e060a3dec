//! Session file save and load
//!
//! Session files are a JSON array of `{role, content}` objects, order
//! preserving; a saved then reloaded conversation is identical in role,
//! content, and order.

use crate::error::{ConverseError, Result};
use crate::providers::Message;
use std::path::Path;

/// Serialize the conversation's message list to `path`.
pub fn save_session(path: impl AsRef<Path>, messages: &[Message]) -> Result<()> {
    let json = serde_json::to_string_pretty(messages)?;
    std::fs::write(path.as_ref(), json)
        .map_err(|e| ConverseError::Session(format!("failed to write session file: {e}")))?;
    Ok(())
}

/// Read a message list from a session file.
///
/// # Errors
///
/// Returns `ConverseError::Session` when the file is unreadable or not a
/// valid message array; callers treat this as a recoverable command error
/// and leave existing state untouched.
pub fn load_session(path: impl AsRef<Path>) -> Result<Vec<Message>> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ConverseError::Session(format!("failed to read session file: {e}")))?;
    let messages = serde_json::from_str(&contents)
        .map_err(|e| ConverseError::Session(format!("malformed session file: {e}")))?;
    Ok(messages)
}

/// Derive a baseline name from a session filepath: the file name without
/// a trailing `.json` extension.
pub fn baseline_name(path: &str) -> String {
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    file_name
        .strip_suffix(".json")
        .map(|s| s.to_string())
        .unwrap_or(file_name)
}
