//! Command dispatch for the interactive session
//!
//! The chat loop hands every non-empty input line to [`dispatch`], which
//! either executes a slash-command against the session or classifies the
//! line as a plain conversational turn. Command failures that the user can
//! simply retype (missing argument, unknown context, junk index) are
//! reported as warnings and consume the line; they never abort the session.

pub mod slash;

use crate::config::Config;
use crate::providers::Message;
use crate::render::Renderer;
use crate::session::{persistence, Session};
use crate::Result;

pub use slash::{parse_command, Command, DisplayStyle};

/// What the chat loop should do with an input line after dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The line was a command (or empty) and has been handled
    Consumed,
    /// The line is a conversational turn to stream to the provider
    Turn(String),
    /// The user asked to end the session
    Quit,
}

/// Handle one input line.
///
/// Empty input is a silent no-op. Commands that reset or replace the
/// conversation (`/a`, `/c`, `/n`, `/N`, `/l`, `/L`) print the running
/// expense first so the figures are not lost with the old conversation.
pub fn dispatch(
    line: &str,
    session: &mut Session,
    config: &Config,
    renderer: &Renderer,
) -> Result<Outcome> {
    if line.trim().is_empty() {
        return Ok(Outcome::Consumed);
    }

    let command = match parse_command(line) {
        Some(command) => command,
        None => return Ok(Outcome::Turn(line.to_string())),
    };

    match command {
        Command::Quit => return Ok(Outcome::Quit),
        Command::Help => renderer.help(),
        Command::AmendModel(None) => renderer.warn("usage: /a <model>"),
        Command::AmendModel(Some(model)) => {
            renderer.expense(session, config.pricing_for(session.model()));
            session.set_model(&model);
            session.reset(false);
            let name = session.loaded_name().unwrap_or("new session").to_string();
            renderer.greet(session, &name, false);
        }
        Command::ChangeContext(None) => renderer.warn("usage: /c <context>"),
        Command::ChangeContext(Some(name)) => change_context(&name, session, config, renderer),
        Command::ToggleMultiline { oneshot } => session.toggle_multiline(oneshot),
        Command::NewSession { hard } => {
            renderer.expense(session, config.pricing_for(session.model()));
            session.reset(hard);
            let name = session.loaded_name().unwrap_or("new session").to_string();
            renderer.greet(session, &name, false);
        }
        Command::DisplayPrevious { style, index } => display_previous(style, index, session, renderer),
        Command::SaveSession(None) => renderer.warn("usage: /s <filepath>"),
        Command::SaveSession(Some(path)) => {
            match persistence::save_session(&path, session.messages()) {
                Ok(()) => renderer.notice(&format!("Session saved to {}.", path)),
                Err(err) => renderer.warn(&format!("could not save session: {:#}", err)),
            }
        }
        Command::LoadSession { path: None, .. } => renderer.warn("usage: /l <filepath>"),
        Command::LoadSession {
            path: Some(path),
            persistent,
        } => load_session(&path, persistent, session, config, renderer),
    }

    Ok(Outcome::Consumed)
}

/// Switch the loaded context. Unknown names and a missing context table
/// are warnings; the conversation is only replaced on success.
fn change_context(name: &str, session: &mut Session, config: &Config, renderer: &Renderer) {
    let contexts = match &config.contexts {
        Some(contexts) => contexts,
        None => {
            renderer.warn("no contexts are configured");
            return;
        }
    };
    let system_prompt = match contexts.get(name) {
        Some(prompt) => prompt,
        None => {
            renderer.warn(&format!("unknown context: {}", name));
            return;
        }
    };
    renderer.expense(session, config.pricing_for(session.model()));
    session.load_baseline(name, vec![Message::system(system_prompt)], true);
    renderer.greet(session, name, false);
}

fn display_previous(
    style: DisplayStyle,
    index: Option<String>,
    session: &Session,
    renderer: &Renderer,
) {
    let index = match index {
        None => 1,
        Some(raw) => match raw.parse::<usize>() {
            Ok(index) => index,
            Err(_) => {
                renderer.warn(&format!("not an index: {}", raw));
                return;
            }
        },
    };
    // Out-of-range lookups are deliberate no-ops.
    if let Some(content) = session.replay(index) {
        renderer.display_previous(style, content);
    }
}

fn load_session(
    path: &str,
    persistent: bool,
    session: &mut Session,
    config: &Config,
    renderer: &Renderer,
) {
    let messages = match persistence::load_session(path) {
        Ok(messages) => messages,
        Err(err) => {
            renderer.warn(&format!("could not load session: {:#}", err));
            return;
        }
    };
    renderer.expense(session, config.pricing_for(session.model()));
    session.load_baseline(path, messages, persistent);
    renderer.greet(session, path, false);
}
