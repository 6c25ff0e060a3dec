//! Slash-command parser for the interactive session
//!
//! One raw input line is tokenized on whitespace and the first token is
//! matched, case-insensitively, against the fixed command table. Variant
//! selection (`/m` vs `/M`, `/n` vs `/N`, `/l` vs `/L`) uses the exact
//! casing of the first token as typed. Anything that does not match falls
//! through to plain-turn handling; unrecognized tokens are never errors.

/// Rendering variant for displaying a previous response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStyle {
    /// Boxed verbatim text
    Raw,
    /// Bare text, no decoration
    Plain,
    /// Rendered as Markdown
    Markdown,
}

/// A recognized slash-command, arguments still unvalidated
///
/// Argument presence is checked by the dispatcher so that a missing
/// argument can be reported as a recoverable warning rather than a parse
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/q` — terminate the session cleanly
    Quit,
    /// `/h` — show help
    Help,
    /// `/a <model>` — change the active model and soft-reset
    AmendModel(Option<String>),
    /// `/c <context>` — switch the loaded context and soft-reset
    ChangeContext(Option<String>),
    /// `/m` (one-shot) or `/M` (persistent) — toggle multiline input
    ToggleMultiline {
        /// Revert automatically after the next plain turn
        oneshot: bool,
    },
    /// `/n` (soft) or `/N` (hard) — start a new session
    NewSession {
        /// Also drop the loaded baseline
        hard: bool,
    },
    /// `/d`, `/p`, `/md` with an optional index defaulting to 1
    DisplayPrevious {
        style: DisplayStyle,
        /// Raw index argument; the dispatcher parses and warns on junk
        index: Option<String>,
    },
    /// `/s <filepath>` — save the conversation to a session file
    SaveSession(Option<String>),
    /// `/l <filepath>` (temporary) or `/L <filepath>` (persistent)
    LoadSession {
        path: Option<String>,
        /// Also install the file as the new loaded baseline
        persistent: bool,
    },
}

/// Parse one input line into a command, or `None` for a plain turn.
///
/// # Examples
///
/// ```
/// use converse::commands::slash::{parse_command, Command};
///
/// assert_eq!(parse_command("/q"), Some(Command::Quit));
/// assert_eq!(parse_command("hello there"), None);
/// ```
pub fn parse_command(line: &str) -> Option<Command> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let arg = tokens.next().map(|s| s.to_string());

    match first.to_lowercase().as_str() {
        "/q" => Some(Command::Quit),
        "/h" => Some(Command::Help),
        "/a" => Some(Command::AmendModel(arg)),
        "/c" => Some(Command::ChangeContext(arg)),
        "/m" => Some(Command::ToggleMultiline {
            oneshot: first == "/m",
        }),
        "/n" => Some(Command::NewSession { hard: first == "/N" }),
        "/d" => Some(Command::DisplayPrevious {
            style: DisplayStyle::Raw,
            index: arg,
        }),
        "/p" => Some(Command::DisplayPrevious {
            style: DisplayStyle::Plain,
            index: arg,
        }),
        "/md" => Some(Command::DisplayPrevious {
            style: DisplayStyle::Markdown,
            index: arg,
        }),
        "/s" => Some(Command::SaveSession(arg)),
        "/l" => Some(Command::LoadSession {
            path: arg,
            persistent: first == "/L",
        }),
        _ => None,
    }
}
