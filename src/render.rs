//! Terminal rendering for the interactive session
//!
//! Everything user-visible funnels through [`Renderer`] so the chat loop
//! and command dispatcher stay free of formatting concerns. Output uses
//! ANSI color via `colored`; streamed fragments are printed incrementally
//! and flushed so partial responses appear as they arrive.

use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;

use crate::commands::slash::DisplayStyle;
use crate::session::{PricingRate, Session};

const PANEL_WIDTH: usize = 72;

/// Renders session output to stdout/stderr
pub struct Renderer {
    /// Decorate responses with headers and rules; quick-question mode
    /// disables this for pipe-friendly output
    decorated: bool,
}

impl Renderer {
    pub fn new(decorated: bool) -> Self {
        Self { decorated }
    }

    /// Print the session banner, optionally followed by the help hint.
    pub fn greet(&self, session: &Session, session_name: &str, show_help_hint: bool) {
        if !self.decorated {
            return;
        }
        let title = format!(
            "{} ({})",
            session.model().to_uppercase(),
            session_name
        );
        self.panel("converse", &title);
        if show_help_hint {
            println!("{}", "Type /h for help, /q to quit.".dimmed());
        }
    }

    /// System notice in a bordered panel.
    pub fn notice(&self, text: &str) {
        self.panel("system", text);
    }

    /// Recoverable warning; the session continues.
    pub fn warn(&self, text: &str) {
        println!("{} {}", "warning:".yellow().bold(), text);
    }

    /// Turn or session failure.
    pub fn error(&self, text: &str) {
        eprintln!("{} {}", "error:".red().bold(), text);
    }

    /// Print the running token total and estimated cost.
    ///
    /// A model without a pricing entry gets the token count with the cost
    /// reported as unknown rather than a fabricated figure.
    pub fn expense(&self, session: &Session, rate: Option<PricingRate>) {
        let tally = session.tally();
        let cost = rate
            .map(|r| {
                format!(
                    "${:.6}",
                    crate::session::estimate_cost(tally.user, tally.assistant, r)
                )
            })
            .unwrap_or_else(|| "unknown (no pricing for this model)".to_string());
        self.panel(
            "expense",
            &format!("tokens: {}  cost: {}", tally.total(), cost),
        );
    }

    pub fn help(&self) {
        self.panel("help", HELP_TEXT.trim_end());
    }

    /// Replay a previous assistant response in the requested style.
    pub fn display_previous(&self, style: DisplayStyle, content: &str) {
        match style {
            DisplayStyle::Raw => self.panel("response", content),
            DisplayStyle::Plain => println!("{}", content),
            DisplayStyle::Markdown => println!("{}", render_markdown(content)),
        }
    }

    /// Header printed before the first streamed fragment.
    pub fn begin_response(&self, model: &str) {
        if self.decorated {
            println!("{}", rule(&model.to_uppercase()).cyan());
        }
    }

    /// One streamed fragment, flushed immediately.
    pub fn fragment(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Footer with elapsed wall-clock time for the turn.
    pub fn end_response(&self, elapsed: Duration) {
        println!();
        if self.decorated {
            println!("{}", rule(&format!("{:.1}s", elapsed.as_secs_f64())).cyan());
        }
    }

    /// Prompt string carrying the session status tags.
    ///
    /// The input-mode tag reflects the live flag: `M` while multiline
    /// input is on, `S` for single-line.
    pub fn prompt(&self, session: &Session, proxied: bool) -> String {
        let mut tags = format!("[{}]", session.tally().total());
        tags.push_str(if session.multiline() { "[M]" } else { "[S]" });
        if let Some(name) = session.loaded_name() {
            tags.push_str(&format!("[{}]", name));
        }
        if proxied {
            tags.push_str("[proxied]");
        }
        format!("{} >>> ", tags)
    }

    /// Continuation prompt used while gathering multiline input.
    pub fn continuation_prompt(&self) -> String {
        "... ".to_string()
    }

    fn panel(&self, title: &str, body: &str) {
        println!("{}", rule(title).dimmed());
        for line in body.lines() {
            println!("{}", line);
        }
        println!("{}", rule("").dimmed());
    }
}

fn rule(title: &str) -> String {
    if title.is_empty() {
        "─".repeat(PANEL_WIDTH)
    } else {
        let label = format!("── {} ", title);
        let pad = PANEL_WIDTH.saturating_sub(label.chars().count());
        format!("{}{}", label, "─".repeat(pad))
    }
}

/// Minimal terminal Markdown: bold headers, highlighted bullets, dimmed
/// code fences. Anything fancier belongs in a pager, not here.
fn render_markdown(content: &str) -> String {
    let mut out = String::new();
    let mut in_code = false;
    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
            out.push_str(&line.dimmed().to_string());
        } else if in_code {
            out.push_str(&line.dimmed().to_string());
        } else if line.starts_with('#') {
            out.push_str(&line.bold().to_string());
        } else if line.trim_start().starts_with("- ") || line.trim_start().starts_with("* ") {
            out.push_str(&line.green().to_string());
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out.pop();
    out
}

const HELP_TEXT: &str = "\
/q            quit
/h            this help
/a <model>    switch model and start a fresh conversation
/c <context>  switch context and start a fresh conversation
/m            multiline input for the next message only
/M            toggle persistent multiline input
/n            new conversation, keeping any loaded context or session
/N            new conversation, dropping the loaded context or session
/d [k]        show the k-th previous response, boxed (default 1)
/p [k]        show the k-th previous response, plain
/md [k]       show the k-th previous response as Markdown
/s <file>     save the conversation to a session file
/l <file>     load a session file for this conversation only
/L <file>     load a session file and keep it across /n
";
