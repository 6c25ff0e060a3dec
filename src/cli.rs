//! Command-line interface definition

use clap::Parser;
use std::path::PathBuf;

/// Interactive streaming chat client for OpenAI-compatible endpoints
#[derive(Parser, Debug)]
#[command(name = "converse")]
#[command(version)]
#[command(about = "Chat with a language model from your terminal")]
pub struct Cli {
    /// Question to ask immediately; interactive mode continues after the
    /// answer unless --quick-question is given
    #[arg(value_name = "QUESTION", trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Model to use, overriding the configured default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Named context to start the conversation with
    #[arg(short, long, conflicts_with = "session")]
    pub context: Option<String>,

    /// Session file to restore the conversation from
    #[arg(short, long, value_name = "FILE")]
    pub session: Option<PathBuf>,

    /// Print one answer and exit, without banner or prompt
    #[arg(short = 'q', long = "quick-question", requires = "question")]
    pub quick_question: bool,

    /// Path to the configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The positional question joined into one message, if any was given.
    pub fn initial_question(&self) -> Option<String> {
        if self.question.is_empty() {
            None
        } else {
            Some(self.question.join(" "))
        }
    }
}
