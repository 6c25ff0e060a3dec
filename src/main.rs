//! Converse - Interactive streaming chat client
//!
//! Main entry point: loads configuration, seeds the session from a named
//! context or a saved session file, and hands off to the interactive loop
//! (or a single quick-question exchange).

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use converse::cli::Cli;
use converse::config::Config;
use converse::providers::{Message, OpenAiProvider};
use converse::render::Renderer;
use converse::session::{persistence, Baseline, Session};
use converse::Chat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let api_key = config.resolve_api_key()?;
    let model = cli.model.clone().unwrap_or_else(|| config.model.clone());

    let renderer = Renderer::new(!cli.quick_question);
    let baseline = resolve_baseline(&cli, &config, &renderer)?;

    let provider = OpenAiProvider::new(
        api_key,
        config.api_base.clone(),
        config.proxy.as_deref(),
    )
    .context("failed to construct provider client")?;

    let session = Session::new(model, baseline);
    let mut chat = Chat::new(session, Box::new(provider), config, renderer);

    if cli.quick_question {
        // requires("question") guarantees this is Some.
        let question = cli.initial_question().unwrap_or_default();
        chat.run_once(&question).await
    } else {
        chat.run(cli.initial_question()).await
    }
}

/// Pick the starting baseline from `--session` or `--context`.
///
/// An unreadable session file is fatal at startup. An unknown context name
/// falls back to `default`; when no contexts are configured at all (or the
/// fallback itself is missing) the conversation starts bare.
fn resolve_baseline(cli: &Cli, config: &Config, renderer: &Renderer) -> Result<Option<Baseline>> {
    if let Some(path) = &cli.session {
        let messages = persistence::load_session(path)
            .with_context(|| format!("could not restore session from {}", path.display()))?;
        let name = persistence::baseline_name(&path.to_string_lossy());
        return Ok(Some(Baseline { name, messages }));
    }

    let contexts = match &config.contexts {
        Some(contexts) => contexts,
        None => {
            renderer.notice("No contexts configured; starting without one.");
            return Ok(None);
        }
    };

    let requested = cli.context.as_deref().unwrap_or("default");
    let (name, prompt) = match contexts.get(requested) {
        Some(prompt) => (requested, prompt),
        None => {
            renderer.notice(&format!(
                "Context '{}' does not exist; using 'default'.",
                requested
            ));
            match contexts.get("default") {
                Some(prompt) => ("default", prompt),
                None => return Ok(None),
            }
        }
    };

    Ok(Some(Baseline {
        name: name.to_string(),
        messages: vec![Message::system(prompt)],
    }))
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "converse=debug" } else { "converse=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
