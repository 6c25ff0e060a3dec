//! Interactive chat loop and streaming turn driver
//!
//! [`Chat`] owns the session, the provider, and the renderer, and runs the
//! read-dispatch-stream cycle until the user quits. A turn streams deltas
//! from the provider, printing each fragment as it arrives; recoverable
//! transport failures roll the pending user message back and return to the
//! prompt, while authentication and protocol failures end the session.

use std::path::Path;
use std::time::Instant;

use anyhow::anyhow;
use rustyline::config::EditMode;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use tracing::{debug, warn};

use crate::commands::{dispatch, Outcome};
use crate::config::Config;
use crate::error::ConverseError;
use crate::providers::{Provider, Role};
use crate::render::Renderer;
use crate::session::Session;
use crate::Result;

type LineEditor = Editor<(), FileHistory>;

/// One interactive chat run
pub struct Chat {
    session: Session,
    provider: Box<dyn Provider>,
    config: Config,
    renderer: Renderer,
    proxied: bool,
}

impl Chat {
    pub fn new(
        session: Session,
        provider: Box<dyn Provider>,
        config: Config,
        renderer: Renderer,
    ) -> Self {
        let proxied = config.proxy.is_some();
        Self {
            session,
            provider,
            config,
            renderer,
            proxied,
        }
    }

    /// Answer a single question and return, without entering the loop.
    pub async fn run_once(&mut self, question: &str) -> Result<()> {
        self.stream_turn(question).await
    }

    /// Run the interactive loop until `/q`, end-of-input, or a fatal error.
    ///
    /// The exit-time expense display and history save run regardless of
    /// how the loop ended; a fatal error still propagates after them.
    pub async fn run(&mut self, initial_question: Option<String>) -> Result<()> {
        let mut editor = self.build_editor()?;
        let history_path = Config::history_path();
        if let Some(path) = &history_path {
            // First run has no history file yet.
            let _ = editor.load_history(path);
        }

        let session_name = self
            .session
            .loaded_name()
            .unwrap_or("new session")
            .to_string();
        self.renderer.greet(&self.session, &session_name, true);

        let outcome = self.interact(&mut editor, initial_question).await;
        self.finish(&mut editor, history_path.as_deref());
        outcome
    }

    /// The read-dispatch-stream cycle; errors return without cleanup.
    async fn interact(
        &mut self,
        editor: &mut LineEditor,
        initial_question: Option<String>,
    ) -> Result<()> {
        if let Some(question) = initial_question {
            // Echo the CLI question as if it had been typed at the prompt.
            let prompt = self.renderer.prompt(&self.session, self.proxied);
            println!("{}{}", prompt, question);
            editor.add_history_entry(&question)?;
            self.handle_line(&question).await?;
        }

        loop {
            let prompt = self.renderer.prompt(&self.session, self.proxied);
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = if self.session.multiline() {
                        match self.gather_multiline(editor, line)? {
                            Some(gathered) => gathered,
                            None => continue,
                        }
                    } else {
                        line
                    };
                    if !line.trim().is_empty() {
                        editor.add_history_entry(line.trim())?;
                    }
                    if !self.handle_line(&line).await? {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Exit-time accounting and history persistence.
    fn finish(&self, editor: &mut LineEditor, history_path: Option<&Path>) {
        self.renderer
            .expense(&self.session, self.config.pricing_for(self.session.model()));
        if let Some(path) = history_path {
            if let Err(err) = editor.save_history(path) {
                warn!("failed to save prompt history: {}", err);
            }
        }
    }

    /// Dispatch one line; returns `false` when the session should end.
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        match dispatch(line, &mut self.session, &self.config, &self.renderer)? {
            Outcome::Consumed => Ok(true),
            Outcome::Quit => Ok(false),
            Outcome::Turn(content) => {
                self.stream_turn(&content).await?;
                Ok(true)
            }
        }
    }

    /// Stream one conversational turn.
    ///
    /// The user message is appended first so the request carries it; on a
    /// turn-recoverable failure it is rolled back along with its token
    /// charge, leaving the session exactly as before the turn.
    async fn stream_turn(&mut self, content: &str) -> Result<()> {
        self.session.append_user(content);
        self.session.expire_oneshot_multiline();

        let mut stream = match self
            .provider
            .stream_complete(self.session.model(), self.session.messages())
            .await
        {
            Ok(stream) => stream,
            Err(err) => return self.handle_turn_failure(err),
        };

        // The provider opens every response by announcing the speaker.
        let mut response = String::new();
        match stream.next().await {
            Some(Ok(delta)) if delta.role == Some(Role::Assistant) => {
                if let Some(text) = delta.content {
                    response.push_str(&text);
                }
            }
            Some(Err(err)) => return self.handle_turn_failure(err),
            _ => {
                self.session.rollback_user();
                return Err(ConverseError::Protocol(
                    "response stream did not open with an assistant role".to_string(),
                )
                .into());
            }
        }

        self.renderer.begin_response(self.session.model());
        self.renderer.fragment(&response);
        let started = Instant::now();
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    if let Some(text) = delta.content {
                        response.push_str(&text);
                        self.renderer.fragment(&text);
                    }
                }
                Err(err) => {
                    println!();
                    return self.handle_turn_failure(err);
                }
            }
        }
        self.renderer.end_response(started.elapsed());

        debug!(
            chars = response.len(),
            model = self.session.model(),
            "turn complete"
        );
        self.session.append_assistant(response);
        Ok(())
    }

    /// Classify a turn failure: recoverable ones roll back and return to
    /// the prompt, everything else propagates and ends the session.
    fn handle_turn_failure(&mut self, err: anyhow::Error) -> Result<()> {
        let recoverable = err
            .downcast_ref::<ConverseError>()
            .map(ConverseError::is_turn_recoverable)
            .unwrap_or(false);
        if recoverable {
            self.session.rollback_user();
            self.renderer.error(&format!("{:#}", err));
            self.renderer.notice("The session can continue.");
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Gather continuation lines until an empty line submits the message.
    ///
    /// Ctrl-C during continuation abandons the whole message.
    fn gather_multiline(&self, editor: &mut LineEditor, first: String) -> Result<Option<String>> {
        let mut lines = vec![first];
        loop {
            match editor.readline(&self.renderer.continuation_prompt()) {
                Ok(line) if line.is_empty() => break,
                Ok(line) => lines.push(line),
                Err(ReadlineError::Interrupted) => return Ok(None),
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Some(lines.join("\n")))
    }

    fn build_editor(&self) -> Result<LineEditor> {
        let mut builder = rustyline::Config::builder().auto_add_history(false);
        if self.config.vi_mode {
            builder = builder.edit_mode(EditMode::Vi);
        }
        Editor::with_config(builder.build()).map_err(|err| anyhow!("line editor: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{DeltaStream, Message, ResponseDelta};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    type Script = Vec<std::result::Result<ResponseDelta, ConverseError>>;

    /// Scripted provider: each call takes the next canned response script.
    struct ScriptedProvider {
        scripts: Mutex<VecDeque<Script>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn stream_complete(&self, _model: &str, _messages: &[Message]) -> Result<DeltaStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
            let (tx, rx) = mpsc::unbounded_channel();
            for item in script {
                tx.send(item.map_err(Into::into)).ok();
            }
            Ok(DeltaStream::new(rx))
        }
    }

    fn role_delta() -> ResponseDelta {
        ResponseDelta {
            role: Some(Role::Assistant),
            content: None,
        }
    }

    fn content_delta(text: &str) -> ResponseDelta {
        ResponseDelta {
            role: None,
            content: Some(text.to_string()),
        }
    }

    fn chat(provider: ScriptedProvider) -> Chat {
        Chat::new(
            Session::new("gpt-4", None),
            Box::new(provider),
            Config::default(),
            Renderer::new(false),
        )
    }

    #[tokio::test]
    async fn test_turn_accumulates_fragments() {
        let provider = ScriptedProvider::new(vec![vec![
            Ok(role_delta()),
            Ok(content_delta("Hel")),
            Ok(content_delta("lo")),
        ]]);
        let mut chat = chat(provider);

        chat.stream_turn("hi").await.unwrap();
        let messages = chat.session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hello");
        assert!(chat.session.tally().assistant > 0);
    }

    #[tokio::test]
    async fn test_missing_role_delta_is_protocol_error() {
        let provider = ScriptedProvider::new(vec![vec![Ok(content_delta("oops"))]]);
        let mut chat = chat(provider);

        let err = chat.stream_turn("hi").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConverseError>(),
            Some(ConverseError::Protocol(_))
        ));
        // The pending user message was rolled back.
        assert!(chat.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_rolls_back_and_recovers() {
        let provider = ScriptedProvider::new(vec![
            vec![Err(ConverseError::RateLimited("quota exceeded".to_string()))],
            vec![Ok(role_delta()), Ok(content_delta("ok"))],
        ]);
        let mut chat = chat(provider);

        chat.stream_turn("first").await.unwrap();
        assert!(chat.session.messages().is_empty());
        assert_eq!(chat.session.tally().total(), 0);

        chat.stream_turn("second").await.unwrap();
        assert_eq!(chat.session.messages().len(), 2);
        assert_eq!(chat.session.messages()[0].content, "second");
    }

    #[tokio::test]
    async fn test_authentication_error_propagates() {
        let provider = ScriptedProvider::new(vec![vec![Err(ConverseError::Authentication(
            "invalid API key".to_string(),
        ))]]);
        let mut chat = chat(provider);

        let err = chat.stream_turn("hi").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConverseError>(),
            Some(ConverseError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_rolls_back() {
        let provider = ScriptedProvider::new(vec![vec![
            Ok(role_delta()),
            Ok(content_delta("partial")),
            Err(ConverseError::Connection("reset".to_string())),
        ]]);
        let mut chat = chat(provider);

        chat.stream_turn("hi").await.unwrap();
        // Neither the user turn nor the partial response survives.
        assert!(chat.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_epilogue_runs_after_fatal_turn_error() {
        let provider = ScriptedProvider::new(vec![vec![Err(ConverseError::Authentication(
            "invalid API key".to_string(),
        ))]]);
        let mut chat = chat(provider);

        let err = chat.stream_turn("hi").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConverseError>(),
            Some(ConverseError::Authentication(_))
        ));

        // The session still ends with accounting and a history save.
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history");
        let mut editor = chat.build_editor().unwrap();
        editor.add_history_entry("hi").unwrap();
        chat.finish(&mut editor, Some(history.as_path()));
        assert!(history.exists());
    }

    #[tokio::test]
    async fn test_oneshot_multiline_expires_on_turn() {
        let provider =
            ScriptedProvider::new(vec![vec![Ok(role_delta()), Ok(content_delta("hi"))]]);
        let mut chat = chat(provider);
        chat.session.toggle_multiline(true);
        assert!(chat.session.multiline());

        chat.stream_turn("question").await.unwrap();
        assert!(!chat.session.multiline());
    }
}
