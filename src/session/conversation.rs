//! Session state: conversation history, token counters, reset baseline
//!
//! The session owns the ordered message list for the active conversation,
//! the per-role token tally, the multiline input flag, and the optional
//! loaded baseline (a named context or a previously saved session) that
//! soft resets restore to. Messages are append-only within a
//! conversation's lifetime; resets rebuild the list rather than mutating
//! it in place.

use crate::providers::{Message, Role};
use crate::session::tokens::{count_tokens, TokenTally};

/// A named reset target: either a context's system message or a loaded
/// session file's message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    /// Context name or session filepath
    pub name: String,
    /// Messages restored by a soft reset
    pub messages: Vec<Message>,
}

/// How the current multiline flag was toggled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultilineMode {
    /// Flag is in its committed state
    #[default]
    Off,
    /// Flag was flipped and committed
    Persistent,
    /// Flag was flipped for the next plain turn only, then reverts
    OneShot,
}

/// The mutable unit of work: one live conversation and its accounting
#[derive(Debug, Clone)]
pub struct Session {
    model: String,
    messages: Vec<Message>,
    tally: TokenTally,
    multiline: bool,
    multiline_mode: MultilineMode,
    loaded: Option<Baseline>,
}

impl Session {
    /// Create a session, optionally pre-seeded from a loaded baseline.
    ///
    /// # Examples
    ///
    /// ```
    /// use converse::session::Session;
    ///
    /// let session = Session::new("gpt-4", None);
    /// assert!(session.messages().is_empty());
    /// assert_eq!(session.tally().total(), 0);
    /// ```
    pub fn new(model: impl Into<String>, loaded: Option<Baseline>) -> Self {
        let mut session = Self {
            model: model.into(),
            messages: Vec::new(),
            tally: TokenTally::default(),
            multiline: false,
            multiline_mode: MultilineMode::Off,
            loaded,
        };
        session.reset(false);
        session
    }

    /// The active model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Change the active model. Callers pair this with a soft reset.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Ordered conversation messages, insertion order preserved
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Cumulative per-role token counters
    pub fn tally(&self) -> TokenTally {
        self.tally
    }

    /// Name of the loaded baseline, if any
    pub fn loaded_name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|b| b.name.as_str())
    }

    /// Whether multiline input is currently enabled
    pub fn multiline(&self) -> bool {
        self.multiline
    }

    /// How the multiline flag was last toggled, for prompt status tags
    pub fn multiline_mode(&self) -> MultilineMode {
        self.multiline_mode
    }

    /// Append a user turn, charging the token count of the entire
    /// conversation including the new message to the user counter.
    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
        self.tally.user += count_tokens(&self.messages, &self.model);
    }

    /// Append an assistant turn, charging only that message's token count
    /// to the assistant counter.
    pub fn append_assistant(&mut self, content: impl Into<String>) {
        let message = Message::assistant(content);
        self.tally.assistant += count_tokens(std::slice::from_ref(&message), &self.model);
        self.messages.push(message);
    }

    /// Remove the pending user turn after a turn-recoverable failure,
    /// restoring the user counter to its pre-append value.
    ///
    /// Must be called before anything else is appended: the charge is
    /// recomputed from the conversation as it stands. A no-op when the
    /// last message is not a user turn.
    pub fn rollback_user(&mut self) {
        let is_user_last = matches!(self.messages.last(), Some(m) if m.role == Role::User);
        if !is_user_last {
            return;
        }
        let charge = count_tokens(&self.messages, &self.model);
        self.tally.user = self.tally.user.saturating_sub(charge);
        self.messages.pop();
    }

    /// Reset the conversation.
    ///
    /// A soft reset rebuilds the message list from the loaded baseline
    /// (or empty if none); a hard reset clears the baseline too. Both
    /// zero the token counters.
    pub fn reset(&mut self, hard: bool) {
        if hard {
            self.loaded = None;
        }
        self.messages = self
            .loaded
            .as_ref()
            .map(|b| b.messages.clone())
            .unwrap_or_default();
        self.tally = TokenTally::default();
    }

    /// Install or one-off-apply a baseline.
    ///
    /// When `persistent`, the baseline replaces the current one and a soft
    /// reset restores the session to it. Otherwise the given messages
    /// become the conversation for this session only; the existing
    /// baseline is untouched and a later soft reset reverts to it, not to
    /// this load.
    pub fn load_baseline(&mut self, name: impl Into<String>, messages: Vec<Message>, persistent: bool) {
        if persistent {
            self.loaded = Some(Baseline {
                name: name.into(),
                messages,
            });
            self.reset(false);
        } else {
            self.reset(false);
            self.messages = messages;
        }
    }

    /// Look up the `index`-th most recent turn for display.
    ///
    /// Index `k` addresses the message `2k-1` positions from the end,
    /// reflecting the user/assistant pairing; an out-of-range index is a
    /// silent `None`, never an error. The convention requires the
    /// conversation to be strictly longer than the offset, so a single
    /// lone message is never addressable.
    pub fn replay(&self, index: usize) -> Option<&str> {
        let offset = index.checked_mul(2)?.checked_sub(1)?;
        if self.messages.len() > offset {
            Some(&self.messages[self.messages.len() - offset].content)
        } else {
            None
        }
    }

    /// Flip the multiline flag.
    ///
    /// The one-shot variant schedules an automatic revert after the next
    /// plain turn is consumed; the persistent variant commits immediately.
    pub fn toggle_multiline(&mut self, oneshot: bool) {
        self.multiline = !self.multiline;
        self.multiline_mode = if oneshot {
            MultilineMode::OneShot
        } else if self.multiline {
            MultilineMode::Persistent
        } else {
            MultilineMode::Off
        };
    }

    /// Revert a one-shot multiline toggle after a plain turn was consumed.
    pub fn expire_oneshot_multiline(&mut self) {
        if self.multiline_mode == MultilineMode::OneShot {
            self.multiline = !self.multiline;
            self.multiline_mode = if self.multiline {
                MultilineMode::Persistent
            } else {
                MultilineMode::Off
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Message;
    use crate::session::tokens::count_tokens;

    fn baseline() -> Baseline {
        Baseline {
            name: "default".to_string(),
            messages: vec![Message::system("You are terse.")],
        }
    }

    #[test]
    fn test_new_session_seeds_from_baseline() {
        let session = Session::new("gpt-4", Some(baseline()));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.loaded_name(), Some("default"));
        assert_eq!(session.tally().total(), 0);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("a");
        session.append_assistant("b");
        session.append_user("c");
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(session.messages()[2].content, "c");
    }

    #[test]
    fn test_user_charge_covers_whole_conversation() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("Hi");
        let first_charge = count_tokens(session.messages(), "gpt-4");
        assert_eq!(session.tally().user, first_charge);

        session.append_assistant("Hello");
        session.append_user("More");
        // The second user turn re-charges the full history including itself.
        let full = count_tokens(session.messages(), "gpt-4");
        assert_eq!(session.tally().user, first_charge + full);
    }

    #[test]
    fn test_assistant_charge_covers_only_its_message() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("Hi");
        session.append_assistant("Hello");
        let solo = count_tokens(&[Message::assistant("Hello")], "gpt-4");
        assert_eq!(session.tally().assistant, solo);
    }

    #[test]
    fn test_rollback_user_restores_length_and_counters() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("first");
        session.append_assistant("reply");
        let tally_before = session.tally();
        let len_before = session.messages().len();

        session.append_user("doomed");
        session.rollback_user();

        assert_eq!(session.messages().len(), len_before);
        assert_eq!(session.tally(), tally_before);
    }

    #[test]
    fn test_rollback_user_noop_when_last_is_assistant() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("q");
        session.append_assistant("a");
        let tally = session.tally();
        session.rollback_user();
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.tally(), tally);
    }

    #[test]
    fn test_soft_reset_restores_baseline_and_zeroes_counters() {
        let mut session = Session::new("gpt-4", Some(baseline()));
        session.append_user("hi");
        session.append_assistant("hello");
        assert!(session.tally().total() > 0);

        session.reset(false);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.tally().total(), 0);
        assert_eq!(session.loaded_name(), Some("default"));
    }

    #[test]
    fn test_hard_reset_clears_baseline() {
        let mut session = Session::new("gpt-4", Some(baseline()));
        session.reset(true);
        assert!(session.messages().is_empty());
        assert!(session.loaded_name().is_none());

        // A later soft reset now restores to empty.
        session.append_user("hi");
        session.reset(false);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_persistent_load_replaces_baseline() {
        let mut session = Session::new("gpt-4", Some(baseline()));
        let restored = vec![Message::user("old q"), Message::assistant("old a")];
        session.load_baseline("saved.json", restored.clone(), true);

        assert_eq!(session.messages(), restored.as_slice());
        assert_eq!(session.loaded_name(), Some("saved.json"));

        session.append_user("new");
        session.reset(false);
        assert_eq!(session.messages(), restored.as_slice());
    }

    #[test]
    fn test_temporary_load_leaves_baseline_untouched() {
        let mut session = Session::new("gpt-4", Some(baseline()));
        let one_off = vec![Message::user("q"), Message::assistant("a")];
        session.load_baseline("temp.json", one_off.clone(), false);

        assert_eq!(session.messages(), one_off.as_slice());
        assert_eq!(session.loaded_name(), Some("default"));

        // Soft reset reverts to the old baseline, not the one-off load.
        session.reset(false);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
    }

    #[test]
    fn test_replay_most_recent_pair() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("a");
        session.append_assistant("b");
        assert_eq!(session.replay(1), Some("b"));
        // Only one pair present: index 2 addresses offset 3, out of range.
        assert_eq!(session.replay(2), None);
    }

    #[test]
    fn test_replay_offset_convention() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("q1");
        session.append_assistant("a1");
        session.append_user("q2");
        session.append_assistant("a2");
        // Index 2 lands 3 positions from the end: the first assistant reply.
        assert_eq!(session.replay(2), Some("a1"));
    }

    #[test]
    fn test_replay_single_message_not_addressable() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("lonely");
        assert_eq!(session.replay(1), None);
    }

    #[test]
    fn test_replay_index_zero_is_none() {
        let mut session = Session::new("gpt-4", None);
        session.append_user("a");
        session.append_assistant("b");
        assert_eq!(session.replay(0), None);
    }

    #[test]
    fn test_oneshot_multiline_reverts() {
        let mut session = Session::new("gpt-4", None);
        assert!(!session.multiline());

        session.toggle_multiline(true);
        assert!(session.multiline());

        session.expire_oneshot_multiline();
        assert!(!session.multiline());

        // A second expiry is a no-op.
        session.expire_oneshot_multiline();
        assert!(!session.multiline());
    }

    #[test]
    fn test_persistent_toggle_off_clears_mode() {
        let mut session = Session::new("gpt-4", None);
        session.toggle_multiline(false);
        assert_eq!(session.multiline_mode(), MultilineMode::Persistent);
        session.toggle_multiline(false);
        assert!(!session.multiline());
        assert_eq!(session.multiline_mode(), MultilineMode::Off);
    }

    #[test]
    fn test_persistent_multiline_survives_expiry() {
        let mut session = Session::new("gpt-4", None);
        session.toggle_multiline(false);
        assert!(session.multiline());
        session.expire_oneshot_multiline();
        assert!(session.multiline());
    }
}
