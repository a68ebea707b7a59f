//! Conversational sessions and the mode state machine
//!
//! Each session tracks which mode the assistant is in. Sessions are keyed by
//! the client-supplied session ID so concurrent users never share state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::commands::CommandTag;

/// Session ID used when the client does not supply one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Reply when returning to idle
pub const EXIT_REPLY: &str = "Stopping.";

/// Reply when woken
pub const WAKE_REPLY: &str = "Jai Shri Ram. I am ready.";

/// How long an unused session is kept
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on tracked sessions
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Base persona prompt for language-model replies
pub const BASE_PROMPT: &str = "You are Hanuman. Be concise, wise, and helpful. Use 1 sentence.";

/// Conversational mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Asleep; only wake is honoured
    #[default]
    Idle,
    /// Awake, general conversation
    Active,
    /// Conversation
    Aagya,
    /// Jokes
    Hasya,
    /// Games
    Yudha,
    /// Music
    Gandharva,
    /// Search
    Khoj,
}

impl Mode {
    /// Mode entered by a mode-switch command
    #[must_use]
    pub const fn from_tag(tag: CommandTag) -> Option<Self> {
        match tag {
            CommandTag::Aagya => Some(Self::Aagya),
            CommandTag::Hasya => Some(Self::Hasya),
            CommandTag::Yudha => Some(Self::Yudha),
            CommandTag::Gandharva => Some(Self::Gandharva),
            CommandTag::Khoj => Some(Self::Khoj),
            CommandTag::Wake | CommandTag::Exit => None,
        }
    }

    /// Lowercase identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Aagya => "aagya",
            Self::Hasya => "hasya",
            Self::Yudha => "yudha",
            Self::Gandharva => "gandharva",
            Self::Khoj => "khoj",
        }
    }

    /// System prompt used when this mode delegates to the language model
    #[must_use]
    pub fn system_prompt(self) -> String {
        match self {
            Self::Hasya => format!("{BASE_PROMPT} Tell a joke."),
            Self::Khoj => format!("{BASE_PROMPT} Search and answer."),
            _ => BASE_PROMPT.to_string(),
        }
    }

    /// Spoken announcement when entering this mode, e.g. "Hasya mode."
    #[must_use]
    pub fn announcement(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        chars.next().map_or_else(String::new, |first| {
            format!("{}{} mode.", first.to_uppercase(), chars.as_str())
        })
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying a recognized command to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Respond with a fixed reply
    Reply(String),
    /// Stay silent
    Ignore,
    /// Ask the language model using this system prompt
    Delegate {
        /// System prompt for the active mode
        system_prompt: String,
    },
}

/// State for one conversation
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    mode: Mode,
}

impl Session {
    /// Create an idle session
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: Mode::Idle,
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Apply a recognized command (or none) and return what to do next
    ///
    /// This is the only place the mode changes.
    pub fn transition(&mut self, tag: Option<CommandTag>) -> Transition {
        match tag {
            Some(CommandTag::Exit) => {
                self.set_mode(Mode::Idle);
                return Transition::Reply(EXIT_REPLY.to_string());
            }
            Some(CommandTag::Wake) => {
                self.set_mode(Mode::Active);
                return Transition::Reply(WAKE_REPLY.to_string());
            }
            _ => {}
        }

        if self.mode == Mode::Idle {
            return Transition::Ignore;
        }

        // Repeating the current mode's command is treated as a request in that mode
        if let Some(next) = tag.and_then(Mode::from_tag)
            && next != self.mode
        {
            self.set_mode(next);
            return Transition::Reply(next.announcement());
        }

        Transition::Delegate {
            system_prompt: self.mode.system_prompt(),
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(session = %self.id, from = %self.mode, to = %mode, "mode change");
        }
        self.mode = mode;
    }
}

/// Shared handle to one session
pub type SharedSession = Arc<Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_seen: Instant,
}

impl Slot {
    /// Held by an in-flight request
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

/// In-memory session registry keyed by session ID
///
/// Sessions unused for longer than the TTL are dropped when a new session is
/// created, and the registry never grows past `max_sessions` idle entries.
/// A session held by an in-flight request is never evicted.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Slot>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .field("max_sessions", &self.max_sessions)
            .finish_non_exhaustive()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    /// Create an empty store with default limits
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with an idle TTL and a size cap
    #[must_use]
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Get the session for `id`, creating an idle one on first use
    pub async fn get_or_create(&self, id: &str) -> SharedSession {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(slot) = sessions.get_mut(id) {
            slot.last_seen = now;
            return slot.session.clone();
        }

        self.evict(&mut sessions, now);

        tracing::info!(session = id, "new session");
        let session = Arc::new(Mutex::new(Session::new(id)));
        sessions.insert(
            id.to_string(),
            Slot {
                session: session.clone(),
                last_seen: now,
            },
        );
        session
    }

    /// Drop expired sessions, then the least recently used until there is room
    fn evict(&self, sessions: &mut HashMap<String, Slot>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, slot| slot.in_use() || now.duration_since(slot.last_seen) < self.ttl);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, slot)| !slot.in_use())
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(id, _)| id.clone());
            let Some(id) = oldest else {
                tracing::warn!(sessions = sessions.len(), "session limit reached, all sessions busy");
                break;
            };
            sessions.remove(&id);
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
    }

    /// Current mode of a session, if it exists
    pub async fn mode_of(&self, id: &str) -> Option<Mode> {
        let session = self.sessions.read().await.get(id)?.session.clone();
        let mode = session.lock().await.mode();
        Some(mode)
    }

    /// Number of known sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session has been created yet
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
