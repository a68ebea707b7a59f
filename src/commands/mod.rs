//! Command recognition
//!
//! Maps transcript text onto the fixed command vocabulary. An exact substring
//! pass runs first; a fuzzy similarity pass catches near-misses from the
//! speech recognizer ("hanumaan", "gandarva").

mod similarity;

pub use similarity::ratio;

use serde::Serialize;

/// Minimum fuzzy similarity (exclusive) for a trigger phrase to count
pub const FUZZY_THRESHOLD: f64 = 0.65;

/// A recognized command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandTag {
    /// Wake the assistant
    Wake,
    /// Conversation mode
    Aagya,
    /// Joke mode
    Hasya,
    /// Game mode
    Yudha,
    /// Music mode
    Gandharva,
    /// Search mode
    Khoj,
    /// Return to idle
    Exit,
}

impl CommandTag {
    /// Lowercase identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Aagya => "aagya",
            Self::Hasya => "hasya",
            Self::Yudha => "yudha",
            Self::Gandharva => "gandharva",
            Self::Khoj => "khoj",
            Self::Exit => "exit",
        }
    }

    /// Whether this tag switches the conversational mode
    #[must_use]
    pub const fn is_mode(self) -> bool {
        !matches!(self, Self::Wake | Self::Exit)
    }

    /// Exact-match precedence when several tags occur in one transcript
    ///
    /// Lower wins. Global commands outrank mode switches.
    const fn precedence(self) -> u8 {
        match self {
            Self::Exit => 0,
            Self::Wake => 1,
            _ => 2,
        }
    }
}

impl std::fmt::Display for CommandTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trigger phrases per tag, in declaration order
pub const VOCABULARY: &[(CommandTag, &[&str])] = &[
    (
        CommandTag::Wake,
        &[
            "hanuman",
            "anuman",
            "human",
            "naman",
            "hello hanuman",
            "hey hanuman",
            "हनुमान",
            "jai shri ram",
        ],
    ),
    (
        CommandTag::Aagya,
        &["aagya", "chat", "talk", "anya", "bat", "आज्ञा", "baat"],
    ),
    (
        CommandTag::Hasya,
        &["hasya", "joke", "funny", "laugh", "chutkule", "hasa", "हास्य"],
    ),
    (
        CommandTag::Yudha,
        &["yudha", "game", "play", "fight", "war", "yuda", "युद्ध", "khel"],
    ),
    (
        CommandTag::Gandharva,
        &["gandharva", "music", "song", "gana", "play song", "dj", "गंधर्व"],
    ),
    (
        CommandTag::Khoj,
        &["khoj", "search", "find", "google", "dhoondo", "खोज"],
    ),
    (
        CommandTag::Exit,
        &["exit", "stop", "back", "bye", "band", "ruk", "बंद"],
    ),
];

/// Result of command identification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommandMatch {
    /// Recognized command, if any
    pub tag: Option<CommandTag>,
    /// Confidence in `[0, 1]`; `1.0` for exact matches
    pub confidence: f64,
}

impl CommandMatch {
    /// No command recognized
    #[must_use]
    pub const fn none() -> Self {
        Self {
            tag: None,
            confidence: 0.0,
        }
    }

    /// Whether a command was recognized
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        self.tag.is_some()
    }
}

/// Identify the command in a transcript
///
/// Exact pass: every tag with a trigger phrase contained in the normalized
/// text is a candidate. Exit beats wake, wake beats mode switches, and among
/// mode switches the longest matching phrase wins ("play song" is music, not
/// a game), then declaration order.
///
/// Fuzzy pass: best similarity ratio above [`FUZZY_THRESHOLD`] across all
/// trigger phrases; ties keep the earlier phrase.
#[must_use]
pub fn identify(text: &str) -> CommandMatch {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return CommandMatch::none();
    }

    if let Some(tag) = exact_match(&normalized) {
        return CommandMatch {
            tag: Some(tag),
            confidence: 1.0,
        };
    }

    fuzzy_match(&normalized)
}

fn exact_match(normalized: &str) -> Option<CommandTag> {
    let candidates: Vec<(CommandTag, usize)> = VOCABULARY
        .iter()
        .filter_map(|(tag, phrases)| {
            phrases
                .iter()
                .filter(|phrase| normalized.contains(*phrase))
                .map(|phrase| phrase.chars().count())
                .max()
                .map(|longest| (*tag, longest))
        })
        .collect();

    if candidates.len() > 1 {
        tracing::debug!(
            text = normalized,
            candidates = ?candidates.iter().map(|(tag, _)| tag.as_str()).collect::<Vec<_>>(),
            "ambiguous command match"
        );
    }

    // min_by_key keeps the first of equal keys, preserving declaration order
    candidates
        .into_iter()
        .min_by_key(|(tag, longest)| (tag.precedence(), std::cmp::Reverse(*longest)))
        .map(|(tag, _)| tag)
}

fn fuzzy_match(normalized: &str) -> CommandMatch {
    let mut best = CommandMatch::none();

    for (tag, phrases) in VOCABULARY {
        for phrase in *phrases {
            let score = ratio(phrase, normalized);
            if score > FUZZY_THRESHOLD && score > best.confidence {
                best = CommandMatch {
                    tag: Some(*tag),
                    confidence: score,
                };
            }
        }
    }

    if let Some(tag) = best.tag {
        tracing::trace!(text = normalized, %tag, score = best.confidence, "fuzzy command match");
    }

    best
}
