//! Speech-to-text
//!
//! A [`SpeechToText`] backend turns one audio clip into text for a named
//! model. [`DualTranscriber`] races two models against the same clip.

mod groq;
mod race;

pub use groq::GroqWhisper;
pub use race::DualTranscriber;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;

/// Phrases Whisper emits for silence or noise
const HALLUCINATIONS: &[&str] = &["you", "thank you", "bye", "am i", "mbc news"];

/// Which model produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SttModel {
    /// Fast model, awaited first
    Turbo,
    /// Accurate model
    Large,
}

impl SttModel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Turbo => "turbo",
            Self::Large => "large",
        }
    }
}

/// Final transcript for one clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    /// Transcript text, empty when nothing usable was heard
    pub text: String,
    /// Model the text came from
    pub source: SttModel,
}

impl Transcription {
    /// Nothing heard
    #[must_use]
    pub const fn empty(source: SttModel) -> Self {
        Self {
            text: String::new(),
            source,
        }
    }

    /// Whether no speech was recognized
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Hosted speech-to-text backend
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe `audio` with `model`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response
    async fn transcribe(&self, audio: &[u8], model: &str) -> Result<String>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Trim a transcript and blank out known silence hallucinations
#[must_use]
pub fn filter_hallucination(text: &str) -> String {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();

    if HALLUCINATIONS.contains(&lowered.as_str()) {
        tracing::debug!(text = trimmed, "dropping hallucinated transcript");
        return String::new();
    }

    trimmed.to_string()
}
