//! Turbo/large transcription race

use std::sync::Arc;

use secrecy::SecretString;
use tokio::task::{JoinError, JoinHandle};

use super::{GroqWhisper, SpeechToText, SttModel, Transcription, filter_hallucination};
use crate::Result;
use crate::commands;
use crate::config::SpeechConfig;
use crate::events::RequestLog;

/// Runs the fast and accurate models concurrently against one clip
///
/// The turbo transcript wins outright when it contains a command. Otherwise
/// the longer of the two transcripts is kept, ties going to the large model.
#[derive(Clone)]
pub struct DualTranscriber {
    backend: Option<Arc<dyn SpeechToText>>,
    turbo_model: String,
    large_model: String,
}

impl std::fmt::Debug for DualTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualTranscriber")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("turbo_model", &self.turbo_model)
            .field("large_model", &self.large_model)
            .finish()
    }
}

impl DualTranscriber {
    /// Create a transcriber over an optional backend
    #[must_use]
    pub fn new(
        backend: Option<Arc<dyn SpeechToText>>,
        turbo_model: impl Into<String>,
        large_model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            turbo_model: turbo_model.into(),
            large_model: large_model.into(),
        }
    }

    /// Build from configuration, using Groq when a key is present
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(api_key: Option<&SecretString>, config: &SpeechConfig) -> Result<Self> {
        let backend: Option<Arc<dyn SpeechToText>> = match api_key {
            Some(key) => Some(Arc::new(GroqWhisper::new(key.clone(), config)?)),
            None => {
                tracing::warn!("GROQ_API_KEY not set, transcription disabled");
                None
            }
        };

        Ok(Self::new(
            backend,
            config.turbo_model.clone(),
            config.large_model.clone(),
        ))
    }

    /// Whether a backend is configured
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Transcribe a clip, preferring a fast command match
    ///
    /// Never fails: provider errors are logged and count as silence.
    pub async fn transcribe_smart(&self, audio: Vec<u8>, log: &mut RequestLog) -> Transcription {
        let Some(backend) = self.backend.clone() else {
            log.error("Groq API key missing!");
            return Transcription::empty(SttModel::Turbo);
        };

        let audio: Arc<[u8]> = audio.into();
        let turbo = spawn_call(Arc::clone(&backend), Arc::clone(&audio), &self.turbo_model);
        let large = spawn_call(backend, audio, &self.large_model);

        let turbo_text = settle(turbo.await, &self.turbo_model, log);
        log.debug(format!("Turbo heard: '{turbo_text}'"));

        if let Some(tag) = commands::identify(&turbo_text).tag {
            large.abort();
            log.success(format!(
                "Fast match detected: {}",
                tag.as_str().to_uppercase()
            ));
            return Transcription {
                text: turbo_text,
                source: SttModel::Turbo,
            };
        }

        let large_text = settle(large.await, &self.large_model, log);
        log.debug(format!("Large heard: '{large_text}'"));

        if large_text.chars().count() >= turbo_text.chars().count() {
            Transcription {
                text: large_text,
                source: SttModel::Large,
            }
        } else {
            Transcription {
                text: turbo_text,
                source: SttModel::Turbo,
            }
        }
    }
}

fn spawn_call(
    backend: Arc<dyn SpeechToText>,
    audio: Arc<[u8]>,
    model: &str,
) -> JoinHandle<Result<String>> {
    let model = model.to_string();
    tokio::spawn(async move {
        backend
            .transcribe(&audio, &model)
            .await
            .map(|text| filter_hallucination(&text))
    })
}

/// Collapse a finished call into a transcript, logging failures
fn settle(
    joined: std::result::Result<Result<String>, JoinError>,
    model: &str,
    log: &mut RequestLog,
) -> String {
    match joined {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            log.error(format!("STT Error ({model}): {e}"));
            String::new()
        }
        Err(e) => {
            log.error(format!("STT Error ({model}): task failed: {e}"));
            String::new()
        }
    }
}
