//! Groq Whisper transcription client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::SpeechToText;
use crate::config::SpeechConfig;
use crate::{Error, Result};

/// Response from the OpenAI-compatible transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Transcribes speech through Groq's hosted Whisper models
pub struct GroqWhisper {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    language: String,
    prompt: String,
}

impl std::fmt::Debug for GroqWhisper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqWhisper")
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl GroqWhisper {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: SecretString, config: &SpeechConfig) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "Groq API key required for transcription".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/audio/transcriptions",
                config.base_url.trim_end_matches('/')
            ),
            language: config.language.clone(),
            prompt: config.prompt.clone(),
        })
    }
}

#[async_trait]
impl SpeechToText for GroqWhisper {
    async fn transcribe(&self, audio: &[u8], model: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), model, "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", model.to_string())
            .text("language", self.language.clone())
            .text("prompt", self.prompt.clone())
            .text("temperature", "0");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, model, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        tracing::debug!(model, transcript = %result.text, "transcription complete");

        Ok(result.text)
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}
