//! `ElevenLabs` voice provider

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::VoiceProvider;
use crate::config::VoiceConfig;
use crate::{Error, Result};

const STABILITY: f64 = 0.5;
const SIMILARITY_BOOST: f64 = 0.7;

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

/// Primary voice: `ElevenLabs` text-to-speech
pub struct ElevenLabs {
    client: reqwest::Client,
    api_key: SecretString,
    url: String,
    model: String,
}

impl std::fmt::Debug for ElevenLabs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabs")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ElevenLabs {
    /// Create a provider
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: SecretString, config: &VoiceConfig) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.elevenlabs_timeout)
                .build()?,
            api_key,
            url: format!(
                "{}/v1/text-to-speech/{}",
                config.elevenlabs_base_url.trim_end_matches('/'),
                config.elevenlabs_voice_id
            ),
            model: config.elevenlabs_model.clone(),
        })
    }
}

#[async_trait]
impl VoiceProvider for ElevenLabs {
    fn name(&self) -> &'static str {
        "ElevenLabs"
    }

    fn file_prefix(&self) -> &'static str {
        "eleven"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SynthesisRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: STABILITY,
                similarity_boost: SIMILARITY_BOOST,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}
