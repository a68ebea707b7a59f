//! Microsoft Edge neural voice provider
//!
//! POSTs an SSML document and reads MP3 bytes back. No key needed.

use async_trait::async_trait;

use super::VoiceProvider;
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Edge read-aloud synthesis endpoint
///
/// The public service mostly speaks its WebSocket protocol and may reject a
/// plain POST, leaving replies silent when ElevenLabs is also unavailable.
/// Point `HANUMAN_EDGE_ENDPOINT` (or `[voice] edge_endpoint`) at an
/// SSML-over-HTTP bridge in that case.
pub const EDGE_TTS_ENDPOINT: &str =
    "https://speech.platform.bing.com/consumer/speech/synthesize/readaloud";

const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

const MAX_VOICE_NAME_LEN: usize = 128;

/// Fallback voice: Edge neural TTS
#[derive(Debug)]
pub struct EdgeTts {
    client: reqwest::Client,
    endpoint: String,
    voice: String,
    locale: String,
}

impl EdgeTts {
    /// Create a provider for the configured voice
    ///
    /// # Errors
    ///
    /// Returns error if the voice or locale name is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        validate_name(&config.edge_voice)?;
        validate_name(&config.edge_locale)?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.edge_timeout)
                .build()?,
            endpoint: config.edge_endpoint.clone(),
            voice: config.edge_voice.clone(),
            locale: config.edge_locale.clone(),
        })
    }

    /// Configured voice name
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// SSML request body for `text`
    #[must_use]
    pub fn build_ssml(&self, text: &str) -> String {
        format!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xml:lang="{locale}"><voice name="{voice}">{text}</voice></speak>"#,
            locale = self.locale,
            voice = self.voice,
            text = xml_escape(text),
        )
    }
}

#[async_trait]
impl VoiceProvider for EdgeTts {
    fn name(&self) -> &'static str {
        "EdgeTTS"
    }

    fn file_prefix(&self) -> &'static str {
        "edge"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(voice = %self.voice, text_len = text.len(), "sending Edge TTS request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(
                "User-Agent",
                concat!("hanuman-gateway/", env!("CARGO_PKG_VERSION")),
            )
            .body(self.build_ssml(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("Edge TTS returned {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Voice and locale names: ASCII alphanumerics, hyphens, dots
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_VOICE_NAME_LEN {
        return Err(Error::Config(format!(
            "Edge voice name must be 1-{MAX_VOICE_NAME_LEN} characters"
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(Error::Config(format!(
            "Edge voice name contains invalid characters: {name}"
        )));
    }

    Ok(())
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
