//! Spoken replies
//!
//! [`ReplySynthesizer`] walks an ordered chain of [`VoiceProvider`]s until one
//! produces audio, then stores it in the [`AudioCache`].

mod cache;
mod edge;
mod elevenlabs;

pub use cache::{AUDIO_ROUTE, AudioCache, AudioRef};
pub use edge::{EDGE_TTS_ENDPOINT, EdgeTts};
pub use elevenlabs::ElevenLabs;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::config::VoiceConfig;
use crate::events::RequestLog;
use crate::{Error, Result};

/// Text-to-speech backend
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Display name for logs
    fn name(&self) -> &'static str;

    /// Prefix for stored file names
    fn file_prefix(&self) -> &'static str;

    /// Synthesize `text` to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Ordered voice provider chain
pub struct ReplySynthesizer {
    providers: Vec<Box<dyn VoiceProvider>>,
    cache: AudioCache,
}

impl std::fmt::Debug for ReplySynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplySynthesizer")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("cache", &self.cache)
            .finish()
    }
}

impl ReplySynthesizer {
    /// Create a synthesizer over an explicit chain
    #[must_use]
    pub fn new(providers: Vec<Box<dyn VoiceProvider>>, cache: AudioCache) -> Self {
        Self { providers, cache }
    }

    /// Build the standard chain: `ElevenLabs` when a key is present, then Edge
    ///
    /// # Errors
    ///
    /// Returns error if a provider cannot be constructed
    pub fn from_config(
        elevenlabs_key: Option<&SecretString>,
        config: &VoiceConfig,
        cache: AudioCache,
    ) -> Result<Self> {
        let mut providers: Vec<Box<dyn VoiceProvider>> = Vec::with_capacity(2);

        if let Some(key) = elevenlabs_key {
            providers.push(Box::new(ElevenLabs::new(key.clone(), config)?));
        } else {
            tracing::info!("ELEVENLABS_API_KEY not set, using Edge TTS only");
        }
        providers.push(Box::new(EdgeTts::new(config)?));

        Ok(Self::new(providers, cache))
    }

    /// Provider names in the order they are tried
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Audio cache
    #[must_use]
    pub const fn cache(&self) -> &AudioCache {
        &self.cache
    }

    /// Speak `text`, returning the stored audio or `None` if every provider failed
    pub async fn synthesize(&self, text: &str, log: &mut RequestLog) -> Option<AudioRef> {
        for (index, provider) in self.providers.iter().enumerate() {
            match self.try_provider(provider.as_ref(), text).await {
                Ok(audio) => {
                    if index == 0 {
                        log.success(format!("Generated with {}", provider.name()));
                    } else {
                        log.info(format!("Generated with {} (fallback)", provider.name()));
                    }
                    return Some(audio);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "provider failed, trying next"
                    );
                    log.warn(format!("{} failed: {e}", provider.name()));
                }
            }
        }

        log.error("All voice providers failed");
        None
    }

    async fn try_provider(&self, provider: &dyn VoiceProvider, text: &str) -> Result<AudioRef> {
        let bytes = provider.synthesize(text).await?;
        if bytes.is_empty() {
            return Err(Error::Tts("empty audio".to_string()));
        }
        self.cache.store(provider.file_prefix(), &bytes).await
    }
}
