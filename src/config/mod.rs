//! Configuration management for the Hanuman gateway
//!
//! Precedence: environment > TOML file > default. A `.env` file in the
//! working directory is loaded into the environment first.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::Result;
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use file::HanumanConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default Groq API base (OpenAI-compatible)
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default ElevenLabs voice (Rachel)
pub const DEFAULT_ELEVENLABS_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default Edge neural voice
pub const DEFAULT_EDGE_VOICE: &str = "en-IN-NeerjaNeural";

/// Vocabulary hint sent with every transcription
pub const DEFAULT_STT_PROMPT: &str =
    "Hanuman, Aagya, Hasya, Yudha, Gandharva, Khoj, Hindi, Jai Shri Ram";

/// Gateway configuration
#[derive(Debug, Default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Speech-to-text configuration
    pub speech: SpeechConfig,

    /// Voice synthesis configuration
    pub voice: VoiceConfig,

    /// Language model configuration
    pub llm: LlmConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Directory for synthesized audio artifacts
    pub cache_dir: PathBuf,

    /// Unused sessions are forgotten after this long
    pub session_ttl: Duration,

    /// Maximum number of tracked sessions
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cache_dir: default_cache_dir(),
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Groq key (speech-to-text and language model)
    pub groq: Option<SecretString>,

    /// `ElevenLabs` key (primary voice); absent means Edge only
    pub elevenlabs: Option<SecretString>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Fast model raced first
    pub turbo_model: String,

    /// Accurate model used when the fast one hears no command
    pub large_model: String,

    /// Language hint
    pub language: String,

    /// Vocabulary prompt
    pub prompt: String,

    /// Per-call timeout
    pub timeout: Duration,

    /// API base URL
    pub base_url: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            turbo_model: "whisper-large-v3-turbo".to_string(),
            large_model: "whisper-large-v3".to_string(),
            language: "en".to_string(),
            prompt: DEFAULT_STT_PROMPT.to_string(),
            timeout: Duration::from_secs(8),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
        }
    }
}

/// Voice synthesis configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// `ElevenLabs` voice ID
    pub elevenlabs_voice_id: String,

    /// `ElevenLabs` model ID
    pub elevenlabs_model: String,

    /// `ElevenLabs` API base URL
    pub elevenlabs_base_url: String,

    /// `ElevenLabs` timeout
    pub elevenlabs_timeout: Duration,

    /// Edge neural voice name
    pub edge_voice: String,

    /// Edge locale
    pub edge_locale: String,

    /// Edge synthesis endpoint
    pub edge_endpoint: String,

    /// Edge timeout
    pub edge_timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            elevenlabs_voice_id: DEFAULT_ELEVENLABS_VOICE_ID.to_string(),
            elevenlabs_model: "eleven_turbo_v2_5".to_string(),
            elevenlabs_base_url: "https://api.elevenlabs.io".to_string(),
            elevenlabs_timeout: Duration::from_secs(5),
            edge_voice: DEFAULT_EDGE_VOICE.to_string(),
            edge_locale: "en-IN".to_string(),
            edge_endpoint: crate::speech::EDGE_TTS_ENDPOINT.to_string(),
            edge_timeout: Duration::from_secs(10),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Reply token budget
    pub max_tokens: u32,

    /// Request timeout
    pub timeout: Duration,

    /// API base URL
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 100,
            timeout: Duration::from_secs(5),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
        }
    }
}

/// Default audio cache: `~/.cache/hanuman/audio` on Linux
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache/hanuman/audio"),
        |d| d.cache_dir().join("hanuman").join("audio"),
    )
}

impl Config {
    /// Load configuration from `.env`, the process environment, and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the audio cache directory cannot be created
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let fc = file::load_config_file();
        let config = Self::from_sources(fc, |key| std::env::var(key).ok());
        std::fs::create_dir_all(&config.server.cache_dir)?;

        Ok(config)
    }

    /// Build configuration from a parsed file and an environment lookup
    #[must_use]
    pub fn from_sources<F>(fc: HanumanConfigFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            groq: non_empty("GROQ_API_KEY")
                .or(fc.api_keys.groq)
                .map(SecretString::from),
            elevenlabs: non_empty("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            port: non_empty("HANUMAN_PORT")
                .or_else(|| non_empty("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(server_defaults.port),
            cache_dir: non_empty("HANUMAN_CACHE_DIR")
                .or(fc.server.cache_dir)
                .map_or(server_defaults.cache_dir, PathBuf::from),
            session_ttl: fc
                .server
                .session_ttl_secs
                .map_or(server_defaults.session_ttl, Duration::from_secs),
            max_sessions: fc.server.max_sessions.unwrap_or(server_defaults.max_sessions),
        };

        let speech_defaults = SpeechConfig::default();
        let groq_base_url = non_empty("GROQ_BASE_URL");
        let speech = SpeechConfig {
            turbo_model: non_empty("HANUMAN_STT_TURBO_MODEL")
                .or(fc.speech.turbo_model)
                .unwrap_or(speech_defaults.turbo_model),
            large_model: non_empty("HANUMAN_STT_LARGE_MODEL")
                .or(fc.speech.large_model)
                .unwrap_or(speech_defaults.large_model),
            language: fc.speech.language.unwrap_or(speech_defaults.language),
            prompt: fc.speech.prompt.unwrap_or(speech_defaults.prompt),
            timeout: fc
                .speech
                .timeout_secs
                .map_or(speech_defaults.timeout, Duration::from_secs),
            base_url: groq_base_url
                .clone()
                .or(fc.speech.base_url)
                .unwrap_or(speech_defaults.base_url),
        };

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            elevenlabs_voice_id: non_empty("ELEVENLABS_VOICE_ID")
                .or(fc.voice.elevenlabs_voice_id)
                .unwrap_or(voice_defaults.elevenlabs_voice_id),
            elevenlabs_model: fc
                .voice
                .elevenlabs_model
                .unwrap_or(voice_defaults.elevenlabs_model),
            edge_voice: non_empty("HANUMAN_EDGE_VOICE")
                .or(fc.voice.edge_voice)
                .unwrap_or(voice_defaults.edge_voice),
            edge_locale: fc.voice.edge_locale.unwrap_or(voice_defaults.edge_locale),
            edge_endpoint: non_empty("HANUMAN_EDGE_ENDPOINT")
                .or(fc.voice.edge_endpoint)
                .unwrap_or(voice_defaults.edge_endpoint),
            ..voice_defaults
        };

        let llm_defaults = LlmConfig::default();
        let llm = LlmConfig {
            model: non_empty("HANUMAN_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(llm_defaults.model),
            max_tokens: fc.llm.max_tokens.unwrap_or(llm_defaults.max_tokens),
            base_url: groq_base_url.unwrap_or(llm_defaults.base_url),
            ..llm_defaults
        };

        Self {
            server,
            api_keys,
            speech,
            voice,
            llm,
        }
    }
}
