//! TOML configuration file loading
//!
//! Supports `~/.config/hanuman/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HanumanConfigFile {
    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Voice synthesis configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// HTTP port
    pub port: Option<u16>,

    /// Directory for synthesized audio
    pub cache_dir: Option<String>,

    /// Seconds an unused session is kept
    pub session_ttl_secs: Option<u64>,

    /// Maximum number of tracked sessions
    pub max_sessions: Option<usize>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Fast model (e.g. "whisper-large-v3-turbo")
    pub turbo_model: Option<String>,

    /// Accurate model (e.g. "whisper-large-v3")
    pub large_model: Option<String>,

    /// Language hint (e.g. "en")
    pub language: Option<String>,

    /// Vocabulary prompt biasing recognition
    pub prompt: Option<String>,

    /// Per-call timeout in seconds
    pub timeout_secs: Option<u64>,

    /// API base URL
    pub base_url: Option<String>,
}

/// Voice synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// ElevenLabs voice ID
    pub elevenlabs_voice_id: Option<String>,

    /// ElevenLabs model ID
    pub elevenlabs_model: Option<String>,

    /// Edge neural voice name (e.g. "en-IN-NeerjaNeural")
    pub edge_voice: Option<String>,

    /// Edge locale (e.g. "en-IN")
    pub edge_locale: Option<String>,

    /// SSML-over-HTTP synthesis endpoint for the fallback voice
    pub edge_endpoint: Option<String>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier
    pub model: Option<String>,

    /// Reply token budget
    pub max_tokens: Option<u32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub groq: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Parse a configuration file's contents
///
/// # Errors
///
/// Returns error if the TOML is malformed
pub fn parse_config(content: &str) -> Result<HanumanConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `HanumanConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HanumanConfigFile {
    config_file_path().map_or_else(HanumanConfigFile::default, |path| load_from(&path))
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> HanumanConfigFile {
    if !path.exists() {
        return HanumanConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HanumanConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HanumanConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/hanuman/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("hanuman").join("config.toml"))
}
