//! Hanuman Gateway - voice command front end for a mode-driven assistant
//!
//! A browser records a clip, the gateway transcribes it, recognizes a command,
//! answers through the session's current mode, and speaks the reply.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 HTTP  (api)                           │
//! │   /upload  │  /ws/logs  │  /audio/*  │  /health      │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │               Assistant pipeline                      │
//! │  transcribe (turbo ∥ large) → commands → session     │
//! │                 → llm → speech (ElevenLabs → Edge)    │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod session;
pub mod speech;
pub mod transcribe;

pub use assistant::{Assistant, OFFLINE_REPLY, Outcome, Reply};
pub use commands::{CommandMatch, CommandTag, identify};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{LogBus, LogEntry, LogLevel, RequestLog};
pub use session::{Mode, Session, SessionStore, Transition};
pub use speech::{AudioCache, AudioRef, ReplySynthesizer, VoiceProvider};
pub use transcribe::{DualTranscriber, SpeechToText, SttModel, Transcription};
