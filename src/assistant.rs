//! Request orchestration
//!
//! One uploaded clip runs three strictly ordered stages: transcribe, dispatch
//! through the session's mode, synthesize the reply.

use std::sync::Arc;

use serde::Serialize;

use crate::commands;
use crate::config::Config;
use crate::events::RequestLog;
use crate::llm::{GroqChat, LanguageModel};
use crate::session::{Mode, Session, SharedSession, Transition};
use crate::speech::{AudioCache, AudioRef, ReplySynthesizer};
use crate::transcribe::DualTranscriber;
use crate::Result;

/// Reply substituted for any language-model failure
pub const OFFLINE_REPLY: &str = "System offline.";

/// A spoken reply to one clip
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    /// What the user said
    pub text: String,
    /// What the assistant answers
    pub reply: String,
    /// Synthesized answer, if any provider succeeded
    pub audio: Option<AudioRef>,
    /// Session mode after dispatch
    pub mode: Mode,
}

/// Result of processing one clip
#[derive(Debug, Clone)]
pub enum Outcome {
    /// No speech, or nothing to say in the current mode
    Ignored {
        /// Transcript, when speech was heard
        text: Option<String>,
    },
    /// The assistant answered
    Replied(Reply),
}

/// Voice assistant pipeline
pub struct Assistant {
    transcriber: DualTranscriber,
    llm: Option<Arc<dyn LanguageModel>>,
    synthesizer: ReplySynthesizer,
    max_tokens: u32,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("transcriber", &self.transcriber)
            .field("llm", &self.llm.is_some())
            .field("synthesizer", &self.synthesizer)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Assistant {
    /// Assemble a pipeline from its parts
    #[must_use]
    pub fn new(
        transcriber: DualTranscriber,
        llm: Option<Arc<dyn LanguageModel>>,
        synthesizer: ReplySynthesizer,
        max_tokens: u32,
    ) -> Self {
        Self {
            transcriber,
            llm,
            synthesizer,
            max_tokens,
        }
    }

    /// Build the hosted-provider pipeline from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a client cannot be built or the audio cache cannot be
    /// created
    pub fn from_config(config: &Config) -> Result<Self> {
        let groq_key = config.api_keys.groq.as_ref();

        let transcriber = DualTranscriber::from_config(groq_key, &config.speech)?;
        let llm = groq_key
            .map(|key| GroqChat::new(key.clone(), &config.llm))
            .transpose()?
            .map(|chat| Arc::new(chat) as Arc<dyn LanguageModel>);
        let cache = AudioCache::new(&config.server.cache_dir)?;
        let synthesizer = ReplySynthesizer::from_config(
            config.api_keys.elevenlabs.as_ref(),
            &config.voice,
            cache,
        )?;

        tracing::info!(
            stt = transcriber.is_available(),
            llm = llm.is_some(),
            voices = ?synthesizer.provider_names(),
            "assistant ready"
        );

        Ok(Self::new(transcriber, llm, synthesizer, config.llm.max_tokens))
    }

    /// Transcription stage
    #[must_use]
    pub const fn transcriber(&self) -> &DualTranscriber {
        &self.transcriber
    }

    /// Synthesis stage
    #[must_use]
    pub const fn synthesizer(&self) -> &ReplySynthesizer {
        &self.synthesizer
    }

    /// Route a transcript through the session's mode
    ///
    /// Returns `None` when the assistant stays silent.
    pub async fn dispatch(
        &self,
        text: &str,
        session: &mut Session,
        log: &mut RequestLog,
    ) -> Option<String> {
        let matched = commands::identify(text);
        if let Some(tag) = matched.tag {
            log.debug(format!(
                "Command: {} ({:.2})",
                tag.as_str().to_uppercase(),
                matched.confidence
            ));
        }

        match session.transition(matched.tag) {
            Transition::Reply(reply) => Some(reply),
            Transition::Ignore => None,
            Transition::Delegate { system_prompt } => {
                Some(self.ask(&system_prompt, text, log).await)
            }
        }
    }

    async fn ask(&self, system_prompt: &str, text: &str, log: &mut RequestLog) -> String {
        let Some(llm) = &self.llm else {
            log.warn("Language model unavailable");
            return OFFLINE_REPLY.to_string();
        };

        match llm.complete(system_prompt, text, self.max_tokens).await {
            Ok(reply) => reply,
            Err(e) => {
                log.error(format!("LLM Error: {e}"));
                OFFLINE_REPLY.to_string()
            }
        }
    }

    /// Run the full pipeline for one uploaded clip
    ///
    /// The session lock is held only while dispatching, so requests on one
    /// session apply their transitions one at a time.
    pub async fn process(
        &self,
        audio: Vec<u8>,
        session: &SharedSession,
        log: &mut RequestLog,
    ) -> Outcome {
        log.info("Processing audio...");
        let transcription = self.transcriber.transcribe_smart(audio, log).await;

        if transcription.is_empty() {
            log.warn("No clear speech detected.");
            return Outcome::Ignored { text: None };
        }

        let text = transcription.text;
        log.success(format!("FINAL INPUT: {text}"));

        let (reply, mode) = {
            let mut session = session.lock().await;
            let reply = self.dispatch(&text, &mut session, log).await;
            (reply, session.mode())
        };

        let Some(reply) = reply else {
            log.debug(format!("Ignored in {mode} mode"));
            return Outcome::Ignored { text: Some(text) };
        };

        log.info(format!("AI: {reply}"));
        let audio = self.synthesizer.synthesize(&reply, log).await;

        Outcome::Replied(Reply {
            text,
            reply,
            audio,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::events::LogBus;
    use crate::session::{BASE_PROMPT, EXIT_REPLY, WAKE_REPLY};
    use crate::Error;

    /// Records prompts; answers with `reply` or fails when `None`
    struct RecordingLlm {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl RecordingLlm {
        fn new(reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for RecordingLlm {
        async fn complete(&self, system: &str, user: &str, _max_tokens: u32) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply
                .map(ToString::to_string)
                .ok_or_else(|| Error::Llm("timeout".to_string()))
        }
    }

    fn assistant(llm: Option<Arc<RecordingLlm>>, dir: &std::path::Path) -> Assistant {
        let cache = AudioCache::new(dir).unwrap();
        Assistant::new(
            DualTranscriber::new(None, "turbo", "large"),
            llm.map(|l| l as Arc<dyn LanguageModel>),
            ReplySynthesizer::new(Vec::new(), cache),
            100,
        )
    }

    #[tokio::test]
    async fn wake_from_idle_greets() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant(None, dir.path());
        let mut session = Session::new("s");
        let mut log = LogBus::new().request();

        let reply = assistant.dispatch("hey hanuman", &mut session, &mut log).await;

        assert_eq!(reply.as_deref(), Some(WAKE_REPLY));
        assert_eq!(session.mode(), Mode::Active);
    }

    #[tokio::test]
    async fn idle_ignores_chatter_without_llm_call() {
        let dir = tempfile::tempdir().unwrap();
        let llm = RecordingLlm::new(Some("unused"));
        let assistant = assistant(Some(Arc::clone(&llm)), dir.path());
        let mut session = Session::new("s");
        let mut log = LogBus::new().request();

        let reply = assistant
            .dispatch("what is the time", &mut session, &mut log)
            .await;

        assert_eq!(reply, None);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hasya_delegates_with_joke_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let llm = RecordingLlm::new(Some("Why did the monkey cross the ocean?"));
        let assistant = assistant(Some(Arc::clone(&llm)), dir.path());
        let mut session = Session::new("s");
        let mut log = LogBus::new().request();

        assistant.dispatch("hanuman", &mut session, &mut log).await;
        assert_eq!(
            assistant.dispatch("hasya", &mut session, &mut log).await.as_deref(),
            Some("Hasya mode.")
        );

        let reply = assistant
            .dispatch("tell me a joke", &mut session, &mut log)
            .await;

        assert_eq!(reply.as_deref(), Some("Why did the monkey cross the ocean?"));
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, format!("{BASE_PROMPT} Tell a joke."));
        assert_eq!(prompts[0].1, "tell me a joke");
    }

    #[tokio::test]
    async fn llm_failure_says_offline() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant(Some(RecordingLlm::new(None)), dir.path());
        let mut session = Session::new("s");
        let mut log = LogBus::new().request();

        assistant.dispatch("hanuman", &mut session, &mut log).await;
        let reply = assistant
            .dispatch("what is dharma", &mut session, &mut log)
            .await;

        assert_eq!(reply.as_deref(), Some(OFFLINE_REPLY));
        assert!(log.entries().iter().any(|e| e.msg.starts_with("LLM Error")));
    }

    #[tokio::test]
    async fn missing_llm_says_offline() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant(None, dir.path());
        let mut session = Session::new("s");
        let mut log = LogBus::new().request();

        assistant.dispatch("hanuman", &mut session, &mut log).await;
        let reply = assistant
            .dispatch("what is dharma", &mut session, &mut log)
            .await;

        assert_eq!(reply.as_deref(), Some(OFFLINE_REPLY));
    }

    #[tokio::test]
    async fn exit_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant(None, dir.path());
        let mut session = Session::new("s");
        let mut log = LogBus::new().request();

        assistant.dispatch("hanuman", &mut session, &mut log).await;
        let reply = assistant.dispatch("stop", &mut session, &mut log).await;

        assert_eq!(reply.as_deref(), Some(EXIT_REPLY));
        assert_eq!(session.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn process_without_stt_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant(None, dir.path());
        let session = Arc::new(tokio::sync::Mutex::new(Session::new("s")));
        let mut log = LogBus::new().request();

        let outcome = assistant.process(vec![0; 16], &session, &mut log).await;

        assert!(matches!(outcome, Outcome::Ignored { text: None }));
        assert!(
            log.entries()
                .iter()
                .any(|e| e.msg == "No clear speech detected.")
        );
    }
}
