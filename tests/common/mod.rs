//! Shared test utilities
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use hanuman_gateway::llm::LanguageModel;
use hanuman_gateway::{
    Assistant, AudioCache, DualTranscriber, Error, ReplySynthesizer, Result, SpeechToText,
    VoiceProvider,
};

/// Transcribes the uploaded bytes as UTF-8, so a test uploads the words it wants heard
pub struct EchoStt;

#[async_trait]
impl SpeechToText for EchoStt {
    async fn transcribe(&self, audio: &[u8], _model: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(audio).into_owned())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Language model that records prompts and answers with a fixed reply
pub struct RecordingLlm {
    reply: Option<&'static str>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl RecordingLlm {
    /// `None` makes every completion fail
    #[must_use]
    pub fn new(reply: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// System prompts seen so far
    pub fn system_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|(system, _)| system.clone())
            .collect()
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
            .ok_or_else(|| Error::Llm("request timed out".to_string()))
    }
}

/// Voice that always produces a tiny MP3 stub
pub struct StubVoice;

#[async_trait]
impl VoiceProvider for StubVoice {
    fn name(&self) -> &'static str {
        "Stub"
    }

    fn file_prefix(&self) -> &'static str {
        "edge"
    }

    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Ok(b"ID3".to_vec())
    }
}

/// Assistant wired to in-process fakes
pub fn fake_assistant(llm: &Arc<RecordingLlm>, cache_dir: &Path) -> Assistant {
    let stt: Arc<dyn SpeechToText> = Arc::new(EchoStt);
    let llm: Arc<dyn LanguageModel> = llm.clone();
    let cache = AudioCache::new(cache_dir).expect("failed to create audio cache");

    Assistant::new(
        DualTranscriber::new(Some(stt), "whisper-large-v3-turbo", "whisper-large-v3"),
        Some(llm),
        ReplySynthesizer::new(vec![Box::new(StubVoice)], cache),
        100,
    )
}

/// Multipart form with a single file field
pub fn multipart_body(field: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "hanuman-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"audio.wav\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// `POST /upload` carrying `audio` in the `audio` field
pub fn upload_request(session: Option<&str>, audio: &[u8]) -> Request<Body> {
    let (content_type, body) = multipart_body("audio", audio);

    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", content_type);
    if let Some(id) = session {
        builder = builder.header("x-session-id", id);
    }

    builder.body(Body::from(body)).unwrap()
}

/// Read a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
