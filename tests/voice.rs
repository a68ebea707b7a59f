//! Voice pipeline integration tests
//!
//! Drives the hosted-provider clients against local mock servers

use std::collections::HashMap;
use std::sync::Arc;

use hanuman_gateway::config::file::HanumanConfigFile;
use hanuman_gateway::session::WAKE_REPLY;
use hanuman_gateway::{
    Assistant, CommandTag, Config, LogBus, Mode, OFFLINE_REPLY, Outcome, Session, SttModel,
};
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

const ELEVEN_PATH: &str = "/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM";

/// Config pointing every provider at `server`
fn config_for(server: &MockServer, cache_dir: &std::path::Path, elevenlabs: bool) -> Config {
    let mut env = HashMap::new();
    env.insert("GROQ_API_KEY", "gsk-test".to_string());
    env.insert("GROQ_BASE_URL", server.uri());
    env.insert(
        "HANUMAN_CACHE_DIR",
        cache_dir.to_string_lossy().into_owned(),
    );
    if elevenlabs {
        env.insert("ELEVENLABS_API_KEY", "xi-test".to_string());
    }

    let mut config =
        Config::from_sources(HanumanConfigFile::default(), |key| env.get(key).cloned());
    config.voice.elevenlabs_base_url = server.uri();
    config.voice.edge_endpoint = format!("{}/edge", server.uri());
    config
}

async fn mock_transcript(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": text })))
        .mount(server)
        .await;
}

async fn mock_edge_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/edge"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3edge".to_vec()))
        .mount(server)
        .await;
}

fn active_session() -> Arc<Mutex<Session>> {
    let mut session = Session::new("voice-test");
    session.transition(Some(CommandTag::Wake));
    Arc::new(Mutex::new(session))
}

#[tokio::test]
async fn test_wake_with_elevenlabs_failing_falls_back_to_edge() {
    let server = MockServer::start().await;
    let cache = tempfile::tempdir().unwrap();

    mock_transcript(&server, "Hey Hanuman").await;
    Mock::given(method("POST"))
        .and(path(ELEVEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("quota_exceeded"))
        .expect(1)
        .mount(&server)
        .await;
    mock_edge_ok(&server).await;

    let assistant = Assistant::from_config(&config_for(&server, cache.path(), true)).unwrap();
    let session = Arc::new(Mutex::new(Session::new("voice-test")));
    let mut log = LogBus::new().request();

    let outcome = assistant
        .process(b"RIFF-fake-wav".to_vec(), &session, &mut log)
        .await;

    let Outcome::Replied(reply) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(reply.text, "Hey Hanuman");
    assert_eq!(reply.reply, WAKE_REPLY);
    assert_eq!(reply.mode, Mode::Active);

    let audio = reply.audio.unwrap();
    assert!(audio.file_name.starts_with("edge_"));
    assert_eq!(std::fs::read(&audio.path).unwrap(), b"ID3edge");
}

#[tokio::test]
async fn test_chat_reply_spoken_by_elevenlabs() {
    let server = MockServer::start().await;
    let cache = tempfile::tempdir().unwrap();

    mock_transcript(&server, "What is dharma").await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Dharma is righteous duty." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ELEVEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3eleven".to_vec()))
        .mount(&server)
        .await;

    let assistant = Assistant::from_config(&config_for(&server, cache.path(), true)).unwrap();
    let session = active_session();
    let mut log = LogBus::new().request();

    let outcome = assistant.process(b"clip".to_vec(), &session, &mut log).await;

    let Outcome::Replied(reply) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(reply.reply, "Dharma is righteous duty.");
    assert!(reply.audio.unwrap().file_name.starts_with("eleven_"));
}

#[tokio::test]
async fn test_chat_failure_says_offline_via_edge_only() {
    let server = MockServer::start().await;
    let cache = tempfile::tempdir().unwrap();

    mock_transcript(&server, "What is dharma").await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex("^/v1/text-to-speech/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"never".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    mock_edge_ok(&server).await;

    let assistant = Assistant::from_config(&config_for(&server, cache.path(), false)).unwrap();
    let session = active_session();
    let mut log = LogBus::new().request();

    let outcome = assistant.process(b"clip".to_vec(), &session, &mut log).await;

    let Outcome::Replied(reply) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(reply.reply, OFFLINE_REPLY);
    assert!(reply.audio.unwrap().file_name.starts_with("edge_"));
}

#[tokio::test]
async fn test_hallucinated_silence_is_ignored() {
    let server = MockServer::start().await;
    let cache = tempfile::tempdir().unwrap();

    mock_transcript(&server, " Thank you ").await;

    let assistant = Assistant::from_config(&config_for(&server, cache.path(), false)).unwrap();
    let session = active_session();
    let mut log = LogBus::new().request();

    let outcome = assistant.process(b"hiss".to_vec(), &session, &mut log).await;

    assert!(matches!(outcome, Outcome::Ignored { text: None }));
    assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_stt_outage_is_ignored() {
    let server = MockServer::start().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let assistant = Assistant::from_config(&config_for(&server, cache.path(), false)).unwrap();
    let mut log = LogBus::new().request();

    let transcription = assistant
        .transcriber()
        .transcribe_smart(b"clip".to_vec(), &mut log)
        .await;

    assert!(transcription.is_empty());
    assert_eq!(transcription.source, SttModel::Large);
    let errors = log
        .entries()
        .iter()
        .filter(|e| e.msg.starts_with("STT Error"))
        .count();
    assert_eq!(errors, 2);
}
