//! Audio upload endpoint

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::ApiState;
use crate::assistant::Outcome;
use crate::events::LogEntry;
use crate::session::{DEFAULT_SESSION_ID, Mode};
use crate::{Error, Result};

/// Header carrying the client's session identity
pub const SESSION_HEADER: &str = "x-session-id";

/// Multipart field holding the recording
pub const AUDIO_FIELD: &str = "audio";

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const MAX_SESSION_ID_LEN: usize = 128;

/// Build upload router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Upload response body
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    /// The assistant answered
    Ok {
        text: String,
        reply: String,
        audio: Option<String>,
        mode: Mode,
        logs: Vec<LogEntry>,
    },
    /// No speech, or nothing to say
    Ignored {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        logs: Vec<LogEntry>,
    },
}

/// Upload errors
#[derive(Debug)]
pub enum UploadError {
    /// Request had no `audio` field
    NoAudio,
    /// Unexpected failure while handling the request
    Failed { error: String, logs: Vec<LogEntry> },
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            Self::NoAudio => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "No audio", "logs": [] })),
            )
                .into_response(),
            Self::Failed { error, logs } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "error": error,
                    "logs": logs,
                })),
            )
                .into_response(),
        }
    }
}

/// Receive a recording and run it through the assistant
async fn upload(
    State(state): State<ApiState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<UploadResponse>, UploadError> {
    let Ok(multipart) = multipart else {
        return Err(UploadError::NoAudio);
    };

    let mut log = state.log_bus.request();

    let audio = match read_audio(multipart).await {
        Ok(Some(audio)) => audio,
        Ok(None) => return Err(UploadError::NoAudio),
        Err(e) => {
            log.error(format!("Critical Error: {e}"));
            return Err(UploadError::Failed {
                error: e.to_string(),
                logs: log.into_entries(),
            });
        }
    };

    let session_id = session_id(&headers);
    let span = tracing::info_span!("upload", request_id = %Uuid::new_v4(), session = %session_id);
    tracing::debug!(parent: &span, bytes = audio.len(), "upload received");

    let session = state.sessions.get_or_create(&session_id).await;
    let outcome = state
        .assistant
        .process(audio, &session, &mut log)
        .instrument(span)
        .await;
    let logs = log.into_entries();

    Ok(Json(match outcome {
        Outcome::Ignored { text } => UploadResponse::Ignored { text, logs },
        Outcome::Replied(reply) => UploadResponse::Ok {
            text: reply.text,
            reply: reply.reply,
            audio: reply.audio.map(|a| a.url),
            mode: reply.mode,
            logs,
        },
    }))
}

/// Pull the `audio` field out of the form
async fn read_audio(mut multipart: Multipart) -> Result<Option<Vec<u8>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Audio(e.body_text()))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Error::Audio(e.body_text()))?;
            return Ok(Some(bytes.to_vec()));
        }
    }

    Ok(None)
}

/// Session ID from the request header, or the shared default
fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| is_valid_session_id(id))
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
