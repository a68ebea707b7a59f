//! Language-model replies via Groq chat completions

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::{Error, Result};

/// Chat completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Answer `user` under `system`, limited to `max_tokens`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or an empty reply
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Groq chat completion client
pub struct GroqChat {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
}

impl std::fmt::Debug for GroqChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqChat")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GroqChat {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: SecretString, config: &LlmConfig) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Groq API key required for chat".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(config.timeout).build()?,
            api_key,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for GroqChat {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("chat completion error {status}: {body}")));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(Error::Llm("empty completion".to_string()));
        }

        tracing::debug!(model = %self.model, reply = %content, "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> GroqChat {
        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        GroqChat::new(SecretString::from("test-key"), &config).unwrap()
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "max_tokens": 100,
                "messages": [
                    { "role": "system", "content": "Be brief." },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Namaste.  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .complete("Be brief.", "hello", 100)
            .await
            .unwrap();
        assert_eq!(reply, "Namaste.");
    }

    #[tokio::test]
    async fn error_status_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u", 10).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn missing_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u", 10).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn rejects_empty_key() {
        let result = GroqChat::new(SecretString::from(""), &LlmConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
