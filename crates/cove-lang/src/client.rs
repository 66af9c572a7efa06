//! Chat-completions client used for translation and language detection.
//!
//! Every call is a single non-streaming request; there is no retry. Callers
//! decide how to degrade when a call fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cove_shared::constants::{DETECT_MAX_TOKENS, TRANSLATE_MAX_TOKENS};
use cove_shared::LanguageService;

use crate::config::LanguageConfig;
use crate::error::{LangError, Result};

const DETECT_INSTRUCTION: &str =
    "Detect the language of the following text and respond with the language code only.";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
    stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, instruction: String, text: &str, max_tokens: u32) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: instruction,
            },
            ChatMessage {
                role: "user".into(),
                content: text.to_string(),
            },
        ],
        temperature: 1.0,
        max_tokens,
        top_p: 1.0,
        stream: false,
        stop: None,
    }
}

/// First choice's content; blank content counts as no answer.
fn first_content(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(LangError::EmptyResponse)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LanguageClient {
    http: reqwest::Client,
    config: LanguageConfig,
}

impl LanguageClient {
    pub fn new(config: LanguageConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LanguageConfig::from_env())
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    async fn complete(&self, instruction: String, text: &str, max_tokens: u32) -> Result<String> {
        if !self.config.is_configured() {
            return Err(LangError::NotConfigured);
        }

        let body = build_request(&self.config.model, instruction, text, max_tokens);
        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "language service request failed");
            return Err(LangError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        first_content(parsed)
    }

    pub async fn translate_text(&self, text: &str, target: &str) -> Result<String> {
        debug!(target, chars = text.len(), "translating");
        self.complete(format!("translate to {target}"), text, TRANSLATE_MAX_TOKENS)
            .await
    }

    pub async fn detect_language(&self, text: &str) -> Result<String> {
        let code = self
            .complete(DETECT_INSTRUCTION.to_string(), text, DETECT_MAX_TOKENS)
            .await?;
        Ok(code.trim().to_string())
    }
}

#[async_trait]
impl LanguageService for LanguageClient {
    async fn translate(&self, text: &str, target: &str) -> cove_shared::Result<String> {
        Ok(self.translate_text(text, target).await?)
    }

    async fn detect(&self, text: &str) -> cove_shared::Result<String> {
        Ok(self.detect_language(text).await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn request_shape() {
        let req = build_request("llama3-8b-8192", "translate to fr".into(), "hello", 1024);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3-8b-8192",
                "messages": [
                    {"role": "system", "content": "translate to fr"},
                    {"role": "user", "content": "hello"},
                ],
                "temperature": 1.0,
                "max_tokens": 1024,
                "top_p": 1.0,
                "stream": false,
                "stop": null,
            })
        );
    }

    #[test]
    fn first_choice_content() {
        let resp: CompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "bonjour"}},
                {"message": {"role": "assistant", "content": "salut"}},
            ]
        }))
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), "bonjour");
    }

    #[test]
    fn empty_answers_are_errors() {
        let none: CompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(first_content(none), Err(LangError::EmptyResponse)));

        let blank: CompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": "  "}}]})).unwrap();
        assert!(matches!(first_content(blank), Err(LangError::EmptyResponse)));

        let null: CompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert!(matches!(first_content(null), Err(LangError::EmptyResponse)));
    }

    async fn client_for(server: &MockServer) -> LanguageClient {
        LanguageClient::new(LanguageConfig {
            api_key: "gsk_test".into(),
            base_url: format!("{}/openai/v1", server.uri()),
            ..LanguageConfig::default()
        })
        .unwrap()
    }

    fn answer(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    #[tokio::test]
    async fn translate_posts_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk_test"))
            .and(body_partial_json(json!({
                "model": "llama3-8b-8192",
                "max_tokens": 1024,
                "stream": false,
                "messages": [
                    {"role": "system", "content": "translate to fr"},
                    {"role": "user", "content": "hello"},
                ],
            })))
            .respond_with(answer("bonjour"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.translate("hello", "fr").await.unwrap(), "bonjour");
    }

    #[tokio::test]
    async fn detect_trims_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(body_partial_json(json!({"max_tokens": 5})))
            .respond_with(answer("  fr \n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.detect("bonjour").await.unwrap(), "fr");
    }

    #[tokio::test]
    async fn error_status_is_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.translate_text("hello", "fr").await.unwrap_err() {
            LangError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = client.detect("hello").await.unwrap_err();
        assert!(matches!(err, cove_shared::CoveError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_without_network() {
        let client = LanguageClient::new(LanguageConfig::default()).unwrap();
        let err = client.translate("hi", "fr").await.unwrap_err();
        assert!(matches!(err, cove_shared::CoveError::ServiceUnavailable(_)));
    }
}
