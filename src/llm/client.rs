//! OpenRouter-style chat completion client
//!
//! One request per call, no retries. Response handling mirrors the API
//! contract: the success shape is decoded first, then the error envelope,
//! and only when both fail is a decoding error reported.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::config::ChatClientConfig;

/// Errors surfaced by the chat client.
///
/// Display strings end up in degraded intent results, so each source keeps
/// a distinct message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatApiError {
    /// Response decoded but carried no usable choice content
    #[error("Invalid response from server")]
    InvalidResponse,

    /// The API returned its error envelope
    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<i64>,
        provider: Option<String>,
    },

    /// Neither the success shape nor the error envelope decoded; wraps the
    /// original success-shape decode failure
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

/// A single message in the chat request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the chat completions endpoint.
///
/// `extra_headers` and `extra_body` ride inside the JSON body (not as HTTP
/// headers); OpenRouter reads its routing metadata from there.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    extra_headers: BTreeMap<&'static str, String>,
    extra_body: serde_json::Map<String, serde_json::Value>,
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<i64>,
    provider_name: Option<String>,
}

/// Seam between the intent pipeline and the network.
///
/// The credential travels per call because it is re-read from the env file
/// each time; the client itself stays reusable.
pub trait ChatApi {
    /// Send one prompt and return the assistant message content
    fn send_chat(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ChatApiError>> + Send;
}

/// Reqwest-backed client for the OpenRouter chat completions API
pub struct OpenRouterClient {
    config: ChatClientConfig,
    http: reqwest::Client,
}

impl OpenRouterClient {
    /// Build a client from the configuration.
    ///
    /// The underlying HTTP client is constructed once and reused across
    /// calls; the timeout bounds each request end to end.
    pub fn new(config: ChatClientConfig) -> Result<Self, ChatApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    fn extra_headers(&self) -> BTreeMap<&'static str, String> {
        let mut headers = BTreeMap::new();
        headers.insert(
            "HTTP-Referer",
            self.config.routing.referer.clone().unwrap_or_default(),
        );
        headers.insert(
            "X-Title",
            self.config.routing.title.clone().unwrap_or_default(),
        );
        headers
    }
}

impl ChatApi for OpenRouterClient {
    async fn send_chat(&self, api_key: &str, prompt: &str) -> Result<String, ChatApiError> {
        let request = ChatRequest {
            extra_headers: self.extra_headers(),
            extra_body: serde_json::Map::new(),
            model: &self.config.model,
            messages: vec![ChatMessage::user(prompt)],
        };

        debug!(
            "Sending chat completion request to {} (model: {})",
            self.config.base_url, self.config.model
        );

        let response = self
            .http
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatApiError::Timeout(self.config.timeout_secs)
                } else {
                    ChatApiError::Transport(e.to_string())
                }
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| ChatApiError::Transport(e.to_string()))?;

        parse_chat_response(&body)
    }
}

/// Decode a chat completions response body.
///
/// Order matters: the success shape is attempted first so that a payload
/// carrying both `choices` and `error` resolves to the content. Only when
/// the success decode fails is the error envelope tried, and only when that
/// also fails does the original decode failure surface.
pub fn parse_chat_response(body: &str) -> Result<String, ChatApiError> {
    match serde_json::from_str::<ChatCompletionResponse>(body) {
        Ok(response) => response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ChatApiError::InvalidResponse),
        Err(decode_err) => match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(envelope) => Err(ChatApiError::Api {
                message: envelope.error.message,
                code: envelope.error.code,
                provider: envelope.error.provider_name,
            }),
            Err(_) => Err(ChatApiError::Decode(decode_err.to_string())),
        },
    }
}

/// In-crate fake for tests: replies are queued and prompts recorded.
///
/// When the queue is empty the fallback reply (if any) is repeated, so a
/// single canned answer can serve a whole scenario.
#[derive(Default)]
pub struct FakeChatApi {
    replies: Mutex<VecDeque<Result<String, ChatApiError>>>,
    fallback: Option<Result<String, ChatApiError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake that answers every call with the same content
    pub fn always(content: impl Into<String>) -> Self {
        Self {
            fallback: Some(Ok(content.into())),
            ..Self::default()
        }
    }

    /// Fake that fails every call with the same error
    pub fn always_err(error: ChatApiError) -> Self {
        Self {
            fallback: Some(Err(error)),
            ..Self::default()
        }
    }

    /// Queue one successful reply
    pub fn queue_content(&self, content: impl Into<String>) {
        self.replies.lock().push_back(Ok(content.into()));
    }

    /// Queue one failed reply
    pub fn queue_error(&self, error: ChatApiError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl ChatApi for FakeChatApi {
    fn send_chat(
        &self,
        _api_key: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ChatApiError>> + Send {
        self.calls.lock().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or(Err(ChatApiError::Transport(
                "no reply queued in FakeChatApi".to_string(),
            )));
        async move { reply }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::config::RoutingMetadata;

    #[test]
    fn test_parse_success_shape() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"intent\":\"navigation\"}"}}]}"#;
        assert_eq!(
            parse_chat_response(body).unwrap(),
            r#"{"intent":"navigation"}"#
        );
    }

    #[test]
    fn test_parse_empty_choices() {
        let body = r#"{"choices":[]}"#;
        assert_eq!(
            parse_chat_response(body),
            Err(ChatApiError::InvalidResponse)
        );
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429,"provider_name":"Google"}}"#;
        assert_eq!(
            parse_chat_response(body),
            Err(ChatApiError::Api {
                message: "Rate limit exceeded".to_string(),
                code: Some(429),
                provider: Some("Google".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_error_envelope_minimal() {
        let body = r#"{"error":{"message":"No auth credentials found"}}"#;
        assert_eq!(
            parse_chat_response(body),
            Err(ChatApiError::Api {
                message: "No auth credentials found".to_string(),
                code: None,
                provider: None,
            })
        );
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        let result = parse_chat_response("not json at all");
        assert!(matches!(result, Err(ChatApiError::Decode(_))));
    }

    #[test]
    fn test_parse_unrecognized_object_is_decode_error() {
        let result = parse_chat_response(r#"{"foo": 1}"#);
        assert!(matches!(result, Err(ChatApiError::Decode(_))));
    }

    #[test]
    fn test_success_shape_takes_precedence_over_error() {
        let body = r#"{"choices":[{"message":{"content":"hello"}}],"error":{"message":"ignored"}}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "hello");
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            extra_headers: {
                let mut headers = BTreeMap::new();
                headers.insert("HTTP-Referer", String::new());
                headers.insert("X-Title", String::new());
                headers
            },
            extra_body: serde_json::Map::new(),
            model: "google/gemma-3-27b-it:free",
            messages: vec![ChatMessage::user("hello")],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "google/gemma-3-27b-it:free");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
        assert!(value["extra_headers"].get("HTTP-Referer").is_some());
        assert!(value["extra_headers"].get("X-Title").is_some());
        assert!(value["extra_body"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_client_includes_routing_metadata() {
        let config = ChatClientConfig::default().with_routing(
            RoutingMetadata::default()
                .with_referer("https://example.com")
                .with_title("Wayfinder"),
        );
        let client = OpenRouterClient::new(config).unwrap();
        let headers = client.extra_headers();
        assert_eq!(headers["HTTP-Referer"], "https://example.com");
        assert_eq!(headers["X-Title"], "Wayfinder");
    }

    #[test]
    fn test_client_defaults_routing_to_empty_strings() {
        let client = OpenRouterClient::new(ChatClientConfig::default()).unwrap();
        let headers = client.extra_headers();
        assert_eq!(headers["HTTP-Referer"], "");
        assert_eq!(headers["X-Title"], "");
    }

    #[tokio::test]
    async fn test_fake_queued_replies_in_order() {
        let fake = FakeChatApi::new();
        fake.queue_content("first");
        fake.queue_error(ChatApiError::InvalidResponse);

        assert_eq!(fake.send_chat("key", "a").await.unwrap(), "first");
        assert_eq!(
            fake.send_chat("key", "b").await,
            Err(ChatApiError::InvalidResponse)
        );
        assert_eq!(fake.prompts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_fake_fallback_repeats() {
        let fake = FakeChatApi::always(r#"{"intent":"unknown"}"#);
        assert_eq!(
            fake.send_chat("key", "x").await.unwrap(),
            r#"{"intent":"unknown"}"#
        );
        assert_eq!(
            fake.send_chat("key", "y").await.unwrap(),
            r#"{"intent":"unknown"}"#
        );
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fake_without_replies_fails() {
        let fake = FakeChatApi::new();
        assert!(matches!(
            fake.send_chat("key", "x").await,
            Err(ChatApiError::Transport(_))
        ));
    }

    #[test]
    fn test_timeout_error_display() {
        assert_eq!(
            ChatApiError::Timeout(30).to_string(),
            "Request timed out after 30s"
        );
    }
}
