//! Intent classification over the chat completion API
//!
//! [`IntentRouter::classify`] is infallible by contract: credential
//! problems, network failures, and malformed model answers all collapse
//! into a degraded `unknown` result whose `parameters` carry the reason
//! under the `"error"` key.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{load_api_key, ChatApi, ChatApiError, ChatClientConfig, OpenRouterClient};

use super::prompts::build_classifier_prompt;

/// Degraded-result reason for unparseable model answers
const INVALID_JSON: &str = "Invalid JSON";

/// Recognized intents.
///
/// The model may answer with labels outside this set (the prompt's few-shot
/// examples include one); those fold to [`Intent::Unknown`] while the
/// original label stays visible in [`IntentResult::origin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Navigation,
    Unknown,
}

impl Intent {
    /// Fold a model-provided label into the recognized set
    pub fn from_label(label: &str) -> Self {
        match label {
            "navigation" => Intent::Navigation,
            _ => Intent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Navigation => "navigation",
            Intent::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one classification call.
///
/// Successful results carry `confidence` 1.0, the extracted parameters in
/// the model's key order, and the full parsed answer in `origin`. Degraded
/// results carry `confidence` 0.0, exactly one `"error"` parameter, and an
/// empty `origin`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f64,
    pub parameters: Map<String, Value>,
    pub origin: Map<String, Value>,
}

impl IntentResult {
    /// Build the degraded result for a failed classification
    pub fn degraded(reason: impl Into<String>) -> Self {
        let mut parameters = Map::new();
        parameters.insert("error".to_string(), Value::String(reason.into()));
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            parameters,
            origin: Map::new(),
        }
    }

    /// Look up a single extracted parameter
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// The degradation reason, when this is a degraded result
    pub fn error(&self) -> Option<&str> {
        self.parameters.get("error").and_then(Value::as_str)
    }

    pub fn is_degraded(&self) -> bool {
        self.confidence == 0.0 && self.parameters.contains_key("error")
    }
}

/// Parse a model answer into an [`IntentResult`].
///
/// The answer must be a JSON object with a string `"intent"` key; anything
/// else degrades. Parameters are the object minus `"intent"`, in document
/// order; `origin` keeps the whole object.
pub fn parse_intent_response(answer: &str) -> IntentResult {
    let value: Value = match serde_json::from_str(answer) {
        Ok(value) => value,
        Err(e) => {
            debug!("Model answer is not JSON: {}", e);
            return IntentResult::degraded(INVALID_JSON);
        }
    };

    let Value::Object(origin) = value else {
        debug!("Model answer is JSON but not an object");
        return IntentResult::degraded(INVALID_JSON);
    };

    let intent = match origin.get("intent").and_then(Value::as_str) {
        Some(label) => Intent::from_label(label),
        None => {
            debug!("Model answer has no string \"intent\" key");
            return IntentResult::degraded(INVALID_JSON);
        }
    };

    let mut parameters = origin.clone();
    parameters.remove("intent");

    IntentResult {
        intent,
        confidence: 1.0,
        parameters,
        origin,
    }
}

/// Classifies transcripts through a [`ChatApi`] implementation.
///
/// The API credential is re-read from the env file on every call so edits
/// take effect without a restart.
pub struct IntentRouter<C> {
    api: C,
    env_path: PathBuf,
}

impl IntentRouter<OpenRouterClient> {
    /// Router backed by the real OpenRouter client
    pub fn new(
        config: ChatClientConfig,
        env_path: impl Into<PathBuf>,
    ) -> Result<Self, ChatApiError> {
        Ok(Self {
            api: OpenRouterClient::new(config)?,
            env_path: env_path.into(),
        })
    }
}

impl<C: ChatApi> IntentRouter<C> {
    /// Router backed by an arbitrary [`ChatApi`] (tests use the fake)
    pub fn with_api(api: C, env_path: impl Into<PathBuf>) -> Self {
        Self {
            api,
            env_path: env_path.into(),
        }
    }

    pub fn env_path(&self) -> &std::path::Path {
        &self.env_path
    }

    /// Classify one transcript. Never fails; see the module docs.
    pub async fn classify(&self, transcript: &str) -> IntentResult {
        let api_key = match load_api_key(&self.env_path) {
            Ok(key) => key,
            Err(e) => {
                warn!("Credential loading failed: {}", e);
                return IntentResult::degraded(e.to_string());
            }
        };

        let prompt = build_classifier_prompt(transcript);
        debug!("Classifying transcript ({} chars)", transcript.len());

        match self.api.send_chat(&api_key, &prompt).await {
            Ok(answer) => {
                debug!("Model answer: {}", answer);
                parse_intent_response(&answer)
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                IntentResult::degraded(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeChatApi;
    use std::fs;
    use std::path::PathBuf;

    struct TempEnv {
        path: PathBuf,
    }

    impl TempEnv {
        fn with_key() -> Self {
            let path = std::env::temp_dir().join(format!("wayfinder-env-{}", uuid::Uuid::new_v4()));
            fs::write(&path, "OPENROUTER_API_KEY=sk-or-test\n").unwrap();
            Self { path }
        }

        fn missing() -> Self {
            let path =
                std::env::temp_dir().join(format!("wayfinder-missing-{}", uuid::Uuid::new_v4()));
            Self { path }
        }
    }

    impl Drop for TempEnv {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    #[test]
    fn test_parse_navigation_answer() {
        let result =
            parse_intent_response(r#"{"intent": "navigation", "destination": "Starbucks"}"#);
        assert_eq!(result.intent, Intent::Navigation);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(
            result.parameter("destination"),
            Some(&Value::String("Starbucks".to_string()))
        );
        assert!(result.parameters.get("intent").is_none());
        assert_eq!(result.origin["intent"], "navigation");
    }

    #[test]
    fn test_parse_preserves_parameter_order() {
        let result = parse_intent_response(
            r#"{"intent": "navigation", "destination": "Library", "floor": "2", "building": "East"}"#,
        );
        let keys: Vec<&str> = result.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["destination", "floor", "building"]);
    }

    #[test]
    fn test_parse_unrecognized_label_folds_to_unknown() {
        let result = parse_intent_response(
            r#"{"intent": "find_place", "place_type": "restaurant", "modifiers": ["cheap", "Italian"]}"#,
        );
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.origin["intent"], "find_place");
        assert_eq!(result.parameters["place_type"], "restaurant");
        assert_eq!(result.parameters["modifiers"][1], "Italian");
    }

    #[test]
    fn test_parse_plain_unknown_answer() {
        let result = parse_intent_response(r#"{"intent": "unknown"}"#);
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 1.0);
        assert!(result.parameters.is_empty());
        assert_eq!(result.origin.len(), 1);
    }

    #[test]
    fn test_parse_non_json_degrades() {
        let result = parse_intent_response("I think you want directions to Starbucks!");
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.error(), Some("Invalid JSON"));
        assert!(result.origin.is_empty());
    }

    #[test]
    fn test_parse_non_object_degrades() {
        assert_eq!(
            parse_intent_response(r#"["navigation"]"#).error(),
            Some("Invalid JSON")
        );
        assert_eq!(
            parse_intent_response(r#""navigation""#).error(),
            Some("Invalid JSON")
        );
    }

    #[test]
    fn test_parse_missing_intent_key_degrades() {
        let result = parse_intent_response(r#"{"destination": "Starbucks"}"#);
        assert_eq!(result.error(), Some("Invalid JSON"));
    }

    #[test]
    fn test_parse_non_string_intent_degrades() {
        let result = parse_intent_response(r#"{"intent": 42}"#);
        assert_eq!(result.error(), Some("Invalid JSON"));
    }

    #[test]
    fn test_degraded_shape() {
        let result = IntentResult::degraded("Env file missing");
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.parameters.len(), 1);
        assert_eq!(result.error(), Some("Env file missing"));
        assert!(result.origin.is_empty());
        assert!(result.is_degraded());
    }

    #[test]
    fn test_intent_label_round_trip() {
        assert_eq!(Intent::from_label("navigation"), Intent::Navigation);
        assert_eq!(Intent::from_label("unknown"), Intent::Unknown);
        assert_eq!(Intent::from_label("find_place"), Intent::Unknown);
        assert_eq!(Intent::Navigation.to_string(), "navigation");
        assert_eq!(
            serde_json::to_string(&Intent::Navigation).unwrap(),
            "\"navigation\""
        );
    }

    #[tokio::test]
    async fn test_classify_success_path() {
        let env = TempEnv::with_key();
        let fake = FakeChatApi::always(r#"{"intent": "navigation", "destination": "Cafe"}"#);
        let router = IntentRouter::with_api(fake, &env.path);

        let result = router.classify("navigate to the cafe").await;
        assert_eq!(result.intent, Intent::Navigation);
        assert_eq!(result.parameters["destination"], "Cafe");
    }

    #[tokio::test]
    async fn test_classify_sends_prompt_with_transcript() {
        let env = TempEnv::with_key();
        let fake = FakeChatApi::always(r#"{"intent": "unknown"}"#);
        let router = IntentRouter::with_api(fake, &env.path);

        router.classify("where is the exit").await;

        let prompts = router.api.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("You are an intent classifier."));
        assert!(prompts[0].ends_with("Here is the user input: where is the exit"));
    }

    #[tokio::test]
    async fn test_classify_missing_env_degrades_without_network() {
        let env = TempEnv::missing();
        let fake = FakeChatApi::always(r#"{"intent": "navigation"}"#);
        let router = IntentRouter::with_api(fake, &env.path);

        let result = router.classify("navigate home").await;
        assert_eq!(result.error(), Some("Env file missing"));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(router.api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_classify_api_error_degrades_with_description() {
        let env = TempEnv::with_key();
        let fake = FakeChatApi::always_err(ChatApiError::Api {
            message: "Rate limit exceeded".to_string(),
            code: Some(429),
            provider: None,
        });
        let router = IntentRouter::with_api(fake, &env.path);

        let result = router.classify("navigate home").await;
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.error(), Some("API error: Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_classify_unparseable_answer_degrades() {
        let env = TempEnv::with_key();
        let fake = FakeChatApi::always("Sure! Here is your JSON: {\"intent\"...");
        let router = IntentRouter::with_api(fake, &env.path);

        let result = router.classify("navigate home").await;
        assert_eq!(result.error(), Some("Invalid JSON"));
    }
}
