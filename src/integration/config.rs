//! Configuration for the integration layer
//!
//! Centralized configuration handed to the orchestrator; each subsystem's
//! own config type is embedded so callers set everything in one place.

use std::path::PathBuf;
use std::time::Duration;

use crate::llm::ChatClientConfig;
use crate::speech::SpeechOptions;

/// Configuration for the complete pipeline
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Chat completion endpoint used by the intent classifier
    pub chat: ChatClientConfig,

    /// Env file the API key is re-read from on every classification
    pub env_path: PathBuf,

    /// Voice parameters for spoken feedback
    pub speech: SpeechOptions,

    /// How long to wait for workers to acknowledge shutdown
    pub shutdown_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chat: ChatClientConfig::default(),
            env_path: PathBuf::from(".env"),
            speech: SpeechOptions::default(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl OrchestratorConfig {
    /// Set the chat endpoint configuration
    pub fn with_chat(mut self, chat: ChatClientConfig) -> Self {
        self.chat = chat;
        self
    }

    /// Set the env file to load the API key from
    pub fn with_env_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_path = path.into();
        self
    }

    /// Set the voice parameters for spoken feedback
    pub fn with_speech(mut self, speech: SpeechOptions) -> Self {
        self.speech = speech;
        self
    }

    /// Set the worker shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chat.model.is_empty() {
            return Err("Chat model identifier is required".to_string());
        }
        if !self.chat.base_url.starts_with("http") {
            return Err(format!("Invalid chat endpoint: {}", self.chat.base_url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.env_path, PathBuf::from(".env"));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builders() {
        let config = OrchestratorConfig::default()
            .with_env_path("/tmp/keys.env")
            .with_speech(SpeechOptions::default().with_rate(0.4))
            .with_shutdown_timeout(Duration::from_millis(500));

        assert_eq!(config.env_path, PathBuf::from("/tmp/keys.env"));
        assert_eq!(config.speech.rate, 0.4);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = OrchestratorConfig::default();
        config.chat.model = String::new();
        assert_eq!(
            config.validate(),
            Err("Chat model identifier is required".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let mut config = OrchestratorConfig::default();
        config.chat.base_url = "ftp://example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("Invalid chat endpoint"));
    }
}
