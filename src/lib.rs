pub mod integration;
pub mod intent;
pub mod llm;
pub mod ranging;
pub mod speech;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum WayfinderError {
    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Chat API error: {0}")]
    ChatApiError(String),

    #[error("Classification error: {0}")]
    ClassificationError(String),

    #[error("Radio error: {0}")]
    RadioError(String),

    #[error("Ranging session error: {0}")]
    SessionError(String),

    #[error("Speech error: {0}")]
    SpeechError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Orchestrator error: {0}")]
    OrchestratorError(String),
}

impl From<std::io::Error> for WayfinderError {
    fn from(e: std::io::Error) -> Self {
        WayfinderError::IOError(e.to_string())
    }
}

impl From<llm::ChatApiError> for WayfinderError {
    fn from(e: llm::ChatApiError) -> Self {
        WayfinderError::ChatApiError(e.to_string())
    }
}

impl From<llm::CredentialError> for WayfinderError {
    fn from(e: llm::CredentialError) -> Self {
        WayfinderError::CredentialError(e.to_string())
    }
}

impl From<ranging::SessionError> for WayfinderError {
    fn from(e: ranging::SessionError) -> Self {
        WayfinderError::SessionError(e.to_string())
    }
}

impl WayfinderError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Fixable by the user (edit the env file), but not by retrying
            WayfinderError::CredentialError(_) => false,
            // Network conditions change between attempts
            WayfinderError::ChatApiError(_) => true,
            WayfinderError::ClassificationError(_) => true,
            // Radio problems usually clear once the adapter is powered on
            WayfinderError::RadioError(_) => true,
            WayfinderError::SessionError(_) => true,
            WayfinderError::SpeechError(_) => true,
            WayfinderError::IOError(_) => false,
            WayfinderError::ConfigError(_) => false,
            WayfinderError::ChannelError(_) => false,
            WayfinderError::OrchestratorError(_) => true,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            WayfinderError::CredentialError(_) => {
                "API credentials are missing. Please check the environment file.".to_string()
            }
            WayfinderError::ChatApiError(_) => {
                "The language model service could not be reached. Please try again.".to_string()
            }
            WayfinderError::ClassificationError(_) => {
                "Could not understand the request. Please try again.".to_string()
            }
            WayfinderError::RadioError(_) => {
                "Bluetooth error. Please check that Bluetooth is turned on.".to_string()
            }
            WayfinderError::SessionError(_) => {
                "Ranging session error. Please reconnect to the accessory.".to_string()
            }
            WayfinderError::SpeechError(_) => {
                "Speech output failed. Response will be shown as text.".to_string()
            }
            WayfinderError::IOError(_) => "File system error occurred.".to_string(),
            WayfinderError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            WayfinderError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            WayfinderError::OrchestratorError(_) => {
                "System error occurred. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WayfinderError>;
