//! Configuration for the chat completion client

/// Default OpenRouter chat completions endpoint
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "google/gemma-3-27b-it:free";

/// Routing metadata forwarded to the API inside the request body.
///
/// OpenRouter uses these for app attribution; both are optional and
/// default to absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutingMetadata {
    /// `HTTP-Referer` entry identifying the calling application
    pub referer: Option<String>,

    /// `X-Title` entry with a human-readable application name
    pub title: Option<String>,
}

impl RoutingMetadata {
    /// Set the referer entry
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Set the title entry
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Configuration for the chat completion client
#[derive(Clone, Debug)]
pub struct ChatClientConfig {
    /// Full URL of the chat completions endpoint
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Request timeout in seconds (one attempt, no retries)
    pub timeout_secs: u64,

    /// Routing metadata included in the request body
    pub routing: RoutingMetadata,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            routing: RoutingMetadata::default(),
        }
    }
}

impl ChatClientConfig {
    /// Create a configuration for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the routing metadata
    pub fn with_routing(mut self, routing: RoutingMetadata) -> Self {
        self.routing = routing;
        self
    }
}
