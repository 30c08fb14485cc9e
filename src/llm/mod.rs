//! Remote chat completion client
//!
//! Thin typed client for an OpenRouter-style chat completion API plus the
//! credential loading it needs. The [`ChatApi`] trait is the seam between
//! the intent pipeline and the network; tests swap in [`FakeChatApi`].

pub mod client;
pub mod config;
pub mod credentials;

pub use client::{ChatApi, ChatApiError, FakeChatApi, OpenRouterClient};
pub use config::{ChatClientConfig, RoutingMetadata};
pub use credentials::{load_api_key, CredentialError, API_KEY_VAR};
