//! Session configuration.
//!
//! Provides the host's runtime configuration and the per-handle session
//! configuration derived from it.

use std::env;

use serde::{Deserialize, Serialize};

/// Environment variable holding the HTTP API base URL.
pub const API_URL_ENV: &str = "NUXT_PUBLIC_API_URL";

/// Environment variable holding the WebSocket API base URL.
pub const WEBSOCKET_API_URL_ENV: &str = "NUXT_PUBLIC_WEBSOCKET_API_URL";

/// Public runtime configuration of the host application.
///
/// Both fields default to the empty string, as the host does when nothing
/// overrides them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Base URL of the HTTP API.
    pub api_url: String,

    /// Base URL of the WebSocket API.
    pub websocket_api_url: String,
}

impl RuntimeConfig {
    /// Creates a runtime configuration with the given WebSocket base URL.
    #[must_use]
    pub fn new(websocket_api_url: impl Into<String>) -> Self {
        Self {
            websocket_api_url: websocket_api_url.into(),
            ..Default::default()
        }
    }

    /// Sets the HTTP API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// Missing variables fall back to the empty string.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_url: lookup(API_URL_ENV).unwrap_or_default(),
            websocket_api_url: lookup(WEBSOCKET_API_URL_ENV).unwrap_or_default(),
        }
    }
}

/// Configuration of a single session handle.
///
/// Holds the base address every `connect` path is appended to. The
/// address is used as-is; nothing validates it before a connection attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base address of the WebSocket endpoint.
    pub base_url: String,
}

impl SessionConfig {
    /// Creates a session configuration with a fixed base address.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Creates a session configuration from the runtime configuration.
    #[must_use]
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self::new(runtime.websocket_api_url.clone())
    }

    /// Returns the connection target for `path`.
    ///
    /// Plain concatenation: no escaping, no separator handling.
    #[must_use]
    pub fn connection_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl From<&RuntimeConfig> for SessionConfig {
    fn from(runtime: &RuntimeConfig) -> Self {
        Self::from_runtime(runtime)
    }
}
