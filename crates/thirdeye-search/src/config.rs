//! Configuration for the web search client

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which search API to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// Brave Search web API
    #[default]
    Brave,
    /// SerpAPI Google results
    SerpApi,
}

impl SearchBackend {
    /// Default base URL for the backend
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            SearchBackend::Brave => "https://api.search.brave.com/res/v1/web/search",
            SearchBackend::SerpApi => "https://serpapi.com/search",
        }
    }
}

/// Configuration for [`WebSearchClient`](crate::WebSearchClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Backend to call
    pub backend: SearchBackend,

    /// Override of the backend's default URL
    pub endpoint: Option<String>,

    /// Inline API key (prefer `api_key_env`)
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Results requested per query
    pub max_results: usize,

    /// HTTP request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl SearchConfig {
    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured endpoint, or the backend default
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.backend.default_endpoint())
    }

    /// Inline key if set, else the value of `api_key_env`
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.is_empty())
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_results == 0 || self.max_results > 50 {
            return Err("max_results must be between 1 and 50".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Brave,
            endpoint: None,
            api_key: None,
            api_key_env: Some("SEARCH_API_KEY".to_string()),
            max_results: 10,
            request_timeout_secs: 15,
        }
    }
}
