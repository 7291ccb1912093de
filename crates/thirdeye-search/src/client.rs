//! HTTP search client for Brave and SerpAPI

use crate::config::{SearchBackend, SearchConfig};
use crate::SearchError;
use serde::Deserialize;
use thirdeye_domain::traits::SearchProvider;
use thirdeye_domain::RawSearchResult;
use tracing::{debug, error};

/// Web search over one configured backend
pub struct WebSearchClient {
    backend: SearchBackend,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    age: Option<String>,
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SerpApiResult>,
}

#[derive(Deserialize)]
struct SerpApiResult {
    title: String,
    link: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl From<BraveResponse> for Vec<RawSearchResult> {
    fn from(response: BraveResponse) -> Self {
        response
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| RawSearchResult {
                title: r.title,
                url: r.url,
                snippet: r.description,
                publish_date: r.age,
            })
            .collect()
    }
}

impl From<SerpApiResponse> for Vec<RawSearchResult> {
    fn from(response: SerpApiResponse) -> Self {
        response
            .organic_results
            .into_iter()
            .map(|r| RawSearchResult {
                title: r.title,
                url: r.link,
                snippet: r.snippet,
                publish_date: r.date,
            })
            .collect()
    }
}

impl WebSearchClient {
    /// Create a client from configuration
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        config.validate().map_err(SearchError::Config)?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            backend: config.backend,
            endpoint: config.endpoint().to_string(),
            api_key: config.resolve_api_key(),
            client,
        })
    }

    /// Backend this client calls
    pub fn backend(&self) -> SearchBackend {
        self.backend
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::Config("no search API key configured".to_string()))?;
        let count = max_results.to_string();

        let request = match self.backend {
            SearchBackend::Brave => self
                .client
                .get(&self.endpoint)
                .header("Accept", "application/json")
                .header("X-Subscription-Token", api_key)
                .query(&[("q", query), ("count", count.as_str())]),
            SearchBackend::SerpApi => self
                .client
                .get(&self.endpoint)
                .query(&[("q", query), ("api_key", api_key), ("num", count.as_str())]),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout
            } else {
                SearchError::Communication(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Communication(format!("HTTP {}: {}", status, detail)));
        }

        let mut results: Vec<RawSearchResult> = match self.backend {
            SearchBackend::Brave => response
                .json::<BraveResponse>()
                .await
                .map_err(|e| SearchError::InvalidResponse(e.to_string()))?
                .into(),
            SearchBackend::SerpApi => response
                .json::<SerpApiResponse>()
                .await
                .map_err(|e| SearchError::InvalidResponse(e.to_string()))?
                .into(),
        };
        results.truncate(max_results);
        Ok(results)
    }
}

impl SearchProvider for WebSearchClient {
    type Error = SearchError;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, Self::Error> {
        let result = self.fetch(query, max_results).await;
        match &result {
            Ok(results) => debug!(backend = ?self.backend, count = results.len(), "Search complete"),
            Err(e) => error!(backend = ?self.backend, error = %e, "Search failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brave_response_mapping() {
        let json = r#"{"web":{"results":[
            {"title":"FBI Vault","url":"https://vault.fbi.gov/x","description":"Records","age":"2015-03-01"},
            {"title":"No description","url":"https://example.com"}
        ]}}"#;
        let response: BraveResponse = serde_json::from_str(json).unwrap();
        let results: Vec<RawSearchResult> = response.into();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet.as_deref(), Some("Records"));
        assert_eq!(results[0].publish_date.as_deref(), Some("2015-03-01"));
        assert!(results[1].snippet.is_none());
    }

    #[test]
    fn test_brave_response_without_web_section() {
        let response: BraveResponse = serde_json::from_str("{}").unwrap();
        let results: Vec<RawSearchResult> = response.into();
        assert!(results.is_empty());
    }

    #[test]
    fn test_serpapi_response_mapping() {
        let json = r#"{"organic_results":[{"title":"T","link":"https://a.edu/p","snippet":"s","date":"Jan 2, 2020"}]}"#;
        let response: SerpApiResponse = serde_json::from_str(json).unwrap();
        let results: Vec<RawSearchResult> = response.into();
        assert_eq!(results[0].url, "https://a.edu/p");
        assert_eq!(results[0].publish_date.as_deref(), Some("Jan 2, 2020"));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let config = SearchConfig {
            api_key: None,
            api_key_env: None,
            ..Default::default()
        };
        let client = WebSearchClient::new(&config).unwrap();
        let result = client.search("query", 5).await;
        assert!(matches!(result, Err(SearchError::Config(_))));
    }
}
