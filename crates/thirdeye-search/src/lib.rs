//! Thirdeye Search Provider Layer
//!
//! Implementations of the `SearchProvider` trait from `thirdeye-domain`.
//!
//! # Providers
//!
//! - `WebSearchClient`: Brave Search or SerpAPI over HTTP
//! - `StaticSearch`: Fixed results for testing, no network
//!
//! An empty result list is a normal outcome; only transport and decoding
//! failures are errors.

#![warn(missing_docs)]

pub mod client;
pub mod config;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thirdeye_domain::traits::SearchProvider;
use thirdeye_domain::RawSearchResult;
use thiserror::Error;

pub use client::WebSearchClient;
pub use config::{SearchBackend, SearchConfig};

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The request exceeded its deadline
    #[error("Search timed out")]
    Timeout,

    /// Response body did not match the backend's format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Search provider returning a fixed result list
///
/// # Examples
///
/// ```
/// use thirdeye_search::StaticSearch;
/// use thirdeye_domain::traits::SearchProvider;
/// use thirdeye_domain::RawSearchResult;
///
/// let search = StaticSearch::new(vec![RawSearchResult {
///     title: "Doc".to_string(),
///     url: "https://example.gov/doc".to_string(),
///     ..Default::default()
/// }]);
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// assert_eq!(rt.block_on(search.search("anything", 10)).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    results: Vec<RawSearchResult>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StaticSearch {
    /// Return these results for every query
    pub fn new(results: Vec<RawSearchResult>) -> Self {
        Self {
            results,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every query with a communication error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of searches performed
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchProvider for StaticSearch {
    type Error = SearchError;

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Communication("static search configured to fail".to_string()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}
