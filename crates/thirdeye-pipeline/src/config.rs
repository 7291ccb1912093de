//! Configuration for the Orchestrator

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thirdeye_domain::WatermarkCode;
use thirdeye_scorer::ScorerConfig;

/// Configuration for the Orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum claim length (characters)
    pub max_query_length: usize,

    /// Results requested from the search provider per run
    pub max_search_results: usize,

    /// Maximum time for one search call (seconds)
    pub search_timeout_secs: u64,

    /// Maximum time for one narrative-synthesis call (seconds)
    pub synthesis_timeout_secs: u64,

    /// Evidence items listed individually in the synthesis prompt
    pub prompt_evidence_limit: usize,

    /// Product prefix of watermark codes
    pub watermark_prefix: String,

    /// History page size when the caller gives none
    pub default_page_size: u32,

    /// Largest history page a caller may request
    pub max_page_size: u32,

    /// Evidence scoring vocabularies
    pub scorer: ScorerConfig,
}

impl PipelineConfig {
    /// Get the search timeout as a Duration
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Get the synthesis timeout as a Duration
    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_query_length == 0 {
            return Err("max_query_length must be greater than 0".to_string());
        }
        if self.max_search_results == 0 {
            return Err("max_search_results must be greater than 0".to_string());
        }
        if self.search_timeout_secs == 0 {
            return Err("search_timeout_secs must be greater than 0".to_string());
        }
        if self.synthesis_timeout_secs == 0 {
            return Err("synthesis_timeout_secs must be greater than 0".to_string());
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err("default_page_size must be between 1 and max_page_size".to_string());
        }
        WatermarkCode::from_parts(&self.watermark_prefix, "20000101", "000000000000")
            .map_err(|_| format!("Invalid watermark_prefix '{}'", self.watermark_prefix))?;
        self.scorer.validate()
    }

    /// Aggressive preset: fewer results and shorter timeouts
    pub fn aggressive() -> Self {
        Self {
            max_query_length: 1_000,
            max_search_results: 8,
            search_timeout_secs: 10,
            synthesis_timeout_secs: 30,
            prompt_evidence_limit: 5,
            ..Self::default()
        }
    }

    /// Lenient preset: more results and longer timeouts
    pub fn lenient() -> Self {
        Self {
            max_query_length: 5_000,
            max_search_results: 25,
            search_timeout_secs: 45,
            synthesis_timeout_secs: 180,
            prompt_evidence_limit: 20,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_query_length: 2_000,
            max_search_results: 15,
            search_timeout_secs: 20,
            synthesis_timeout_secs: 60,
            prompt_evidence_limit: 10,
            watermark_prefix: "3EV".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            scorer: ScorerConfig::default(),
        }
    }
}
