//! Configuration for the historical pattern matcher

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pattern matcher configuration
///
/// Without paths the compiled-in corpus and indicator table are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Override for `corpus/historical_events.toml`
    pub corpus_path: Option<PathBuf>,

    /// Override for `corpus/indicators.toml`
    pub indicators_path: Option<PathBuf>,

    /// Matches must score strictly above this (default: 30)
    pub min_score: u8,

    /// Maximum matches returned (default: 5)
    pub max_matches: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            indicators_path: None,
            min_score: 30,
            max_matches: 5,
        }
    }
}

impl MatcherConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.min_score >= 100 {
            return Err("min_score must be below 100".to_string());
        }
        if self.max_matches == 0 {
            return Err("max_matches must be at least 1".to_string());
        }
        Ok(())
    }
}
