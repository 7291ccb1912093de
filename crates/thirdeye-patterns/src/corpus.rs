//! Versioned reference data: historical events and trigger indicators
//!
//! Both files are plain TOML with a top-level `version`. The production
//! copies are compiled in; tests and deployments can load replacements.

use crate::error::PatternError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thirdeye_domain::HistoricalEvent;

const DEFAULT_EVENTS: &str = include_str!("../corpus/historical_events.toml");
const DEFAULT_INDICATORS: &str = include_str!("../corpus/indicators.toml");

/// Curated historical events
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventCorpus {
    /// Data version
    pub version: u32,
    /// Events, unique by code
    #[serde(default)]
    pub events: Vec<HistoricalEvent>,
}

impl EventCorpus {
    /// Parse and validate a corpus document
    pub fn from_toml(contents: &str) -> Result<Self, PatternError> {
        let corpus: EventCorpus = toml::from_str(contents)?;
        corpus.validate()?;
        Ok(corpus)
    }

    /// Load a corpus file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PatternError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// The compiled-in production corpus
    pub fn builtin() -> Result<Self, PatternError> {
        Self::from_toml(DEFAULT_EVENTS)
    }

    fn validate(&self) -> Result<(), PatternError> {
        if self.version == 0 {
            return Err(PatternError::InvalidCorpus("version must be at least 1".to_string()));
        }
        let mut codes = HashSet::new();
        for event in &self.events {
            if event.code.trim().is_empty() || event.name.trim().is_empty() {
                return Err(PatternError::InvalidCorpus("event name and code must not be empty".to_string()));
            }
            if !codes.insert(event.code.as_str()) {
                return Err(PatternError::InvalidCorpus(format!("duplicate event code {}", event.code)));
            }
            if event.revealed_year < event.start_year {
                return Err(PatternError::InvalidCorpus(format!(
                    "{} revealed before it started",
                    event.code
                )));
            }
        }
        Ok(())
    }
}

/// One trigger phrase
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Indicator {
    /// Lower-case phrase searched for in the claim
    pub phrase: String,
    /// Characteristic the event must declare
    pub characteristic: String,
    /// Points added on a hit
    pub weight: u8,
}

/// Trigger weights plus the name-token bonus
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndicatorTable {
    /// Data version
    pub version: u32,
    /// Bonus when the claim names the event
    pub name_token_weight: u8,
    /// Trigger phrases, evaluated in order
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

impl IndicatorTable {
    /// Parse and validate an indicator document
    pub fn from_toml(contents: &str) -> Result<Self, PatternError> {
        let mut table: IndicatorTable = toml::from_str(contents)?;
        table.validate()?;
        for indicator in &mut table.indicators {
            indicator.phrase = indicator.phrase.to_lowercase();
        }
        Ok(table)
    }

    /// Load an indicator file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PatternError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// The compiled-in production table
    pub fn builtin() -> Result<Self, PatternError> {
        Self::from_toml(DEFAULT_INDICATORS)
    }

    fn validate(&self) -> Result<(), PatternError> {
        if self.version == 0 {
            return Err(PatternError::InvalidCorpus("version must be at least 1".to_string()));
        }
        if self.name_token_weight > 100 {
            return Err(PatternError::InvalidCorpus("name_token_weight exceeds 100".to_string()));
        }
        for indicator in &self.indicators {
            if indicator.phrase.trim().is_empty() || indicator.characteristic.trim().is_empty() {
                return Err(PatternError::InvalidCorpus("indicator phrase and characteristic must not be empty".to_string()));
            }
            if indicator.weight == 0 || indicator.weight > 100 {
                return Err(PatternError::InvalidCorpus(format!(
                    "indicator {:?} weight must be 1-100",
                    indicator.phrase
                )));
            }
        }
        Ok(())
    }
}
