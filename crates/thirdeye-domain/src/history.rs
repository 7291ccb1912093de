//! Historical reference data and the matches computed against it

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A historically proven covert program (curated, read-only at runtime)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    /// Display name, e.g. "MK-ULTRA"
    pub name: String,
    /// Unique short code
    pub code: String,
    /// Year the program started
    pub start_year: i32,
    /// Year the program was publicly revealed
    pub revealed_year: i32,
    /// Declared pattern traits, e.g. `surveillance`, `drug_experiments`
    #[serde(default)]
    pub pattern_characteristics: BTreeSet<String>,
    /// Whether the government formally admitted the program
    #[serde(default)]
    pub government_admission: bool,
    /// Whether evidence was destroyed
    #[serde(default)]
    pub evidence_destruction: bool,
}

impl HistoricalEvent {
    /// Years between start and public disclosure
    pub fn years_to_disclosure(&self) -> i32 {
        self.revealed_year - self.start_year
    }

    /// Whether the event declares the given characteristic
    pub fn has_characteristic(&self, name: &str) -> bool {
        self.pattern_characteristics.contains(name)
    }

    /// First hyphen-delimited token of the name, lower-cased
    ///
    /// Returns `None` when that token is empty.
    pub fn name_token(&self) -> Option<String> {
        let token = self.name.split('-').next().unwrap_or("").trim().to_lowercase();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

/// Temporal facts copied verbatim from the matched event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalMetrics {
    /// `revealed_year - start_year`
    pub denial_to_admission_years: i32,
    /// Whether the government formally admitted the program
    pub government_admission: bool,
    /// Whether evidence was destroyed
    pub evidence_destruction: bool,
}

impl From<&HistoricalEvent> for TemporalMetrics {
    fn from(event: &HistoricalEvent) -> Self {
        Self {
            denial_to_admission_years: event.years_to_disclosure(),
            government_admission: event.government_admission,
            evidence_destruction: event.evidence_destruction,
        }
    }
}

/// Similarity link between a claim and one historical event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    /// Name of the matched event
    pub event_name: String,
    /// Code of the matched event
    pub event_code: String,
    /// Similarity (0-100)
    pub similarity_score: u8,
    /// Characteristics triggered by the claim text
    pub matching_characteristics: Vec<String>,
    /// Declared characteristics the claim did not trigger
    pub differences: Vec<String>,
    /// Temporal facts of the event
    pub temporal_metrics: TemporalMetrics,
}
