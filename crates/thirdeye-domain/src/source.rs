//! Source credibility profiles
//!
//! A [`Source`] is the only piece of state shared across concurrent analyses.
//! Its credibility is a pure function of its verification counters, so any
//! store that applies [`Source::apply_outcome`] inside one row-level
//! transaction cannot lose an update.

use crate::evidence::SourceType;
use serde::{Deserialize, Serialize};

/// Credibility assigned to a domain on first sighting
pub const NEUTRAL_CREDIBILITY: f64 = 50.0;

/// Credibility at or above this counts as a high-credibility source
pub const HIGH_CREDIBILITY_THRESHOLD: f64 = 70.0;

/// Credibility below this counts as a low-credibility source
pub const LOW_CREDIBILITY_THRESHOLD: f64 = 40.0;

/// Political bias rating of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasRating {
    /// Left-leaning
    Left,
    /// Right-leaning
    Right,
    /// Centrist
    Center,
    /// Not yet rated
    Unknown,
}

impl BiasRating {
    /// Get the bias rating as a storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasRating::Left => "left",
            BiasRating::Right => "right",
            BiasRating::Center => "center",
            BiasRating::Unknown => "unknown",
        }
    }

    /// Parse a bias rating; anything unrecognised is `Unknown`
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "left" => BiasRating::Left,
            "right" => BiasRating::Right,
            "center" | "centre" => BiasRating::Center,
            _ => BiasRating::Unknown,
        }
    }
}

/// Outcome of an external verification of one claim attributed to a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The source's claim was verified accurate
    Accurate,
    /// The source's claim was verified inaccurate
    Inaccurate,
}

/// Durable credibility profile for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Domain (unique key)
    pub domain: String,
    /// Category of the domain
    pub source_type: SourceType,
    /// Credibility (0-100)
    pub credibility_score: f64,
    /// Bias rating
    pub bias_rating: BiasRating,
    /// Claims verified accurate
    pub verified_accurate: u32,
    /// Claims verified inaccurate
    pub verified_inaccurate: u32,
}

impl Source {
    /// Create a profile with neutral defaults for a newly seen domain
    pub fn new(domain: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            domain: domain.into(),
            source_type,
            credibility_score: NEUTRAL_CREDIBILITY,
            bias_rating: BiasRating::Unknown,
            verified_accurate: 0,
            verified_inaccurate: 0,
        }
    }

    /// Apply one verification outcome, returning the updated profile
    ///
    /// The new credibility depends only on the counters, which makes any
    /// sequence of outcomes order-independent.
    ///
    /// # Examples
    ///
    /// ```
    /// use thirdeye_domain::{Source, SourceType, VerificationOutcome};
    ///
    /// let source = Source::new("example.gov", SourceType::Government)
    ///     .apply_outcome(VerificationOutcome::Accurate)
    ///     .apply_outcome(VerificationOutcome::Inaccurate);
    /// assert_eq!(source.credibility_score, 50.0);
    /// ```
    pub fn apply_outcome(mut self, outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Accurate => self.verified_accurate += 1,
            VerificationOutcome::Inaccurate => self.verified_inaccurate += 1,
        }
        self.credibility_score =
            credibility_from_counts(self.verified_accurate, self.verified_inaccurate)
                .unwrap_or(self.credibility_score);
        self
    }

    /// Whether this source counts toward the high-credibility tally
    pub fn is_high_credibility(&self) -> bool {
        self.credibility_score >= HIGH_CREDIBILITY_THRESHOLD
    }

    /// Whether this source counts toward the low-credibility tally
    pub fn is_low_credibility(&self) -> bool {
        self.credibility_score < LOW_CREDIBILITY_THRESHOLD
    }
}

/// Credibility on the 0-100 scale from verification counters
///
/// Returns `None` when no outcome has been recorded yet.
pub fn credibility_from_counts(accurate: u32, inaccurate: u32) -> Option<f64> {
    let total = accurate as f64 + inaccurate as f64;
    if total == 0.0 {
        return None;
    }
    Some(100.0 * accurate as f64 / total)
}
