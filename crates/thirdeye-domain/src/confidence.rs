//! Fixed weighting formulas
//!
//! Two weight schemes exist and both are fixed:
//! - item level: source type 0.4, verifiability 0.3, recency 0.2, provenance 0.1
//! - result level: evidence quality 0.4, source credibility 0.3, logical consistency 0.3
//!
//! Both are evaluated in integer tenths so that `round(x.5)` is exact and an
//! overall score can always be reproduced from its components.

use serde::{Deserialize, Serialize};

/// Result-level weight of evidence quality
pub const EVIDENCE_QUALITY_WEIGHT: f64 = 0.4;
/// Result-level weight of source credibility
pub const SOURCE_CREDIBILITY_WEIGHT: f64 = 0.3;
/// Result-level weight of logical consistency
pub const LOGICAL_CONSISTENCY_WEIGHT: f64 = 0.3;

/// Item-level weight of the source type score
pub const SOURCE_TYPE_WEIGHT: f64 = 0.4;
/// Item-level weight of verifiability
pub const VERIFIABILITY_WEIGHT: f64 = 0.3;
/// Item-level weight of recency
pub const RECENCY_WEIGHT: f64 = 0.2;
/// Item-level weight of provenance
pub const PROVENANCE_WEIGHT: f64 = 0.1;

/// The three component scores of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScores {
    /// Mean evidence item quality (0-100)
    pub evidence_quality_score: u8,
    /// Mean source credibility (0-100)
    pub source_credibility_score: u8,
    /// Logical consistency from narrative synthesis (0-100)
    pub logical_consistency_score: u8,
}

impl ComponentScores {
    /// Fused overall confidence for these components
    pub fn overall(&self) -> u8 {
        fuse_confidence(
            self.evidence_quality_score,
            self.source_credibility_score,
            self.logical_consistency_score,
        )
    }
}

/// `round(0.4*evidence + 0.3*credibility + 0.3*consistency)`
///
/// Inputs above 100 are clamped.
///
/// # Examples
///
/// ```
/// use thirdeye_domain::fuse_confidence;
///
/// assert_eq!(fuse_confidence(80, 60, 70), 71);
/// assert_eq!(fuse_confidence(0, 0, 0), 0);
/// assert_eq!(fuse_confidence(100, 100, 100), 100);
/// ```
pub fn fuse_confidence(evidence: u8, credibility: u8, consistency: u8) -> u8 {
    let tenths = 4 * clamp(evidence) + 3 * clamp(credibility) + 3 * clamp(consistency);
    round_tenths(tenths)
}

/// `round(0.4*source_type + 0.3*verifiability + 0.2*recency + 0.1*provenance)`
pub fn item_quality(source_type: u8, verifiability: u8, recency: u8, provenance: u8) -> u8 {
    let tenths = 4 * clamp(source_type)
        + 3 * clamp(verifiability)
        + 2 * clamp(recency)
        + clamp(provenance);
    round_tenths(tenths)
}

fn clamp(score: u8) -> u32 {
    u32::from(score.min(100))
}

// Half-up rounding of a non-negative value expressed in tenths.
fn round_tenths(tenths: u32) -> u8 {
    ((tenths + 5) / 10).min(100) as u8
}
