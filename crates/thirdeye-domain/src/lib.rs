//! Thirdeye Domain Layer
//!
//! Core value types and trait interfaces for the evidence confidence pipeline.
//! Every other crate in the workspace depends on this one; it depends only on
//! `uuid` (identifiers) and `serde` (the JSON shape handed to callers).
//!
//! ## Key Concepts
//!
//! - **Evidence item**: one scored, classified piece of retrieved information
//! - **Source**: a domain-level entity with an evolving credibility profile
//! - **Pattern match**: a scored similarity link to a historically proven program
//! - **Analysis result**: the fused, immutable outcome of one pipeline run
//! - **Watermark**: a unique provenance code bound to exactly one result
//!
//! A confidence score is a weighted composite of evidence quality, source
//! credibility, and logical consistency. It is never a truth verdict.
//!
//! ## Architecture
//!
//! - Pure data and formulas only
//! - Infrastructure (SQLite, HTTP collaborators) lives in other crates
//! - Trait definitions for all external interactions live in [`traits`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abuse;
pub mod analysis;
pub mod confidence;
pub mod evidence;
pub mod history;
pub mod source;
pub mod traits;
pub mod watermark;

// Re-exports for convenience
pub use abuse::{AbuseKind, AbuseReport, Severity};
pub use analysis::{
    AnalysisId, AnalysisRecord, AnalysisResult, AnalysisSubject, AnalysisSummary,
    NarrativeAssessment, QueryEntry, SourceMetrics, Theory,
};
pub use confidence::{fuse_confidence, ComponentScores};
pub use evidence::{EvidenceItem, ProvenanceType, RawSearchResult, SourceType};
pub use history::{HistoricalEvent, PatternMatch, TemporalMetrics};
pub use source::{BiasRating, Source, VerificationOutcome};
pub use watermark::{Watermark, WatermarkCode};

/// Current timestamp in seconds since Unix epoch
///
/// Falls back to 0 if the system clock is set before the epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
