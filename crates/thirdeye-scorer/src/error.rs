//! Error types for scoring and credibility tracking

use thiserror::Error;

/// Errors that can occur while scoring or tracking sources
///
/// Per-item degradations (bad URL, missing date) are not errors.
#[derive(Error, Debug)]
pub enum ScorerError {
    /// A heuristic pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Source store error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
