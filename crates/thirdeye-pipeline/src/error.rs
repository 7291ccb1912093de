//! Error types for the Orchestrator

use thirdeye_gatekeeper::GuardError;
use thiserror::Error;

/// Errors that can end a pipeline run or a pipeline query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Missing, empty or oversize input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No stored theory has this id
    #[error("Unknown theory: {0}")]
    UnknownTheory(i64),

    /// Too many requests from this actor
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until a new request would be admitted
        retry_after_secs: u64,
    },

    /// The actor is blocked
    #[error("Actor blocked: {0}")]
    ActorBlocked(String),

    /// Search provider unreachable or failed
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Narrative-synthesis provider failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Narrative-synthesis call exceeded its deadline
    #[error("Synthesis timed out")]
    SynthesisTimeout,

    /// Narrative-synthesis output did not match the expected shape
    #[error("Malformed synthesis output: {0}")]
    MalformedSynthesis(String),

    /// Persistence failed
    #[error("Storage failed: {0}")]
    StorageFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal failure (task join, guard state)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::UnknownTheory(_) => "invalid_input",
            PipelineError::RateLimited { .. } => "rate_limited",
            PipelineError::ActorBlocked(_) => "actor_blocked",
            PipelineError::SearchFailed(_) => "search_failed",
            PipelineError::SynthesisFailed(_) => "synthesis_failed",
            PipelineError::SynthesisTimeout => "synthesis_timeout",
            PipelineError::MalformedSynthesis(_) => "malformed_synthesis",
            PipelineError::StorageFailed(_) => "storage_failed",
            PipelineError::Config(_) | PipelineError::Internal(_) => "internal",
        }
    }

    /// Retry hint for rate-limit rejections
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            PipelineError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<GuardError> for PipelineError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::RateLimited { retry_after_secs } => PipelineError::RateLimited { retry_after_secs },
            GuardError::Blocked(reason) => PipelineError::ActorBlocked(reason.to_string()),
            GuardError::State(msg) => PipelineError::Internal(msg),
            GuardError::Config(msg) => PipelineError::Config(msg),
        }
    }
}
