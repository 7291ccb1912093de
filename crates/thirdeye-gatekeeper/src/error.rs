//! Guard error types

use crate::usage::BlockReason;
use thiserror::Error;

/// Rejections and failures raised by the guard
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    /// Too many requests in the rate window
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the oldest request leaves the window
        retry_after_secs: u64,
    },

    /// The actor is blocked until manually unblocked
    #[error("Actor blocked: {0}")]
    Blocked(BlockReason),

    /// Guard state is unavailable
    #[error("Guard state error: {0}")]
    State(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
