//! Thirdeye Pipeline
//!
//! The confidence fusion orchestrator: turns a claim into one scored,
//! persisted and watermarked analysis.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─ search → score → track sources ─┐
//! claim → guard → log ┤                                  ├→ synthesize → fuse → persist → stamp
//!                     └─ match historical patterns ──────┘
//! ```
//!
//! Any failure before persistence aborts the run and nothing is stored
//! beyond the query log entry. Narrative-synthesis output is parsed
//! strictly; a malformed answer is an error, never a default score.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use thirdeye_pipeline::{AnalysisRequest, Orchestrator, PipelineConfig};
//! use thirdeye_gatekeeper::{GuardConfig, MemorySink, MisuseGuard};
//! use thirdeye_patterns::{MatcherConfig, PatternMatcher};
//! use thirdeye_llm::MockProvider;
//! use thirdeye_search::StaticSearch;
//! use thirdeye_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(Mutex::new(SqliteStore::new(":memory:")?));
//! let matcher = Arc::new(PatternMatcher::new(&MatcherConfig::default())?);
//! let guard = Arc::new(MisuseGuard::new(GuardConfig::default(), Arc::new(MemorySink::new()))?);
//!
//! let orchestrator = Orchestrator::new(
//!     PipelineConfig::default(),
//!     store,
//!     StaticSearch::new(vec![]),
//!     MockProvider::default(),
//!     matcher,
//!     guard,
//! )?;
//!
//! let record = orchestrator
//!     .analyze(AnalysisRequest::claim("alice", "MK-Ultra mind control experiments"))
//!     .await?;
//!
//! println!("{}: {}", record.watermark, record.result.overall_confidence_score);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod parser;
mod prompt;
mod types;
mod watermark;

#[cfg(test)]
mod tests;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::{
    Orchestrator, ANALYZE_ACTION, AUDIT_FORK_ACTION, CREATE_THEORY_ACTION, RECORD_OUTCOME_ACTION,
};
pub use parser::parse_narrative;
pub use prompt::NarrativePrompt;
pub use types::AnalysisRequest;
pub use watermark::WatermarkGenerator;
