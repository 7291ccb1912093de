//! Thirdeye Historical Pattern Matcher
//!
//! Compares claim text against a curated corpus of documented covert
//! programs and returns ranked similarity matches.
//!
//! The corpus (`corpus/historical_events.toml`) and the trigger table
//! (`corpus/indicators.toml`) are versioned data files compiled into the
//! crate. [`MatcherConfig`] can point at replacements.
//!
//! # Example
//!
//! ```
//! use thirdeye_patterns::{MatcherConfig, PatternMatcher};
//!
//! let matcher = PatternMatcher::new(&MatcherConfig::default()).unwrap();
//! let matches = matcher.match_claim("MK-ULTRA style mind control with drug trials");
//! assert_eq!(matches[0].event_code, "MKULTRA");
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod matcher;

pub use config::MatcherConfig;
pub use corpus::{EventCorpus, Indicator, IndicatorTable};
pub use error::PatternError;
pub use matcher::PatternMatcher;
