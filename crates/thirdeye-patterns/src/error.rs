//! Error types for corpus loading and matching

use thiserror::Error;

/// Errors that can occur while loading reference data
///
/// Matching itself never fails once the corpus is loaded.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Failed to read a corpus file
    #[error("Failed to read corpus file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse a corpus file
    #[error("Failed to parse corpus TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Corpus content violates an invariant
    #[error("Invalid corpus: {0}")]
    InvalidCorpus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
