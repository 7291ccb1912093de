//! Configuration file parsing for the server.
//!
//! One TOML file carries the bind address, the database path and one table
//! per component: `[pipeline]`, `[guard]`, `[search]`, `[llm]`, `[patterns]`.
//! Every table is optional and falls back to the component defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thirdeye_gatekeeper::GuardConfig;
use thirdeye_llm::LlmConfig;
use thirdeye_patterns::MatcherConfig;
use thirdeye_pipeline::PipelineConfig;
use thirdeye_search::SearchConfig;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A section failed validation
    #[error("Invalid [{section}] configuration: {message}")]
    Invalid {
        /// Offending table
        section: &'static str,
        /// Validation message
        message: String,
    },
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Actors allowed to list and lift guard blocks
    pub operators: Vec<String>,

    /// Orchestrator settings
    pub pipeline: PipelineConfig,

    /// Misuse guard settings
    pub guard: GuardConfig,

    /// Search provider settings
    pub search: SearchConfig,

    /// Narrative-synthesis provider settings
    pub llm: LlmConfig,

    /// Historical pattern matcher settings
    pub patterns: MatcherConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            database_path: PathBuf::from("thirdeye.db"),
            operators: Vec::new(),
            pipeline: PipelineConfig::default(),
            guard: GuardConfig::default(),
            search: SearchConfig::default(),
            llm: LlmConfig::default(),
            patterns: MatcherConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(invalid("server")("bind_address must not be empty".to_string()));
        }
        if self.operators.iter().any(|o| o.trim().is_empty()) {
            return Err(invalid("server")("operators must not contain empty names".to_string()));
        }
        self.pipeline.validate().map_err(invalid("pipeline"))?;
        self.guard.validate().map_err(invalid("guard"))?;
        self.search.validate().map_err(invalid("search"))?;
        self.llm.validate().map_err(invalid("llm"))?;
        self.patterns.validate().map_err(invalid("patterns"))?;
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

fn invalid(section: &'static str) -> impl Fn(String) -> ConfigError {
    move |message| ConfigError::Invalid { section, message }
}
