//! Guard configuration
//!
//! Window lengths, thresholds and the keyword vocabularies used by the
//! abuse detector and the usage monitor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the misuse guard
///
/// # Examples
///
/// ```
/// use thirdeye_gatekeeper::GuardConfig;
///
/// let config = GuardConfig::default();
/// assert_eq!(config.rate_limit, 5);
///
/// let strict = GuardConfig::strict();
/// assert!(strict.rate_limit < config.rate_limit);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Length of the rate window in seconds (default: 10)
    pub rate_window_secs: u64,

    /// Requests allowed per rate window (default: 5)
    pub rate_limit: usize,

    /// Length of the usage window in seconds (default: 3600)
    pub usage_window_secs: u64,

    /// Invocations allowed per usage window before blocking (default: 100)
    pub usage_limit: usize,

    /// Suppression requests allowed per usage window before blocking (default: 3)
    pub censorship_limit: usize,

    /// Query keywords raising a low-severity report
    pub suspicious_keywords: Vec<String>,

    /// Query terms counted as suppression requests
    pub censorship_terms: Vec<String>,

    /// Query phrases that target individual believers
    pub targeting_phrases: Vec<String>,

    /// Action substring that targets individual believers
    pub targeting_action_term: String,

    /// Actions that are rejected and block the actor outright
    pub prohibited_actions: Vec<String>,

    /// Actors tracked per window before the least recently seen is evicted
    pub max_tracked_actors: usize,

    /// How often the worker evicts expired window entries, in seconds (default: 60)
    pub sweep_interval_secs: u64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: 10,
            rate_limit: 5,
            usage_window_secs: 3600,
            usage_limit: 100,
            censorship_limit: 3,
            suspicious_keywords: strings(&["hack", "exploit", "ddos", "spam"]),
            censorship_terms: strings(&["censor", "remove"]),
            targeting_phrases: strings(&["who believes"]),
            targeting_action_term: "identify".to_string(),
            prohibited_actions: strings(&[
                "identify_believers",
                "track_users",
                "mass_surveillance",
                "censor_results",
            ]),
            max_tracked_actors: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

impl GuardConfig {
    /// Tighter limits for public deployments
    pub fn strict() -> Self {
        Self {
            rate_limit: 3,
            usage_limit: 50,
            censorship_limit: 1,
            sweep_interval_secs: 30,
            ..Self::default()
        }
    }

    /// Looser limits for trusted or internal callers
    pub fn permissive() -> Self {
        Self {
            rate_limit: 20,
            usage_limit: 500,
            censorship_limit: 10,
            sweep_interval_secs: 120,
            ..Self::default()
        }
    }

    /// Rate window as Duration
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Usage window as Duration
    pub fn usage_window(&self) -> Duration {
        Duration::from_secs(self.usage_window_secs)
    }

    /// Sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_window_secs == 0 || self.usage_window_secs == 0 {
            return Err("window lengths must be positive".to_string());
        }
        if self.rate_limit == 0 || self.usage_limit == 0 {
            return Err("rate_limit and usage_limit must be positive".to_string());
        }
        if self.max_tracked_actors == 0 {
            return Err("max_tracked_actors must be positive".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be positive".to_string());
        }
        if self.targeting_action_term.trim().is_empty() {
            return Err("targeting_action_term must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert_eq!(config.rate_window(), Duration::from_secs(10));
        assert_eq!(config.usage_window(), Duration::from_secs(3600));
        assert_eq!(config.usage_limit, 100);
        assert_eq!(config.censorship_limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let strict = GuardConfig::strict();
        let permissive = GuardConfig::permissive();
        assert!(strict.rate_limit < permissive.rate_limit);
        assert!(strict.usage_limit < permissive.usage_limit);
        assert!(strict.validate().is_ok());
        assert!(permissive.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = GuardConfig {
            rate_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: GuardConfig = toml::from_str("rate_limit = 8").unwrap();
        assert_eq!(config.rate_limit, 8);
        assert_eq!(config.usage_limit, 100);
    }
}
