//! Configuration for evidence scoring

use serde::{Deserialize, Serialize};

/// Domain lists and term lists used by the scorer
///
/// The weights and step values are fixed; only the vocabularies are
/// configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Substrings identifying academic repositories (academic, 85)
    pub academic_repositories: Vec<String>,

    /// Substrings identifying major news organisations (journalism, 75)
    pub journalism_domains: Vec<String>,

    /// Substrings identifying social platforms (social_media, 30)
    pub social_domains: Vec<String>,

    /// Snippet terms counted as destruction indicators
    pub destruction_terms: Vec<String>,

    /// Snippet phrases that mark government/academic items as primary
    pub primary_indicators: Vec<String>,
}

impl ScorerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let lists = [
            ("academic_repositories", &self.academic_repositories),
            ("journalism_domains", &self.journalism_domains),
            ("social_domains", &self.social_domains),
            ("destruction_terms", &self.destruction_terms),
            ("primary_indicators", &self.primary_indicators),
        ];
        for (name, list) in lists {
            if list.iter().any(|entry| entry.trim().is_empty()) {
                return Err(format!("{} must not contain empty entries", name));
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            academic_repositories: strings(&["arxiv", "pubmed"]),
            journalism_domains: strings(&[
                "nytimes.com",
                "washingtonpost.com",
                "reuters.com",
                "apnews.com",
                "bbc.com",
            ]),
            social_domains: strings(&["twitter.com", "facebook.com", "reddit.com", "tiktok.com"]),
            destruction_terms: strings(&[
                "shredded",
                "redacted",
                "classified",
                "destroyed",
                "withheld",
                "censored",
                "suppressed",
            ]),
            primary_indicators: strings(&[
                "official",
                "statement",
                "press release",
                "document",
                "testimony",
            ]),
        }
    }
}
