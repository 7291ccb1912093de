//! Evidence items - scored search results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw result as returned by a search provider
///
/// Every field except `url` may be empty; the scorer degrades missing data
/// to neutral defaults rather than rejecting the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResult {
    /// Result title
    pub title: String,
    /// Result URL
    pub url: String,
    /// Text excerpt
    #[serde(default)]
    pub snippet: Option<String>,
    /// Publish date as reported by the provider (free-form)
    #[serde(default)]
    pub publish_date: Option<String>,
}

/// Source category derived from the URL domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// `.gov` domains
    Government,
    /// `.edu` domains and academic repositories
    Academic,
    /// Major news organisations
    Journalism,
    /// Social platforms
    SocialMedia,
    /// Everything else
    Blog,
}

impl SourceType {
    /// Get the source type as a storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Government => "government",
            SourceType::Academic => "academic",
            SourceType::Journalism => "journalism",
            SourceType::SocialMedia => "social_media",
            SourceType::Blog => "blog",
        }
    }

    /// Parse a source type from a storage string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "government" => Some(SourceType::Government),
            "academic" => Some(SourceType::Academic),
            "journalism" => Some(SourceType::Journalism),
            "social_media" => Some(SourceType::SocialMedia),
            "blog" => Some(SourceType::Blog),
            _ => None,
        }
    }

    /// Whether this type can carry primary-source material
    pub fn can_be_primary(&self) -> bool {
        matches!(self, SourceType::Government | SourceType::Academic)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the evidence came into the public record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceType {
    /// No special provenance detected
    Standard,
    /// Released under a freedom-of-information request
    Foia,
    /// Unauthorised disclosure
    Leaked,
    /// Formally declassified
    Declassified,
    /// Sworn testimony or court records
    Testimony,
}

impl ProvenanceType {
    /// Get the provenance type as a storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceType::Standard => "standard",
            ProvenanceType::Foia => "foia",
            ProvenanceType::Leaked => "leaked",
            ProvenanceType::Declassified => "declassified",
            ProvenanceType::Testimony => "testimony",
        }
    }

    /// Parse a provenance type from a storage string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(ProvenanceType::Standard),
            "foia" => Some(ProvenanceType::Foia),
            "leaked" => Some(ProvenanceType::Leaked),
            "declassified" => Some(ProvenanceType::Declassified),
            "testimony" => Some(ProvenanceType::Testimony),
            _ => None,
        }
    }
}

/// One scored, classified piece of evidence
///
/// Created by the scorer, immutable once persisted, owned by one analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    /// Result title
    pub title: String,
    /// Result URL
    pub url: String,
    /// Host name extracted from the URL (None if the URL was malformed)
    pub domain: Option<String>,
    /// Text excerpt (empty if the provider gave none)
    pub snippet: String,
    /// Publish date as reported by the provider
    pub publish_date: Option<String>,
    /// Derived source category
    pub source_type: SourceType,
    /// Composite quality (0-100)
    pub quality_score: u8,
    /// Government/academic item that quotes official material
    pub is_primary: bool,
    /// Detected provenance
    pub provenance_type: ProvenanceType,
}
