//! Evidence quality scoring
//!
//! Each raw search result is scored on four factors:
//!
//! | Factor       | Weight | Source                                      |
//! |--------------|--------|---------------------------------------------|
//! | source type  | 0.4    | domain rules ([`DomainClassifier`])          |
//! | verifiability| 0.3    | names, dates, figures, attribution phrases   |
//! | recency      | 0.2    | step function of days since publish          |
//! | provenance   | 0.1    | FOIA, declassified, testimony, leaked        |
//!
//! A malformed URL, a missing snippet, or an unparseable date degrade the
//! item to neutral defaults. Scoring a batch never fails.

use crate::classify::{extract_domain, DomainClassifier};
use crate::config::ScorerConfig;
use crate::error::ScorerError;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::collections::HashSet;
use thirdeye_domain::confidence::item_quality;
use thirdeye_domain::{EvidenceItem, ProvenanceType, RawSearchResult, SourceType};
use tracing::debug;

/// Recency used when the publish date is missing or unparseable
pub const DEFAULT_RECENCY: u8 = 50;

/// Verifiability before any bonus
pub const BASE_VERIFIABILITY: u8 = 50;

/// Scored batch with its aggregates
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceBatch {
    /// One item per input result, same order
    pub items: Vec<EvidenceItem>,
    /// Rounded mean of unrounded item composites (0 if empty)
    pub evidence_quality_score: u8,
    /// `min(100, 15 * distinct domains)`
    pub corroboration_score: u8,
    /// Items whose snippet mentions a destruction term
    pub destruction_indicators: u32,
}

/// The four factor scores of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFactors {
    /// Base score of the source type
    pub source_type: u8,
    /// Verifiability (50-100)
    pub verifiability: u8,
    /// Recency (40-100)
    pub recency: u8,
    /// Provenance score (50-95)
    pub provenance: u8,
}

impl ItemFactors {
    /// Weighted composite in tenths of a point
    pub fn composite_tenths(&self) -> u32 {
        4 * u32::from(self.source_type)
            + 3 * u32::from(self.verifiability)
            + 2 * u32::from(self.recency)
            + u32::from(self.provenance)
    }

    /// Weighted composite rounded to an integer
    pub fn quality(&self) -> u8 {
        item_quality(self.source_type, self.verifiability, self.recency, self.provenance)
    }
}

/// `min(100, 15 * distinct_domains)`
pub fn corroboration_score(distinct_domains: usize) -> u8 {
    distinct_domains.saturating_mul(15).min(100) as u8
}

/// Provenance type and score, first match wins
///
/// FOIA (90), declassified (95), testimony (85), leaked (60), else standard (50).
pub fn detect_provenance(snippet: &str) -> (ProvenanceType, u8) {
    let lower = snippet.to_lowercase();
    if lower.contains("foia") || lower.contains("freedom of information") {
        (ProvenanceType::Foia, 90)
    } else if lower.contains("declassified") {
        (ProvenanceType::Declassified, 95)
    } else if lower.contains("testimony") || lower.contains("court document") {
        (ProvenanceType::Testimony, 85)
    } else if lower.contains("leaked") || lower.contains("whistleblower") {
        (ProvenanceType::Leaked, 60)
    } else {
        (ProvenanceType::Standard, 50)
    }
}

/// Parse a provider publish date in any of the common formats
pub fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const DATE_FORMATS: [&str; 6] = ["%Y-%m-%d", "%Y/%m/%d", "%b %d, %Y", "%B %d, %Y", "%d %B %Y", "%d %b %Y"];
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}

/// Step function of age in days: <30 100, <180 85, <365 70, <730 55, else 40
pub fn recency_score(publish_date: Option<&str>, now: DateTime<Utc>) -> u8 {
    let Some(published) = publish_date.and_then(parse_publish_date) else {
        return DEFAULT_RECENCY;
    };
    let days = (now - published).num_seconds() as f64 / 86_400.0;
    match days {
        d if d < 30.0 => 100,
        d if d < 180.0 => 85,
        d if d < 365.0 => 70,
        d if d < 730.0 => 55,
        _ => 40,
    }
}

/// Scores raw search results into evidence items
#[derive(Debug, Clone)]
pub struct EvidenceScorer {
    classifier: DomainClassifier,
    destruction_terms: Vec<String>,
    primary_indicators: Vec<String>,
    proper_noun: Regex,
    year: Regex,
    month: Regex,
    figure: Regex,
}

impl EvidenceScorer {
    /// Create a scorer from configuration
    pub fn new(config: ScorerConfig) -> Result<Self, ScorerError> {
        config.validate().map_err(ScorerError::Config)?;

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScorerError::Pattern(format!("{}: {}", pattern, e)))
        };

        Ok(Self {
            classifier: DomainClassifier::new(&config),
            destruction_terms: config.destruction_terms.iter().map(|t| t.to_lowercase()).collect(),
            primary_indicators: config.primary_indicators.iter().map(|t| t.to_lowercase()).collect(),
            proper_noun: compile(r"[A-Z][a-z]+ [A-Z][a-z]+")?,
            year: compile(r"\d{4}")?,
            month: compile(
                r"January|February|March|April|May|June|July|August|September|October|November|December",
            )?,
            figure: compile(r"\d+%|\$\d+")?,
        })
    }

    /// Domain classifier used by this scorer
    pub fn classifier(&self) -> &DomainClassifier {
        &self.classifier
    }

    /// Verifiability: 50 plus bonuses, capped at 100
    ///
    /// +15 two-word proper noun, +10 year or month name, +10 percentage or
    /// currency figure, +15 attribution phrase.
    pub fn verifiability(&self, snippet: &str) -> u8 {
        let mut score = u32::from(BASE_VERIFIABILITY);
        if self.proper_noun.is_match(snippet) {
            score += 15;
        }
        if self.year.is_match(snippet) || self.month.is_match(snippet) {
            score += 10;
        }
        if self.figure.is_match(snippet) {
            score += 10;
        }
        let lower = snippet.to_lowercase();
        if ["according to", "study", "research", "report", "document"]
            .iter()
            .any(|p| lower.contains(p))
        {
            score += 15;
        }
        score.min(100) as u8
    }

    /// Government/academic item whose snippet quotes official material
    pub fn is_primary(&self, snippet: &str, source_type: SourceType) -> bool {
        if !source_type.can_be_primary() {
            return false;
        }
        let lower = snippet.to_lowercase();
        self.primary_indicators.iter().any(|ind| lower.contains(ind.as_str()))
    }

    /// Whether the snippet mentions destroyed or withheld material
    pub fn mentions_destruction(&self, snippet: &str) -> bool {
        let lower = snippet.to_lowercase();
        self.destruction_terms.iter().any(|t| lower.contains(t.as_str()))
    }

    /// Score one result against a fixed clock
    pub fn score_item_at(&self, result: &RawSearchResult, now: DateTime<Utc>) -> (EvidenceItem, ItemFactors) {
        let domain = extract_domain(&result.url);
        let snippet = result.snippet.clone().unwrap_or_default();
        let (source_type, source_score) = self.classifier.classify_opt(domain.as_deref());
        let (provenance_type, provenance_score) = detect_provenance(&snippet);

        let factors = ItemFactors {
            source_type: source_score,
            verifiability: self.verifiability(&snippet),
            recency: recency_score(result.publish_date.as_deref(), now),
            provenance: provenance_score,
        };

        let item = EvidenceItem {
            title: result.title.clone(),
            url: result.url.clone(),
            is_primary: self.is_primary(&snippet, source_type),
            domain,
            snippet,
            publish_date: result.publish_date.clone(),
            source_type,
            quality_score: factors.quality(),
            provenance_type,
        };
        (item, factors)
    }

    /// Score a batch against the current time
    pub fn score_batch(&self, results: &[RawSearchResult]) -> EvidenceBatch {
        self.score_batch_at(results, Utc::now())
    }

    /// Score a batch against a fixed clock
    pub fn score_batch_at(&self, results: &[RawSearchResult], now: DateTime<Utc>) -> EvidenceBatch {
        let mut items = Vec::with_capacity(results.len());
        let mut total_tenths: u64 = 0;
        let mut domains = HashSet::new();
        let mut destruction_indicators = 0;

        for result in results {
            let (item, factors) = self.score_item_at(result, now);
            total_tenths += u64::from(factors.composite_tenths());
            if let Some(domain) = &item.domain {
                domains.insert(domain.clone());
            }
            if self.mentions_destruction(&item.snippet) {
                destruction_indicators += 1;
            }
            items.push(item);
        }

        // Half-up rounding of total_tenths / (10 * n)
        let n = items.len() as u64;
        let evidence_quality_score = if n == 0 {
            0
        } else {
            ((total_tenths + 5 * n) / (10 * n)).min(100) as u8
        };

        debug!(
            items = items.len(),
            distinct_domains = domains.len(),
            evidence_quality_score,
            "Scored evidence batch"
        );

        EvidenceBatch {
            items,
            evidence_quality_score,
            corroboration_score: corroboration_score(domains.len()),
            destruction_indicators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scorer() -> EvidenceScorer {
        EvidenceScorer::new(ScorerConfig::default()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn raw(url: &str, snippet: Option<&str>, date: Option<&str>) -> RawSearchResult {
        RawSearchResult {
            title: "Title".to_string(),
            url: url.to_string(),
            snippet: snippet.map(str::to_string),
            publish_date: date.map(str::to_string),
        }
    }

    #[test]
    fn test_declassified_gov_item() {
        let snippet = "According to a declassified FBI report from 2015, surveillance of activists was ongoing";
        let (item, factors) = scorer().score_item_at(&raw("https://vault.fbi.gov/doc", Some(snippet), Some("2015-03-01")), now());

        assert_eq!(item.source_type, SourceType::Government);
        assert_eq!(factors.source_type, 85);
        assert_eq!(item.provenance_type, ProvenanceType::Declassified);
        assert_eq!(factors.provenance, 95);
        assert_eq!(factors.verifiability, 75);
        assert_eq!(factors.recency, 40);
        // 0.4*85 + 0.3*75 + 0.2*40 + 0.1*95 = 74
        assert_eq!(item.quality_score, 74);
        assert!(!item.is_primary);
    }

    #[test]
    fn test_verifiability_bonuses() {
        let s = scorer();
        assert_eq!(s.verifiability(""), 50);
        assert_eq!(s.verifiability("John Smith said"), 65);
        assert_eq!(s.verifiability("in March"), 60);
        assert_eq!(s.verifiability("up 40%"), 60);
        assert_eq!(s.verifiability("cost $500"), 60);
        assert_eq!(s.verifiability("a STUDY found"), 65);
        assert_eq!(
            s.verifiability("According to John Smith, in 1975 the agency spent $20 million"),
            100
        );
    }

    #[test]
    fn test_recency_steps() {
        let now = now();
        assert_eq!(recency_score(Some("2024-05-20"), now), 100);
        assert_eq!(recency_score(Some("2024-01-15"), now), 85);
        assert_eq!(recency_score(Some("2023-09-01"), now), 70);
        assert_eq!(recency_score(Some("2022-12-01"), now), 55);
        assert_eq!(recency_score(Some("2010-01-01"), now), 40);
        assert_eq!(recency_score(None, now), DEFAULT_RECENCY);
        assert_eq!(recency_score(Some("3 days ago"), now), DEFAULT_RECENCY);
    }

    #[test]
    fn test_date_formats() {
        assert!(parse_publish_date("2024-05-20T10:00:00Z").is_some());
        assert!(parse_publish_date("Mon, 20 May 2024 10:00:00 +0000").is_some());
        assert!(parse_publish_date("Jan 2, 2020").is_some());
        assert!(parse_publish_date("January 2, 2020").is_some());
        assert!(parse_publish_date("").is_none());
    }

    #[test]
    fn test_provenance_priority() {
        assert_eq!(detect_provenance("FOIA release of declassified files").0, ProvenanceType::Foia);
        assert_eq!(detect_provenance("declassified leaked memo").0, ProvenanceType::Declassified);
        assert_eq!(detect_provenance("court document from a whistleblower").0, ProvenanceType::Testimony);
        assert_eq!(detect_provenance("whistleblower account"), (ProvenanceType::Leaked, 60));
        assert_eq!(detect_provenance("nothing special"), (ProvenanceType::Standard, 50));
    }

    #[test]
    fn test_primary_requires_gov_or_academic() {
        let s = scorer();
        assert!(s.is_primary("Official statement issued", SourceType::Government));
        assert!(s.is_primary("press release", SourceType::Academic));
        assert!(!s.is_primary("Official statement issued", SourceType::Journalism));
        assert!(!s.is_primary("opinion piece", SourceType::Government));
    }

    #[test]
    fn test_malformed_url_degrades() {
        let (item, factors) = scorer().score_item_at(&raw("::not a url::", None, None), now());
        assert_eq!(item.domain, None);
        assert_eq!(item.source_type, SourceType::Blog);
        assert_eq!(item.snippet, "");
        assert_eq!(factors, ItemFactors { source_type: 40, verifiability: 50, recency: 50, provenance: 50 });
        // 16 + 15 + 10 + 5
        assert_eq!(item.quality_score, 46);
    }

    #[test]
    fn test_batch_aggregates() {
        let results = vec![
            raw("https://a.gov/1", Some("records were shredded"), None),
            raw("https://a.gov/2", Some("REDACTED pages"), None),
            raw("https://b.edu/x", Some("plain"), None),
            raw("bad url", Some("plain"), None),
        ];
        let batch = scorer().score_batch_at(&results, now());

        assert_eq!(batch.items.len(), 4);
        assert_eq!(batch.corroboration_score, 30);
        assert_eq!(batch.destruction_indicators, 2);
    }

    #[test]
    fn test_aggregate_uses_unrounded_composites() {
        // Two blog items with composite 46.0 and one .gov item with 0.4*85+15+10+5 = 64.0
        // plus one journalism item 0.4*75+15+10+5 = 60.0 => mean 54.0
        let results = vec![
            raw("https://x.blog/1", None, None),
            raw("https://y.blog/2", None, None),
            raw("https://z.gov/3", None, None),
            raw("https://www.bbc.com/4", None, None),
        ];
        let batch = scorer().score_batch_at(&results, now());
        assert_eq!(batch.evidence_quality_score, 54);
    }

    #[test]
    fn test_empty_batch() {
        let batch = scorer().score_batch_at(&[], now());
        assert_eq!(batch.evidence_quality_score, 0);
        assert_eq!(batch.corroboration_score, 0);
        assert_eq!(batch.destruction_indicators, 0);
    }

    #[test]
    fn test_corroboration_cap() {
        assert_eq!(corroboration_score(3), 45);
        assert_eq!(corroboration_score(10), 100);
        assert_eq!(corroboration_score(0), 0);
    }
}
