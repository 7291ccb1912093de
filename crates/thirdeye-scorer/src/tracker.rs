//! Source credibility tracking
//!
//! Every evidence item is attributed to the durable profile of its domain.
//! New domains are created with neutral credibility. Items without a
//! domain count as neutral and unknown-bias but are never persisted.

use crate::classify::DomainClassifier;
use crate::error::ScorerError;
use std::collections::BTreeMap;
use std::fmt::Display;
use thirdeye_domain::source::NEUTRAL_CREDIBILITY;
use thirdeye_domain::traits::SourceStore;
use thirdeye_domain::{BiasRating, EvidenceItem, Source, SourceMetrics, VerificationOutcome};
use tracing::{debug, info};

/// Credibility aggregate for one batch of evidence
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAssessment {
    /// Rounded mean credibility of the batch's sources (0 if empty)
    pub source_credibility_score: u8,
    /// High/low tallies and bias histogram
    pub metrics: SourceMetrics,
}

impl SourceAssessment {
    fn empty() -> Self {
        Self {
            source_credibility_score: 0,
            metrics: SourceMetrics {
                high_credibility_count: 0,
                low_credibility_count: 0,
                bias_distribution: empty_histogram(),
            },
        }
    }
}

fn empty_histogram() -> BTreeMap<BiasRating, u32> {
    [BiasRating::Left, BiasRating::Right, BiasRating::Center, BiasRating::Unknown]
        .into_iter()
        .map(|b| (b, 0))
        .collect()
}

/// Tracks source credibility across analyses
#[derive(Debug, Clone, Default)]
pub struct SourceTracker {
    classifier: DomainClassifier,
}

impl SourceTracker {
    /// Create a tracker that classifies new domains with `classifier`
    pub fn new(classifier: DomainClassifier) -> Self {
        Self { classifier }
    }

    /// Resolve the profile of every item and aggregate the batch
    ///
    /// Items sharing a domain are each counted, so a domain cited three
    /// times weighs three times in the mean.
    pub fn track_sources<S>(&self, store: &mut S, items: &[EvidenceItem]) -> Result<SourceAssessment, ScorerError>
    where
        S: SourceStore,
        S::Error: Display,
    {
        if items.is_empty() {
            return Ok(SourceAssessment::empty());
        }

        let mut assessment = SourceAssessment::empty();
        let mut total = 0.0;

        for item in items {
            let (credibility, bias) = match &item.domain {
                Some(domain) => {
                    let source = store
                        .get_or_create_source(domain, item.source_type)
                        .map_err(|e| ScorerError::Store(e.to_string()))?;
                    if source.is_high_credibility() {
                        assessment.metrics.high_credibility_count += 1;
                    }
                    if source.is_low_credibility() {
                        assessment.metrics.low_credibility_count += 1;
                    }
                    (source.credibility_score, source.bias_rating)
                }
                None => (NEUTRAL_CREDIBILITY, BiasRating::Unknown),
            };
            total += credibility;
            *assessment.metrics.bias_distribution.entry(bias).or_insert(0) += 1;
        }

        let mean = total / items.len() as f64;
        assessment.source_credibility_score = mean.round().clamp(0.0, 100.0) as u8;

        debug!(
            items = items.len(),
            score = assessment.source_credibility_score,
            high = assessment.metrics.high_credibility_count,
            low = assessment.metrics.low_credibility_count,
            "Tracked sources"
        );
        Ok(assessment)
    }

    /// Record an external verification outcome for a domain
    pub fn record_outcome<S>(
        &self,
        store: &mut S,
        domain: &str,
        outcome: VerificationOutcome,
    ) -> Result<Source, ScorerError>
    where
        S: SourceStore,
        S::Error: Display,
    {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(ScorerError::Store("domain must not be empty".to_string()));
        }
        let (source_type, _) = self.classifier.classify(&domain);
        let source = store
            .record_outcome(&domain, source_type, outcome)
            .map_err(|e| ScorerError::Store(e.to_string()))?;

        info!(
            domain = %source.domain,
            credibility = source.credibility_score,
            accurate = source.verified_accurate,
            inaccurate = source.verified_inaccurate,
            "Recorded verification outcome"
        );
        Ok(source)
    }
}
