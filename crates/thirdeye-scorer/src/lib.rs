//! Thirdeye Evidence Scorer
//!
//! Turns raw search results into scored evidence and attributes each item
//! to a durable source credibility profile.
//!
//! # Components
//!
//! - [`EvidenceScorer`]: per-item quality plus batch aggregates
//! - [`SourceTracker`]: credibility aggregation over any [`SourceStore`]
//! - [`DomainClassifier`]: domain to source type rules
//!
//! [`SourceStore`]: thirdeye_domain::traits::SourceStore

#![warn(missing_docs)]

pub mod classify;
pub mod config;
pub mod error;
pub mod evidence;
pub mod tracker;

pub use classify::{extract_domain, DomainClassifier};
pub use config::ScorerConfig;
pub use error::ScorerError;
pub use evidence::{EvidenceBatch, EvidenceScorer, ItemFactors};
pub use tracker::{SourceAssessment, SourceTracker};

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use thirdeye_domain::RawSearchResult;

    fn raw_strategy() -> impl Strategy<Value = RawSearchResult> {
        (
            prop_oneof![
                Just("https://vault.fbi.gov/x".to_string()),
                Just("https://mit.edu/y".to_string()),
                Just("https://www.reuters.com/z".to_string()),
                Just("https://reddit.com/r/a".to_string()),
                Just("https://someblog.net/p".to_string()),
                Just("not a url".to_string()),
            ],
            proptest::option::of(".{0,120}"),
            proptest::option::of(prop_oneof![
                Just("2024-05-01".to_string()),
                Just("2019-01-01".to_string()),
                Just("garbage".to_string()),
            ]),
        )
            .prop_map(|(url, snippet, publish_date)| RawSearchResult {
                title: "t".to_string(),
                url,
                snippet,
                publish_date,
            })
    }

    proptest! {
        #[test]
        fn quality_scores_are_bounded(results in proptest::collection::vec(raw_strategy(), 0..20)) {
            let scorer = EvidenceScorer::new(ScorerConfig::default()).unwrap();
            let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
            let batch = scorer.score_batch_at(&results, now);

            prop_assert_eq!(batch.items.len(), results.len());
            prop_assert!(batch.evidence_quality_score <= 100);
            prop_assert!(batch.corroboration_score <= 100);
            prop_assert!(batch.destruction_indicators as usize <= results.len());
            for item in &batch.items {
                prop_assert!(item.quality_score <= 100);
            }
        }

        #[test]
        fn scoring_is_deterministic(results in proptest::collection::vec(raw_strategy(), 0..10)) {
            let scorer = EvidenceScorer::new(ScorerConfig::default()).unwrap();
            let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
            prop_assert_eq!(scorer.score_batch_at(&results, now), scorer.score_batch_at(&results, now));
        }
    }
}
