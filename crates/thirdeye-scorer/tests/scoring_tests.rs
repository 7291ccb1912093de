//! Scoring and tracking against a real SQLite source store

use chrono::{TimeZone, Utc};
use thirdeye_domain::traits::SourceStore;
use thirdeye_domain::{BiasRating, RawSearchResult, VerificationOutcome};
use thirdeye_scorer::{EvidenceScorer, ScorerConfig, SourceTracker};
use thirdeye_store::SqliteStore;

fn raw(url: &str, snippet: &str) -> RawSearchResult {
    RawSearchResult {
        title: "Result".to_string(),
        url: url.to_string(),
        snippet: Some(snippet.to_string()),
        publish_date: Some("2015-03-01".to_string()),
    }
}

#[test]
fn test_score_then_track_persists_sources() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let scorer = EvidenceScorer::new(ScorerConfig::default()).unwrap();
    let tracker = SourceTracker::new(scorer.classifier().clone());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let batch = scorer.score_batch_at(
        &[
            raw("https://vault.fbi.gov/a", "According to a declassified FBI report from 2015"),
            raw("https://www.reuters.com/b", "Files were shredded"),
            raw("garbage", "nothing"),
        ],
        now,
    );
    assert_eq!(batch.corroboration_score, 30);
    assert_eq!(batch.destruction_indicators, 1);

    let assessment = tracker.track_sources(&mut store, &batch.items).unwrap();
    assert_eq!(assessment.source_credibility_score, 50);
    assert_eq!(assessment.metrics.bias_distribution[&BiasRating::Unknown], 3);

    let sources = store.list_sources(None).unwrap();
    assert_eq!(sources.len(), 2);
    assert!(store.get_source("vault.fbi.gov").unwrap().is_some());
}

#[test]
fn test_outcomes_move_credibility_and_bias_counts() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let tracker = SourceTracker::default();

    tracker.record_outcome(&mut store, "vault.fbi.gov", VerificationOutcome::Accurate).unwrap();
    tracker.record_outcome(&mut store, "vault.fbi.gov", VerificationOutcome::Accurate).unwrap();
    tracker.record_outcome(&mut store, "rumors.blog", VerificationOutcome::Inaccurate).unwrap();
    store.set_bias_rating("rumors.blog", BiasRating::Right).unwrap();

    let scorer = EvidenceScorer::new(ScorerConfig::default()).unwrap();
    let batch = scorer.score_batch(&[raw("https://vault.fbi.gov/x", "doc"), raw("https://rumors.blog/y", "post")]);
    let assessment = tracker.track_sources(&mut store, &batch.items).unwrap();

    assert_eq!(assessment.source_credibility_score, 50);
    assert_eq!(assessment.metrics.high_credibility_count, 1);
    assert_eq!(assessment.metrics.low_credibility_count, 1);
    assert_eq!(assessment.metrics.bias_distribution[&BiasRating::Right], 1);
    assert_eq!(assessment.metrics.bias_distribution[&BiasRating::Unknown], 1);
}
