//! Integration tests for thirdeye-store
//!
//! These tests verify the persistence cycle for analyses, sources, theories,
//! watermarks and the abuse trail.

use thirdeye_domain::traits::{AnalysisStore, HistoricalEventStore, SourceStore, TheoryStore};
use thirdeye_domain::{
    AnalysisId, AnalysisResult, BiasRating, EvidenceItem, HistoricalEvent, NarrativeAssessment,
    PatternMatch, ProvenanceType, QueryEntry, SourceMetrics, SourceType, TemporalMetrics,
    VerificationOutcome, Watermark, WatermarkCode,
};
use thirdeye_store::{SqliteStore, StoreError};

fn narrative() -> NarrativeAssessment {
    NarrativeAssessment {
        summary: "Documented program with partial overlap".to_string(),
        logical_consistency_score: 65,
        strengths: vec!["Declassified records".to_string()],
        weaknesses: vec!["Few independent sources".to_string()],
        red_flags: vec![],
        investigation_needed: vec!["Church Committee volumes".to_string()],
        reasoning: "Primary sources exist but coverage is thin".to_string(),
    }
}

fn mk_ultra() -> HistoricalEvent {
    HistoricalEvent {
        name: "MK-ULTRA".to_string(),
        code: "MKULTRA".to_string(),
        start_year: 1953,
        revealed_year: 1975,
        pattern_characteristics: ["drug_experiments", "psychological_manipulation"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        government_admission: true,
        evidence_destruction: true,
    }
}

fn evidence(url: &str, domain: Option<&str>) -> EvidenceItem {
    EvidenceItem {
        title: "Report".to_string(),
        url: url.to_string(),
        domain: domain.map(str::to_string),
        snippet: "According to a declassified report".to_string(),
        publish_date: Some("2015-06-01".to_string()),
        source_type: SourceType::Government,
        quality_score: 74,
        is_primary: true,
        provenance_type: ProvenanceType::Declassified,
    }
}

fn pattern(code: &str) -> PatternMatch {
    PatternMatch {
        event_name: "MK-ULTRA".to_string(),
        event_code: code.to_string(),
        similarity_score: 75,
        matching_characteristics: vec!["drug_experiments".to_string()],
        differences: vec!["psychological_manipulation".to_string()],
        temporal_metrics: TemporalMetrics {
            denial_to_admission_years: 22,
            government_admission: true,
            evidence_destruction: true,
        },
    }
}

fn stamp(store: &mut SqliteStore, id: AnalysisId, suffix: &str) -> WatermarkCode {
    let code = WatermarkCode::from_parts("3EV", "20240101", suffix).unwrap();
    store
        .insert_watermark(&Watermark {
            code: code.clone(),
            analysis_id: id,
            created_at: 1000,
        })
        .unwrap();
    code
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_insert_and_get_analysis() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    store.upsert_events(&[mk_ultra()]).unwrap();

    let query_id = store
        .record_query(&QueryEntry {
            actor: "alice".to_string(),
            query_text: "mind control drug experiments".to_string(),
            query_type: "claim".to_string(),
            ip: Some("10.0.0.1".to_string()),
        })
        .unwrap();

    let mut metrics = SourceMetrics::default();
    metrics.bias_distribution.insert(BiasRating::Unknown, 2);

    let result = AnalysisResult::new("alice", "mind control drug experiments", 74, 50, narrative())
        .with_query_id(query_id)
        .with_evidence(
            vec![
                evidence("https://www.cia.gov/readingroom/doc", Some("www.cia.gov")),
                evidence("not a url", None),
            ],
            15,
            0,
        )
        .with_source_metrics(metrics)
        .with_pattern_matches(vec![pattern("MKULTRA")]);

    let skipped = store.insert_analysis(&result).unwrap();
    assert!(skipped.is_empty());

    // Unstamped results are not visible
    assert!(store.get_analysis(result.id).unwrap().is_none());

    let code = stamp(&mut store, result.id, "ABCDEFGHIJKL");
    let record = store.get_analysis(result.id).unwrap().expect("stamped result");

    assert_eq!(record.watermark, code.to_string());
    assert_eq!(record.result, result);
    assert!(record.result.is_consistent());

    // Only the well-formed domain became a source
    assert!(store.get_source("www.cia.gov").unwrap().is_some());
    assert_eq!(store.list_sources(None).unwrap().len(), 1);
}

#[test]
fn test_unknown_event_code_is_skipped() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    store.upsert_events(&[mk_ultra()]).unwrap();

    let result = AnalysisResult::new("bob", "claim", 50, 50, narrative())
        .with_pattern_matches(vec![pattern("MKULTRA"), pattern("RETIRED")]);

    let skipped = store.insert_analysis(&result).unwrap();
    assert_eq!(skipped, vec!["RETIRED".to_string()]);

    stamp(&mut store, result.id, "000000000001");
    let record = store.get_analysis(result.id).unwrap().unwrap();
    assert_eq!(record.result.pattern_matches.len(), 1);
    assert_eq!(record.result.pattern_matches[0].event_code, "MKULTRA");
}

#[test]
fn test_watermark_is_bound_once() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let first = AnalysisResult::new("carol", "a", 50, 50, narrative());
    let second = AnalysisResult::new("carol", "b", 50, 50, narrative());
    store.insert_analysis(&first).unwrap();
    store.insert_analysis(&second).unwrap();

    let code = stamp(&mut store, first.id, "ZZZZZZZZZZZZ");

    // Same code for another result
    let reused = store.insert_watermark(&Watermark {
        code: code.clone(),
        analysis_id: second.id,
        created_at: 1,
    });
    assert!(matches!(reused, Err(StoreError::DuplicateWatermark(_))));

    // Second code for the same result
    let restamp = store.insert_watermark(&Watermark {
        code: WatermarkCode::parse("3EV-20240101-YYYYYYYYYYYY").unwrap(),
        analysis_id: first.id,
        created_at: 1,
    });
    assert!(matches!(restamp, Err(StoreError::DuplicateWatermark(_))));

    let verified = store.verify_watermark(&code).unwrap().unwrap();
    assert_eq!(verified.analysis_id, first.id);

    let unknown = WatermarkCode::parse("3EV-20240101-000000000000").unwrap();
    assert!(store.verify_watermark(&unknown).unwrap().is_none());
}

#[test]
fn test_list_analyses_newest_first_with_pages() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    for i in 1..=5u128 {
        let mut result = AnalysisResult::new("dave", format!("query {}", i), 50, 50, narrative());
        result.id = AnalysisId::from_value(i);
        store.insert_analysis(&result).unwrap();
        stamp(&mut store, result.id, &format!("{:012}", i));
    }
    let mut other = AnalysisResult::new("erin", "not dave", 50, 50, narrative());
    other.id = AnalysisId::from_value(99);
    store.insert_analysis(&other).unwrap();
    stamp(&mut store, other.id, "000000000099");

    let page1 = store.list_analyses("dave", 1, 2).unwrap();
    let page3 = store.list_analyses("dave", 3, 2).unwrap();

    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].query, "query 5");
    assert_eq!(page1[1].query, "query 4");
    assert_eq!(page3.len(), 1);
    assert_eq!(page3[0].query, "query 1");
    assert_eq!(page1[0].watermark, "3EV-20240101-000000000005");

    // Page 0 is treated as the first page
    assert_eq!(store.list_analyses("dave", 0, 2).unwrap(), page1);
}

#[test]
fn test_unstamped_result_is_hidden_from_history() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let mut stamped = AnalysisResult::new("frank", "stamped", 50, 50, narrative());
    stamped.id = AnalysisId::from_value(1);
    store.insert_analysis(&stamped).unwrap();
    stamp(&mut store, stamped.id, "000000000001");

    let mut pending = AnalysisResult::new("frank", "never stamped", 50, 50, narrative());
    pending.id = AnalysisId::from_value(2);
    store.insert_analysis(&pending).unwrap();

    let history = store.list_analyses("frank", 1, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, stamped.id);
    assert!(store.get_analysis(pending.id).unwrap().is_none());
}

#[test]
fn test_theories() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let created = store.create_theory("Project X", "A covert program").unwrap();
    store.create_theory("Project Y", "Another").unwrap();

    assert_eq!(store.get_theory(created.id).unwrap(), Some(created.clone()));
    let all = store.list_theories().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1], created);
}

#[test]
fn test_list_sources_ordered_and_filtered() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    store
        .record_outcome("good.gov", SourceType::Government, VerificationOutcome::Accurate)
        .unwrap();
    store.get_or_create_source("neutral.com", SourceType::Blog).unwrap();
    store
        .record_outcome("bad.com", SourceType::Blog, VerificationOutcome::Inaccurate)
        .unwrap();
    store.set_bias_rating("neutral.com", BiasRating::Center).unwrap();

    let all = store.list_sources(None).unwrap();
    let domains: Vec<_> = all.iter().map(|s| s.domain.as_str()).collect();
    assert_eq!(domains, vec!["good.gov", "neutral.com", "bad.com"]);
    assert_eq!(all[1].bias_rating, BiasRating::Center);

    let credible = store.list_sources(Some(50.0)).unwrap();
    assert_eq!(credible.len(), 2);
}

#[test]
fn test_concurrent_outcomes_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thirdeye.db");
    SqliteStore::new(&path).unwrap();

    const THREADS: usize = 4;
    const UPDATES: usize = 25;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let path = path.clone();
            std::thread::spawn(move || {
                let mut store = SqliteStore::new(&path).unwrap();
                for i in 0..UPDATES {
                    let outcome = if (t + i) % 2 == 0 {
                        VerificationOutcome::Accurate
                    } else {
                        VerificationOutcome::Inaccurate
                    };
                    store
                        .record_outcome("shared.example", SourceType::Journalism, outcome)
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = SqliteStore::new(&path).unwrap();
    let source = store.get_source("shared.example").unwrap().unwrap();
    let total = source.verified_accurate + source.verified_inaccurate;
    assert_eq!(total as usize, THREADS * UPDATES, "no update may be lost");

    let expected = 100.0 * source.verified_accurate as f64 / total as f64;
    assert!((source.credibility_score - expected).abs() < 1e-9);
}
