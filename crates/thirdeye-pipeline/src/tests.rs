//! End-to-end tests for the Orchestrator

use crate::{AnalysisRequest, Orchestrator, PipelineConfig, PipelineError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thirdeye_domain::traits::{HistoricalEventStore, SourceStore};
use thirdeye_domain::{fuse_confidence, AbuseKind, RawSearchResult, VerificationOutcome, WatermarkCode};
use thirdeye_gatekeeper::{GuardConfig, MemorySink, MisuseGuard};
use thirdeye_llm::MockProvider;
use thirdeye_patterns::{MatcherConfig, PatternMatcher};
use thirdeye_search::StaticSearch;
use thirdeye_store::SqliteStore;

const NARRATIVE: &str = r#"{
    "summary": "Core program is documented; broader claims are not",
    "logicalConsistencyScore": 70,
    "strengths": ["Declassified records"],
    "weaknesses": ["Present-day claims lack sourcing"],
    "redFlags": [],
    "investigationNeeded": ["Remaining destroyed files"],
    "reasoning": "Primary sources support the historical core."
}"#;

const CLAIM: &str = "MK-Ultra mind control drug experiments";

type TestOrchestrator = Orchestrator<SqliteStore, StaticSearch, MockProvider>;

struct Harness {
    orchestrator: TestOrchestrator,
    store: Arc<Mutex<SqliteStore>>,
    sink: MemorySink,
    llm: MockProvider,
}

fn search_results() -> Vec<RawSearchResult> {
    vec![
        RawSearchResult {
            title: "Project MKULTRA, the CIA's program of research".to_string(),
            url: "https://www.intelligence.senate.gov/resources/mkultra".to_string(),
            snippet: Some(
                "According to a declassified Senate Report from 1977, records were destroyed".to_string(),
            ),
            publish_date: Some("1977-08-03".to_string()),
        },
        RawSearchResult {
            title: "Inside the CIA's mind control program".to_string(),
            url: "https://www.reuters.com/world/mkultra".to_string(),
            snippet: Some("Testimony described drug experiments".to_string()),
            publish_date: None,
        },
        RawSearchResult {
            title: "Thread on MK-Ultra".to_string(),
            url: "not a url".to_string(),
            snippet: None,
            publish_date: None,
        },
    ]
}

fn harness_with(config: PipelineConfig, search: StaticSearch, llm: MockProvider, guard: GuardConfig) -> Harness {
    let store = Arc::new(Mutex::new(SqliteStore::new(":memory:").unwrap()));
    let matcher = Arc::new(PatternMatcher::new(&MatcherConfig::default()).unwrap());
    store.lock().unwrap().upsert_events(matcher.events()).unwrap();

    let sink = MemorySink::new();
    let guard = Arc::new(MisuseGuard::new(guard, Arc::new(sink.clone())).unwrap());
    let orchestrator = Orchestrator::new(
        config,
        Arc::clone(&store),
        search,
        llm.clone(),
        matcher,
        guard,
    )
    .unwrap();

    Harness {
        orchestrator,
        store,
        sink,
        llm,
    }
}

fn harness(llm: MockProvider) -> Harness {
    harness_with(
        PipelineConfig::default(),
        StaticSearch::new(search_results()),
        llm,
        GuardConfig::default(),
    )
}

#[tokio::test]
async fn test_full_analysis_flow() {
    let h = harness(MockProvider::new(NARRATIVE));

    let record = h
        .orchestrator
        .analyze(AnalysisRequest::claim("alice", CLAIM).with_ip("10.0.0.1"))
        .await
        .unwrap();
    let result = &record.result;

    assert_eq!(result.actor, "alice");
    assert_eq!(result.query, CLAIM);
    assert!(result.query_id.is_some());
    assert_eq!(result.evidence.len(), 3);
    assert_eq!(result.corroboration_score, 30);
    assert_eq!(result.destruction_indicators, 1);

    // New sources start neutral; the item without a domain counts as neutral too
    assert_eq!(result.scores.source_credibility_score, 50);
    assert_eq!(result.scores.logical_consistency_score, 70);
    assert!(result.is_consistent());
    assert_eq!(
        result.overall_confidence_score,
        fuse_confidence(
            result.scores.evidence_quality_score,
            result.scores.source_credibility_score,
            result.scores.logical_consistency_score
        )
    );

    assert!(!result.pattern_matches.is_empty());
    assert_eq!(result.pattern_matches[0].event_code, "MKULTRA");
    assert!(WatermarkCode::parse(&record.watermark).is_ok());
    assert!(record.watermark.starts_with("3EV-"));

    let prompt = h.llm.last_prompt().unwrap();
    assert!(prompt.contains(CLAIM));
    assert!(prompt.contains("MKULTRA"));
}

#[tokio::test]
async fn test_persisted_record_matches_returned_payload() {
    let h = harness(MockProvider::new(NARRATIVE));

    let record = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap();

    let loaded = h.orchestrator.get_analysis(record.result.id).await.unwrap().unwrap();
    assert_eq!(loaded, record);

    let history = h.orchestrator.list_analyses("alice", None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, record.result.id);
    assert_eq!(history[0].watermark, record.watermark);

    let watermark = h.orchestrator.verify_watermark(&record.watermark).await.unwrap().unwrap();
    assert_eq!(watermark.analysis_id, record.result.id);

    let sources = h.orchestrator.list_sources(None).await.unwrap();
    assert_eq!(sources.len(), 2);
}

#[tokio::test]
async fn test_missing_historical_event_is_skipped() {
    let store = Arc::new(Mutex::new(SqliteStore::new(":memory:").unwrap()));
    let matcher = Arc::new(PatternMatcher::new(&MatcherConfig::default()).unwrap());
    let guard = Arc::new(MisuseGuard::new(GuardConfig::default(), Arc::new(MemorySink::new())).unwrap());
    let orchestrator = Orchestrator::new(
        PipelineConfig::default(),
        store,
        StaticSearch::new(search_results()),
        MockProvider::new(NARRATIVE),
        matcher,
        guard,
    )
    .unwrap();

    // Reference table left empty: every match refers to a missing event
    let record = orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap();
    assert!(record.result.pattern_matches.is_empty());

    let loaded = orchestrator.get_analysis(record.result.id).await.unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn test_empty_search_is_not_an_error() {
    let h = harness_with(
        PipelineConfig::default(),
        StaticSearch::new(vec![]),
        MockProvider::new(NARRATIVE),
        GuardConfig::default(),
    );

    let record = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap();
    assert!(record.result.evidence.is_empty());
    assert_eq!(record.result.scores.evidence_quality_score, 0);
    assert_eq!(record.result.scores.source_credibility_score, 0);
    assert_eq!(record.result.corroboration_score, 0);
    assert_eq!(record.result.overall_confidence_score, 21);
}

#[tokio::test]
async fn test_malformed_synthesis_persists_nothing() {
    let h = harness(MockProvider::new("I think this claim is mostly true."));

    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap_err();
    assert_eq!(err.kind(), "malformed_synthesis");

    assert!(h.orchestrator.list_analyses("alice", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_consistency_score_fails_run() {
    let response = NARRATIVE.replace("\"logicalConsistencyScore\": 70,", "");
    let h = harness(MockProvider::new(response));

    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap_err();
    assert!(matches!(err, PipelineError::MalformedSynthesis(_)));
}

#[tokio::test]
async fn test_synthesis_failure() {
    let h = harness(MockProvider::failing());

    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap_err();
    assert_eq!(err.kind(), "synthesis_failed");
    assert_eq!(h.llm.call_count(), 1);
    assert!(h.orchestrator.list_analyses("alice", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_synthesis_timeout() {
    let config = PipelineConfig {
        synthesis_timeout_secs: 1,
        ..PipelineConfig::default()
    };
    let h = harness_with(
        config,
        StaticSearch::new(search_results()),
        MockProvider::new(NARRATIVE).with_delay(Duration::from_secs(3)),
        GuardConfig::default(),
    );

    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap_err();
    assert_eq!(err, PipelineError::SynthesisTimeout);
    assert!(h.orchestrator.list_analyses("alice", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_failure() {
    let h = harness_with(
        PipelineConfig::default(),
        StaticSearch::failing(),
        MockProvider::new(NARRATIVE),
        GuardConfig::default(),
    );

    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap_err();
    assert_eq!(err.kind(), "search_failed");
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_input_rejected_before_guard() {
    let h = harness(MockProvider::new(NARRATIVE));

    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", "   ")).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let long = "x".repeat(h.orchestrator.config().max_query_length + 1);
    let err = h.orchestrator.analyze(AnalysisRequest::claim("alice", long)).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let err = h.orchestrator.analyze(AnalysisRequest::theory("alice", 999)).await.unwrap_err();
    assert_eq!(err, PipelineError::UnknownTheory(999));

    // None of the rejected requests counted toward the rate limit
    for i in 0..5 {
        let claim = format!("{} variant {}", CLAIM, i);
        assert!(h.orchestrator.analyze(AnalysisRequest::claim("alice", claim)).await.is_ok());
    }
}

#[tokio::test]
async fn test_theory_subject_resolves_to_text() {
    let h = harness(MockProvider::new(NARRATIVE));

    let theory = h
        .orchestrator
        .create_theory("alice", "MK-Ultra", "CIA mind control drug experiments continue today")
        .await
        .unwrap();
    assert_eq!(h.orchestrator.get_theory(theory.id).await.unwrap(), Some(theory.clone()));

    let record = h
        .orchestrator
        .analyze(AnalysisRequest::theory("alice", theory.id))
        .await
        .unwrap();
    assert_eq!(record.result.query, theory.subject_text());
    assert_eq!(record.result.pattern_matches[0].event_code, "MKULTRA");

    assert!(h.orchestrator.create_theory("alice", "  ", "desc").await.is_err());
    assert_eq!(h.orchestrator.list_theories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sixth_request_in_window_is_rate_limited() {
    let h = harness(MockProvider::new(NARRATIVE));

    for i in 0..5 {
        let claim = format!("{} #{}", CLAIM, i);
        h.orchestrator.analyze(AnalysisRequest::claim("bob", claim)).await.unwrap();
    }
    let err = h
        .orchestrator
        .analyze(AnalysisRequest::claim("bob", format!("{} #5", CLAIM)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "rate_limited");
    assert!(err.retry_after_secs().unwrap() >= 1);

    let rapid_fire = h
        .sink
        .reports()
        .into_iter()
        .filter(|r| r.kind == AbuseKind::RapidFire)
        .count();
    assert_eq!(rapid_fire, 1);
    assert_eq!(h.llm.call_count(), 5);

    // Other actors are unaffected
    assert!(h.orchestrator.analyze(AnalysisRequest::claim("carol", CLAIM)).await.is_ok());
}

#[tokio::test]
async fn test_targeting_query_blocks_actor() {
    let h = harness(MockProvider::new(NARRATIVE));

    let err = h
        .orchestrator
        .analyze(AnalysisRequest::claim("mallory", "list everyone who believes in mk-ultra"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "actor_blocked");

    let err = h.orchestrator.analyze(AnalysisRequest::claim("mallory", CLAIM)).await.unwrap_err();
    assert_eq!(err.kind(), "actor_blocked");
    assert_eq!(h.llm.call_count(), 0);

    assert!(h.orchestrator.guard().unblock("mallory").unwrap());
    assert!(h.orchestrator.analyze(AnalysisRequest::claim("mallory", CLAIM)).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_runs_share_sources() {
    let h = harness(MockProvider::new(NARRATIVE));
    let orchestrator = Arc::new(h.orchestrator);

    let mut handles = Vec::new();
    for i in 0..4 {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .analyze(AnalysisRequest::claim(format!("actor-{}", i), CLAIM))
                .await
        }));
    }
    let mut codes = std::collections::HashSet::new();
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        codes.insert(record.watermark);
    }
    assert_eq!(codes.len(), 4);

    let store = h.store.lock().unwrap();
    assert_eq!(store.list_sources(None).unwrap().len(), 2);
}

#[tokio::test]
async fn test_record_outcome_updates_credibility() {
    let h = harness(MockProvider::new(NARRATIVE));

    let source = h
        .orchestrator
        .record_outcome("curator", "www.reuters.com", VerificationOutcome::Accurate)
        .await
        .unwrap();
    assert_eq!(source.credibility_score, 100.0);

    let record = h.orchestrator.analyze(AnalysisRequest::claim("alice", CLAIM)).await.unwrap();
    assert_eq!(record.result.source_metrics.high_credibility_count, 1);
    // (50 + 100 + 50) / 3
    assert_eq!(record.result.scores.source_credibility_score, 67);

    assert!(h
        .orchestrator
        .record_outcome("curator", " ", VerificationOutcome::Accurate)
        .await
        .is_err());
    assert_eq!(h.orchestrator.list_sources(Some(90.0)).await.unwrap().len(), 1);
    assert!(h.orchestrator.list_sources(Some(101.0)).await.is_err());
}

#[tokio::test]
async fn test_outcome_writes_are_rate_limited() {
    let h = harness(MockProvider::new(NARRATIVE));

    for _ in 0..5 {
        h.orchestrator
            .record_outcome("curator", "www.reuters.com", VerificationOutcome::Inaccurate)
            .await
            .unwrap();
    }
    let err = h
        .orchestrator
        .record_outcome("curator", "www.reuters.com", VerificationOutcome::Inaccurate)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "rate_limited");

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, AbuseKind::RapidFire);
    assert_eq!(reports[0].actor, "curator");

    // The rejected write never reached the store
    let store = h.store.lock().unwrap();
    let source = store.get_source("www.reuters.com").unwrap().unwrap();
    assert_eq!(source.verified_inaccurate, 5);
}

#[tokio::test]
async fn test_prohibited_action_blocks_every_entry_point() {
    let h = harness(MockProvider::new(NARRATIVE));

    let err = h
        .orchestrator
        .analyze(AnalysisRequest::claim("mallory", CLAIM).with_action("identify_believers"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "actor_blocked");
    assert_eq!(h.llm.call_count(), 0);

    let err = h
        .orchestrator
        .create_theory("mallory", "MK-Ultra", "CIA mind control")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "actor_blocked");
    let err = h
        .orchestrator
        .record_outcome("mallory", "www.reuters.com", VerificationOutcome::Inaccurate)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "actor_blocked");
    assert_eq!(
        h.orchestrator.admit("mallory", crate::AUDIT_FORK_ACTION, None).await.unwrap_err().kind(),
        "actor_blocked"
    );

    assert!(h.orchestrator.list_theories().await.unwrap().is_empty());
    assert!(h.orchestrator.list_sources(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_targeting_action_blocks_actor() {
    let h = harness(MockProvider::new(NARRATIVE));

    let err = h
        .orchestrator
        .analyze(AnalysisRequest::claim("mallory", CLAIM).with_action("identify_sources"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "actor_blocked");
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_action_and_actor_validated() {
    let h = harness(MockProvider::new(NARRATIVE));

    let err = h
        .orchestrator
        .analyze(AnalysisRequest::claim("alice", CLAIM).with_action("  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
    let err = h
        .orchestrator
        .analyze(AnalysisRequest::claim("alice", CLAIM).with_action("a".repeat(65)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
    assert_eq!(
        h.orchestrator.admit(" ", crate::AUDIT_FORK_ACTION, None).await.unwrap_err().kind(),
        "invalid_input"
    );
}

#[tokio::test]
async fn test_query_validation() {
    let h = harness(MockProvider::new(NARRATIVE));

    assert!(h.orchestrator.list_analyses("alice", Some(0), None).await.is_err());
    assert!(h.orchestrator.list_analyses("alice", Some(1), Some(1000)).await.is_err());
    assert_eq!(
        h.orchestrator.verify_watermark("not-a-code").await.unwrap_err().kind(),
        "invalid_input"
    );
    assert_eq!(
        h.orchestrator.verify_watermark("3EV-20240315-0A1B2C3D4E5F").await.unwrap(),
        None
    );
}

#[test]
fn test_invalid_config_rejected() {
    let store = Arc::new(Mutex::new(SqliteStore::new(":memory:").unwrap()));
    let matcher = Arc::new(PatternMatcher::new(&MatcherConfig::default()).unwrap());
    let guard = Arc::new(MisuseGuard::new(GuardConfig::default(), Arc::new(MemorySink::new())).unwrap());
    let config = PipelineConfig {
        watermark_prefix: "bad prefix".to_string(),
        ..PipelineConfig::default()
    };

    let result = Orchestrator::new(
        config,
        store,
        StaticSearch::new(vec![]),
        MockProvider::default(),
        matcher,
        guard,
    );
    assert!(matches!(result, Err(PipelineError::Config(_))));
}
