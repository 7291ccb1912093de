//! Confidence fusion orchestrator
//!
//! One run: resolve the subject, pass the guard, log the query, score
//! evidence and match patterns concurrently, synthesize the narrative,
//! fuse, persist and stamp.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::parser::parse_narrative;
use crate::prompt::NarrativePrompt;
use crate::types::AnalysisRequest;
use crate::watermark::WatermarkGenerator;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use thirdeye_domain::traits::{AnalysisStore, LlmProvider, SearchProvider, SourceStore, TheoryStore};
use thirdeye_domain::{
    unix_now, AnalysisId, AnalysisRecord, AnalysisResult, AnalysisSubject, AnalysisSummary,
    NarrativeAssessment, QueryEntry, RawSearchResult, Source, Theory, VerificationOutcome,
    Watermark, WatermarkCode,
};
use thirdeye_gatekeeper::MisuseGuard;
use thirdeye_patterns::PatternMatcher;
use thirdeye_scorer::{EvidenceScorer, SourceTracker};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Action name the guard sees for analysis runs
pub const ANALYZE_ACTION: &str = "analyze";

/// Action name the guard sees for verification outcomes
pub const RECORD_OUTCOME_ACTION: &str = "record_outcome";

/// Action name the guard sees for new theories
pub const CREATE_THEORY_ACTION: &str = "create_theory";

/// Action name the guard sees for fork audits
pub const AUDIT_FORK_ACTION: &str = "audit_fork";

/// Longest action name a caller may declare
const MAX_ACTION_LENGTH: usize = 64;

/// Attempts at drawing an unused watermark code
const MAX_STAMP_ATTEMPTS: usize = 3;

/// The Orchestrator turns a claim into a fused, watermarked analysis
pub struct Orchestrator<St, Se, L>
where
    St: AnalysisStore + SourceStore + TheoryStore,
    Se: SearchProvider,
    L: LlmProvider,
{
    store: Arc<Mutex<St>>,
    search_provider: Arc<Se>,
    llm_provider: Arc<L>,
    scorer: Arc<EvidenceScorer>,
    tracker: Arc<SourceTracker>,
    matcher: Arc<PatternMatcher>,
    guard: Arc<MisuseGuard>,
    watermarks: WatermarkGenerator,
    config: PipelineConfig,
}

impl<St, Se, L> Orchestrator<St, Se, L>
where
    St: AnalysisStore + SourceStore + TheoryStore + Send + 'static,
    <St as AnalysisStore>::Error: Display,
    <St as SourceStore>::Error: Display,
    <St as TheoryStore>::Error: Display,
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a new Orchestrator
    ///
    /// `store` may be shared with other users of the same connection, such
    /// as the guard's abuse-report sink.
    pub fn new(
        config: PipelineConfig,
        store: Arc<Mutex<St>>,
        search_provider: Se,
        llm_provider: L,
        matcher: Arc<PatternMatcher>,
        guard: Arc<MisuseGuard>,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        let scorer = EvidenceScorer::new(config.scorer.clone())
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let tracker = SourceTracker::new(scorer.classifier().clone());
        let watermarks =
            WatermarkGenerator::new(config.watermark_prefix.clone()).map_err(PipelineError::Config)?;

        Ok(Self {
            store,
            search_provider: Arc::new(search_provider),
            llm_provider: Arc::new(llm_provider),
            scorer: Arc::new(scorer),
            tracker: Arc::new(tracker),
            matcher,
            guard,
            watermarks,
            config,
        })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The misuse guard gating every run
    pub fn guard(&self) -> &Arc<MisuseGuard> {
        &self.guard
    }

    /// The historical pattern matcher
    pub fn matcher(&self) -> &Arc<PatternMatcher> {
        &self.matcher
    }

    /// Run the full pipeline for one request
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisRecord, PipelineError> {
        let AnalysisRequest {
            subject,
            actor,
            ip,
            action,
        } = request;
        let actor = actor.trim().to_string();
        if actor.is_empty() {
            return Err(PipelineError::InvalidInput("actor must not be empty".to_string()));
        }
        let action = action.trim();
        if action.is_empty() || action.chars().count() > MAX_ACTION_LENGTH {
            return Err(PipelineError::InvalidInput(format!(
                "action must be 1-{} chars",
                MAX_ACTION_LENGTH
            )));
        }
        let query_type = subject.query_type();
        let query = self.resolve_subject(subject).await?;

        self.admit(&actor, action, Some(&query)).await?;

        info!(
            actor = %actor,
            query_type,
            query_len = query.chars().count(),
            "Starting analysis"
        );

        let entry = QueryEntry {
            actor: actor.clone(),
            query_text: query.clone(),
            query_type: query_type.to_string(),
            ip,
        };
        let query_id = self
            .with_store(move |store| store.record_query(&entry).map_err(storage_error))
            .await?;

        let scoring = async {
            let results = self.search(&query).await?;
            let batch = self.scorer.score_batch(&results);
            let items = batch.items.clone();
            let tracker = Arc::clone(&self.tracker);
            let assessment = self
                .with_store(move |store| {
                    tracker
                        .track_sources(store, &items)
                        .map_err(|e| PipelineError::StorageFailed(e.to_string()))
                })
                .await?;
            Ok::<_, PipelineError>((batch, assessment))
        };
        let matching = async {
            let matcher = Arc::clone(&self.matcher);
            let claim = query.clone();
            tokio::task::spawn_blocking(move || matcher.match_claim(&claim))
                .await
                .map_err(join_error)
        };
        let ((batch, assessment), matches) = tokio::try_join!(scoring, matching)?;

        debug!(
            evidence = batch.items.len(),
            evidence_quality = batch.evidence_quality_score,
            source_credibility = assessment.source_credibility_score,
            matches = matches.len(),
            "Scoring complete"
        );

        let prompt = NarrativePrompt::new(&query, &batch, &assessment, &matches)
            .with_evidence_limit(self.config.prompt_evidence_limit)
            .build();
        let narrative = self.synthesize(&prompt).await?;

        let result = AnalysisResult::new(
            actor.clone(),
            query,
            batch.evidence_quality_score,
            assessment.source_credibility_score,
            narrative,
        )
        .with_query_id(query_id)
        .with_evidence(batch.items, batch.corroboration_score, batch.destruction_indicators)
        .with_source_metrics(assessment.metrics)
        .with_pattern_matches(matches);

        let generator = self.watermarks.clone();
        let (result, watermark) = self
            .with_store(move |store| {
                let mut result = result;
                let skipped = store.insert_analysis(&result).map_err(storage_error)?;
                if !skipped.is_empty() {
                    warn!(
                        analysis_id = %result.id,
                        codes = ?skipped,
                        "Skipped pattern matches for missing historical events"
                    );
                    result.pattern_matches.retain(|m| !skipped.contains(&m.event_code));
                }
                let watermark = stamp(store, &generator, result.id)?;
                Ok((result, watermark))
            })
            .await?;

        info!(
            analysis_id = %result.id,
            actor = %actor,
            overall = result.overall_confidence_score,
            watermark = %watermark.code,
            "Analysis complete"
        );

        Ok(AnalysisRecord {
            result,
            watermark: watermark.code.to_string(),
        })
    }

    /// Load a persisted, watermarked analysis
    pub async fn get_analysis(&self, id: AnalysisId) -> Result<Option<AnalysisRecord>, PipelineError> {
        self.with_store(move |store| store.get_analysis(id).map_err(storage_error))
            .await
    }

    /// One page of an actor's history, newest first
    ///
    /// `page` starts at 1; `per_page` defaults to the configured page size.
    pub async fn list_analyses(
        &self,
        actor: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Vec<AnalysisSummary>, PipelineError> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(self.config.default_page_size);
        if page == 0 {
            return Err(PipelineError::InvalidInput("page starts at 1".to_string()));
        }
        if per_page == 0 || per_page > self.config.max_page_size {
            return Err(PipelineError::InvalidInput(format!(
                "per_page must be between 1 and {}",
                self.config.max_page_size
            )));
        }
        let actor = actor.to_string();
        self.with_store(move |store| {
            store
                .list_analyses(&actor, page, per_page)
                .map_err(storage_error)
        })
        .await
    }

    /// Look up a watermark; malformed codes are invalid input
    pub async fn verify_watermark(&self, code: &str) -> Result<Option<Watermark>, PipelineError> {
        let code = WatermarkCode::parse(code.trim()).map_err(PipelineError::InvalidInput)?;
        self.with_store(move |store| store.verify_watermark(&code).map_err(storage_error))
            .await
    }

    /// Apply an external verification outcome to a source
    pub async fn record_outcome(
        &self,
        actor: &str,
        domain: &str,
        outcome: VerificationOutcome,
    ) -> Result<Source, PipelineError> {
        if domain.trim().is_empty() {
            return Err(PipelineError::InvalidInput("domain must not be empty".to_string()));
        }
        self.admit(actor, RECORD_OUTCOME_ACTION, None).await?;

        let domain = domain.to_string();
        let tracker = Arc::clone(&self.tracker);
        self.with_store(move |store| {
            tracker
                .record_outcome(store, &domain, outcome)
                .map_err(|e| PipelineError::StorageFailed(e.to_string()))
        })
        .await
    }

    /// Sources ordered by credibility, optionally above a floor
    pub async fn list_sources(&self, min_credibility: Option<f64>) -> Result<Vec<Source>, PipelineError> {
        if let Some(min) = min_credibility {
            if !min.is_finite() || !(0.0..=100.0).contains(&min) {
                return Err(PipelineError::InvalidInput(format!(
                    "min_credibility must be within 0-100, got {}",
                    min
                )));
            }
        }
        self.with_store(move |store| store.list_sources(min_credibility).map_err(storage_error))
            .await
    }

    /// Store a theory for later analysis
    pub async fn create_theory(
        &self,
        actor: &str,
        title: &str,
        description: &str,
    ) -> Result<Theory, PipelineError> {
        let title = title.trim().to_string();
        let description = description.trim().to_string();
        if title.is_empty() {
            return Err(PipelineError::InvalidInput("title must not be empty".to_string()));
        }
        let length = title.chars().count() + description.chars().count() + 2;
        if length > self.config.max_query_length {
            return Err(PipelineError::InvalidInput(format!(
                "theory too long: {} chars (max: {})",
                length, self.config.max_query_length
            )));
        }
        let text = format!("{}: {}", title, description);
        self.admit(actor, CREATE_THEORY_ACTION, Some(&text)).await?;

        let theory = self
            .with_store(move |store| store.create_theory(&title, &description).map_err(storage_error))
            .await?;
        info!(theory_id = theory.id, actor = actor.trim(), "Created theory");
        Ok(theory)
    }

    /// Load a stored theory
    pub async fn get_theory(&self, id: i64) -> Result<Option<Theory>, PipelineError> {
        self.with_store(move |store| store.get_theory(id).map_err(storage_error))
            .await
    }

    /// All stored theories
    pub async fn list_theories(&self) -> Result<Vec<Theory>, PipelineError> {
        self.with_store(|store| store.list_theories().map_err(storage_error))
            .await
    }

    /// Resolve the subject to the text the pipeline analyses
    async fn resolve_subject(&self, subject: AnalysisSubject) -> Result<String, PipelineError> {
        let text = match subject {
            AnalysisSubject::Claim(text) => text.trim().to_string(),
            AnalysisSubject::Theory(id) => self
                .get_theory(id)
                .await?
                .ok_or(PipelineError::UnknownTheory(id))?
                .subject_text(),
        };

        if text.is_empty() {
            return Err(PipelineError::InvalidInput("query must not be empty".to_string()));
        }
        let length = text.chars().count();
        if length > self.config.max_query_length {
            return Err(PipelineError::InvalidInput(format!(
                "query too long: {} chars (max: {})",
                length, self.config.max_query_length
            )));
        }
        Ok(text)
    }

    /// Pass the misuse guard; rejections are already logged and reported there
    ///
    /// Entry points outside the pipeline, such as the fork auditor, call
    /// this directly before doing their own work.
    pub async fn admit(&self, actor: &str, action: &str, query: Option<&str>) -> Result<(), PipelineError> {
        let actor = actor.trim().to_string();
        if actor.is_empty() {
            return Err(PipelineError::InvalidInput("actor must not be empty".to_string()));
        }
        let guard = Arc::clone(&self.guard);
        let action = action.to_string();
        let query = query.map(str::to_string);
        tokio::task::spawn_blocking(move || guard.admit(&actor, &action, query.as_deref()))
            .await
            .map_err(join_error)?
            .map_err(PipelineError::from)
    }

    /// Call the search provider with timeout
    async fn search(&self, query: &str) -> Result<Vec<RawSearchResult>, PipelineError> {
        let call = self
            .search_provider
            .search(query, self.config.max_search_results);
        match timeout(self.config.search_timeout(), call).await {
            Err(_) => {
                error!(timeout_secs = self.config.search_timeout_secs, "Search timed out");
                Err(PipelineError::SearchFailed("search timed out".to_string()))
            }
            Ok(Err(e)) => {
                error!(error = %e, "Search failed");
                Err(PipelineError::SearchFailed(e.to_string()))
            }
            Ok(Ok(results)) => {
                debug!(count = results.len(), "Search returned");
                Ok(results)
            }
        }
    }

    /// Call the narrative provider with timeout and parse its answer
    async fn synthesize(&self, prompt: &str) -> Result<NarrativeAssessment, PipelineError> {
        debug!("Prompt length: {} chars", prompt.len());

        let response = timeout(self.config.synthesis_timeout(), self.llm_provider.generate(prompt))
            .await
            .map_err(|_| {
                error!(timeout_secs = self.config.synthesis_timeout_secs, "Narrative synthesis timed out");
                PipelineError::SynthesisTimeout
            })?
            .map_err(|e| {
                error!(error = %e, "Narrative synthesis failed");
                PipelineError::SynthesisFailed(e.to_string())
            })?;

        debug!("Synthesis response length: {} chars", response.len());

        parse_narrative(&response).map_err(|e| {
            error!(error = %e, "Rejected narrative synthesis output");
            e
        })
    }

    /// Run a store operation on a blocking thread
    async fn with_store<T, F>(&self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce(&mut St) -> Result<T, PipelineError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut store = store
                .lock()
                .map_err(|e| PipelineError::StorageFailed(format!("Store lock error: {}", e)))?;
            f(&mut *store)
        })
        .await
        .map_err(join_error)?
    }
}

/// Draw an unused code and bind it to `analysis_id`
fn stamp<St>(
    store: &mut St,
    generator: &WatermarkGenerator,
    analysis_id: AnalysisId,
) -> Result<Watermark, PipelineError>
where
    St: AnalysisStore,
    St::Error: Display,
{
    for _ in 0..MAX_STAMP_ATTEMPTS {
        let code = generator.generate().map_err(PipelineError::Internal)?;
        if store.verify_watermark(&code).map_err(storage_error)?.is_some() {
            warn!(code = %code, "Watermark collision, drawing again");
            continue;
        }
        let watermark = Watermark {
            code,
            analysis_id,
            created_at: unix_now(),
        };
        store.insert_watermark(&watermark).map_err(storage_error)?;
        return Ok(watermark);
    }
    Err(PipelineError::StorageFailed(format!(
        "no unused watermark code after {} attempts",
        MAX_STAMP_ATTEMPTS
    )))
}

fn storage_error<E: Display>(e: E) -> PipelineError {
    PipelineError::StorageFailed(e.to_string())
}

fn join_error(e: tokio::task::JoinError) -> PipelineError {
    PipelineError::Internal(format!("Blocking task failed: {}", e))
}
