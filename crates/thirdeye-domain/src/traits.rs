//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{
    AbuseReport, AnalysisId, AnalysisRecord, AnalysisResult, AnalysisSummary, HistoricalEvent,
    QueryEntry, RawSearchResult, Source, SourceType, Theory, VerificationOutcome, Watermark,
    WatermarkCode,
};
use std::future::Future;

/// Trait for persisting and retrieving analysis results
///
/// Implemented by the infrastructure layer (thirdeye-store)
pub trait AnalysisStore {
    /// Error type for store operations
    type Error;

    /// Append an entry to the analysis query log, returning its id
    fn record_query(&mut self, entry: &QueryEntry) -> Result<i64, Self::Error>;

    /// Persist a result, then its evidence, then its pattern matches
    ///
    /// Runs as one transaction. Evidence items resolve or create their
    /// source. Pattern matches whose event code is unknown are skipped and
    /// their codes returned.
    fn insert_analysis(&mut self, result: &AnalysisResult) -> Result<Vec<String>, Self::Error>;

    /// Persist the watermark for an already-persisted result
    fn insert_watermark(&mut self, watermark: &Watermark) -> Result<(), Self::Error>;

    /// Load the full payload of a persisted result
    fn get_analysis(&self, id: AnalysisId) -> Result<Option<AnalysisRecord>, Self::Error>;

    /// List an actor's results, newest first (`page` starts at 1)
    fn list_analyses(
        &self,
        actor: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<AnalysisSummary>, Self::Error>;

    /// Look up a watermark by code
    fn verify_watermark(&self, code: &WatermarkCode) -> Result<Option<Watermark>, Self::Error>;
}

/// Trait for durable source credibility profiles
///
/// Implemented by the infrastructure layer (thirdeye-store)
pub trait SourceStore {
    /// Error type for store operations
    type Error;

    /// Get a source by domain
    fn get_source(&self, domain: &str) -> Result<Option<Source>, Self::Error>;

    /// Get a source, creating it with neutral defaults on first sighting
    fn get_or_create_source(
        &mut self,
        domain: &str,
        source_type: SourceType,
    ) -> Result<Source, Self::Error>;

    /// Apply one verification outcome as an atomic read-modify-write
    ///
    /// `source_type` is only used if the domain has not been seen before.
    fn record_outcome(
        &mut self,
        domain: &str,
        source_type: SourceType,
        outcome: VerificationOutcome,
    ) -> Result<Source, Self::Error>;

    /// List sources ordered by credibility, highest first
    fn list_sources(&self, min_credibility: Option<f64>) -> Result<Vec<Source>, Self::Error>;
}

/// Trait for stored theories
///
/// Implemented by the infrastructure layer (thirdeye-store)
pub trait TheoryStore {
    /// Error type for store operations
    type Error;

    /// Store a new theory
    fn create_theory(&mut self, title: &str, description: &str) -> Result<Theory, Self::Error>;

    /// Get a theory by id
    fn get_theory(&self, id: i64) -> Result<Option<Theory>, Self::Error>;

    /// List all theories, newest first
    fn list_theories(&self) -> Result<Vec<Theory>, Self::Error>;
}

/// Trait for the historical event reference table
///
/// Implemented by the infrastructure layer (thirdeye-store)
pub trait HistoricalEventStore {
    /// Error type for store operations
    type Error;

    /// Insert or replace events keyed by code, returning how many were written
    fn upsert_events(&mut self, events: &[HistoricalEvent]) -> Result<usize, Self::Error>;

    /// Get an event by code
    fn get_event(&self, code: &str) -> Result<Option<HistoricalEvent>, Self::Error>;

    /// List all events
    fn list_events(&self) -> Result<Vec<HistoricalEvent>, Self::Error>;
}

/// Destination for abuse reports
///
/// Object-safe so the guard can hold any sink behind `Arc<dyn ...>`.
pub trait AbuseReportSink: Send + Sync {
    /// Record one report
    fn submit(&self, report: &AbuseReport) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Trait for web search operations
///
/// Implemented by the infrastructure layer (thirdeye-search)
pub trait SearchProvider {
    /// Error type for search operations
    type Error;

    /// Search for results about `query`; may return fewer than `max_results`
    fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<RawSearchResult>, Self::Error>> + Send;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (thirdeye-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a text completion
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
