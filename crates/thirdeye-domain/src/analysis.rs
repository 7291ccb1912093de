//! Analysis results - the fused outcome of one pipeline run

use crate::confidence::ComponentScores;
use crate::evidence::EvidenceItem;
use crate::history::PatternMatch;
use crate::source::BiasRating;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for an analysis result based on UUIDv7
///
/// Sorts chronologically, so history listings can order by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnalysisId(u128);

impl AnalysisId {
    /// Generate a new UUIDv7-based AnalysisId
    ///
    /// # Examples
    ///
    /// ```
    /// use thirdeye_domain::AnalysisId;
    ///
    /// let id = AnalysisId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an AnalysisId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an AnalysisId from a UUID string
    ///
    /// # Examples
    ///
    /// ```
    /// use thirdeye_domain::AnalysisId;
    ///
    /// let id = AnalysisId::new();
    /// let parsed = AnalysisId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid analysis id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Millisecond timestamp embedded in the UUIDv7
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 80) as u64
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for AnalysisId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AnalysisId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AnalysisId::from_string(&s).map_err(serde::de::Error::custom)
    }
}

/// A stored conspiracy theory that can be analysed by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theory {
    /// Surrogate id
    pub id: i64,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Creation time (seconds since epoch)
    pub created_at: u64,
}

impl Theory {
    /// Text the pipeline analyses for this theory
    pub fn subject_text(&self) -> String {
        format!("{}: {}", self.title, self.description)
    }
}

/// What a pipeline run analyses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisSubject {
    /// Free-text claim
    Claim(String),
    /// Stored theory, resolved to its text before any work starts
    Theory(i64),
}

impl AnalysisSubject {
    /// Query type recorded in the analysis query log
    pub fn query_type(&self) -> &'static str {
        match self {
            AnalysisSubject::Claim(_) => "claim",
            AnalysisSubject::Theory(_) => "theory",
        }
    }
}

/// One row of the analysis query log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEntry {
    /// Requesting actor
    pub actor: String,
    /// Resolved query text
    pub query_text: String,
    /// `claim` or `theory`
    pub query_type: String,
    /// Peer address, when known
    pub ip: Option<String>,
}

/// Structured output of the narrative-synthesis collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NarrativeAssessment {
    /// Balanced summary
    pub summary: String,
    /// Logical consistency (0-100)
    pub logical_consistency_score: u8,
    /// Points supporting the claim
    pub strengths: Vec<String>,
    /// Points against the claim
    pub weaknesses: Vec<String>,
    /// Warning signs
    pub red_flags: Vec<String>,
    /// Open questions worth investigating
    pub investigation_needed: Vec<String>,
    /// Explanation of the assessment
    pub reasoning: String,
}

/// Aggregate view of the sources cited in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetrics {
    /// Items whose source credibility is at least 70
    pub high_credibility_count: u32,
    /// Items whose source credibility is below 40
    pub low_credibility_count: u32,
    /// Count of items per bias rating
    pub bias_distribution: BTreeMap<BiasRating, u32>,
}

/// The fused, immutable outcome of one pipeline run
///
/// `overall_confidence_score` is always `scores.overall()`; the only way to
/// build a result is [`AnalysisResult::new`], which computes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Unique identifier
    pub id: AnalysisId,
    /// Query log entry this result answers
    pub query_id: Option<i64>,
    /// Requesting actor
    pub actor: String,
    /// Analysed text
    pub query: String,
    /// Component scores
    #[serde(flatten)]
    pub scores: ComponentScores,
    /// Weighted composite of the component scores
    pub overall_confidence_score: u8,
    /// `min(100, 15 * distinct domains)`
    pub corroboration_score: u8,
    /// Items whose snippet mentions destroyed or withheld material
    pub destruction_indicators: u32,
    /// Credibility tallies for the cited sources
    pub source_metrics: SourceMetrics,
    /// Narrative summary
    pub summary: String,
    /// Points supporting the claim
    pub strengths: Vec<String>,
    /// Points against the claim
    pub weaknesses: Vec<String>,
    /// Warning signs
    pub red_flags: Vec<String>,
    /// Open questions
    pub investigation_needed: Vec<String>,
    /// Explanation of the assessment
    pub reasoning: String,
    /// Scored evidence
    pub evidence: Vec<EvidenceItem>,
    /// Ranked historical matches
    pub pattern_matches: Vec<PatternMatch>,
    /// Creation time (seconds since epoch)
    pub created_at: u64,
}

impl AnalysisResult {
    /// Fuse component scores and the narrative into a new result
    pub fn new(
        actor: impl Into<String>,
        query: impl Into<String>,
        evidence_quality_score: u8,
        source_credibility_score: u8,
        narrative: NarrativeAssessment,
    ) -> Self {
        let scores = ComponentScores {
            evidence_quality_score,
            source_credibility_score,
            logical_consistency_score: narrative.logical_consistency_score,
        };
        Self {
            id: AnalysisId::new(),
            query_id: None,
            actor: actor.into(),
            query: query.into(),
            overall_confidence_score: scores.overall(),
            scores,
            corroboration_score: 0,
            destruction_indicators: 0,
            source_metrics: SourceMetrics::default(),
            summary: narrative.summary,
            strengths: narrative.strengths,
            weaknesses: narrative.weaknesses,
            red_flags: narrative.red_flags,
            investigation_needed: narrative.investigation_needed,
            reasoning: narrative.reasoning,
            evidence: Vec::new(),
            pattern_matches: Vec::new(),
            created_at: crate::unix_now(),
        }
    }

    /// Attach the query log entry
    pub fn with_query_id(mut self, query_id: i64) -> Self {
        self.query_id = Some(query_id);
        self
    }

    /// Attach scored evidence and its aggregate metadata
    pub fn with_evidence(
        mut self,
        evidence: Vec<EvidenceItem>,
        corroboration_score: u8,
        destruction_indicators: u32,
    ) -> Self {
        self.evidence = evidence;
        self.corroboration_score = corroboration_score;
        self.destruction_indicators = destruction_indicators;
        self
    }

    /// Attach source credibility tallies
    pub fn with_source_metrics(mut self, metrics: SourceMetrics) -> Self {
        self.source_metrics = metrics;
        self
    }

    /// Attach ranked pattern matches
    pub fn with_pattern_matches(mut self, matches: Vec<PatternMatch>) -> Self {
        self.pattern_matches = matches;
        self
    }

    /// Whether the overall score still agrees with the component scores
    pub fn is_consistent(&self) -> bool {
        self.overall_confidence_score == self.scores.overall()
    }
}

/// Full payload returned to callers: the result plus its watermark code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// The persisted result
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// Watermark code certifying the result
    pub watermark: String,
}

/// One line of an actor's analysis history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// Result id
    pub id: AnalysisId,
    /// Analysed text
    pub query: String,
    /// Overall confidence
    pub overall_confidence_score: u8,
    /// Creation time (seconds since epoch)
    pub created_at: u64,
    /// Watermark code
    pub watermark: String,
}
