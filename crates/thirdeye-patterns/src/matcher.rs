//! Claim-to-history similarity ranking

use crate::config::MatcherConfig;
use crate::corpus::{EventCorpus, IndicatorTable};
use crate::error::PatternError;
use thirdeye_domain::{HistoricalEvent, PatternMatch, TemporalMetrics};
use tracing::{debug, info};

/// Ranks historical events by similarity to a claim
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    events: Vec<HistoricalEvent>,
    indicators: IndicatorTable,
    corpus_version: u32,
    min_score: u8,
    max_matches: usize,
}

impl PatternMatcher {
    /// Load the corpus and indicator table named by `config`
    pub fn new(config: &MatcherConfig) -> Result<Self, PatternError> {
        config.validate().map_err(PatternError::Config)?;

        let corpus = match &config.corpus_path {
            Some(path) => EventCorpus::from_file(path)?,
            None => EventCorpus::builtin()?,
        };
        let indicators = match &config.indicators_path {
            Some(path) => IndicatorTable::from_file(path)?,
            None => IndicatorTable::builtin()?,
        };

        info!(
            corpus_version = corpus.version,
            indicator_version = indicators.version,
            events = corpus.events.len(),
            "Loaded historical corpus"
        );
        Ok(Self::from_parts(corpus, indicators, config))
    }

    /// Build a matcher from already-loaded reference data
    pub fn from_parts(corpus: EventCorpus, indicators: IndicatorTable, config: &MatcherConfig) -> Self {
        Self {
            events: corpus.events,
            indicators,
            corpus_version: corpus.version,
            min_score: config.min_score,
            max_matches: config.max_matches,
        }
    }

    /// Events the matcher ranks against
    pub fn events(&self) -> &[HistoricalEvent] {
        &self.events
    }

    /// Version of the loaded event corpus
    pub fn corpus_version(&self) -> u32 {
        self.corpus_version
    }

    /// Score one event against an already lower-cased claim
    pub fn score_event(&self, lower_claim: &str, event: &HistoricalEvent) -> PatternMatch {
        let mut score: u32 = 0;
        let mut matching: Vec<String> = Vec::new();

        for indicator in &self.indicators.indicators {
            if lower_claim.contains(indicator.phrase.as_str())
                && event.has_characteristic(&indicator.characteristic)
                && !matching.contains(&indicator.characteristic)
            {
                matching.push(indicator.characteristic.clone());
                score += u32::from(indicator.weight);
            }
        }

        if let Some(token) = event.name_token() {
            if lower_claim.contains(token.as_str()) {
                score += u32::from(self.indicators.name_token_weight);
            }
        }

        let differences = event
            .pattern_characteristics
            .iter()
            .filter(|c| !matching.contains(c))
            .cloned()
            .collect();

        PatternMatch {
            event_name: event.name.clone(),
            event_code: event.code.clone(),
            similarity_score: score.min(100) as u8,
            matching_characteristics: matching,
            differences,
            temporal_metrics: TemporalMetrics::from(event),
        }
    }

    /// Top matches for a claim, best first
    ///
    /// Only matches scoring above the threshold are kept. Ties are broken
    /// by most recently revealed, then by code.
    pub fn match_claim(&self, claim: &str) -> Vec<PatternMatch> {
        let lower = claim.to_lowercase();

        let mut ranked: Vec<(i32, PatternMatch)> = self
            .events
            .iter()
            .map(|event| (event.revealed_year, self.score_event(&lower, event)))
            .filter(|(_, m)| m.similarity_score > self.min_score)
            .collect();

        ranked.sort_by(|(year_a, a), (year_b, b)| {
            b.similarity_score
                .cmp(&a.similarity_score)
                .then_with(|| year_b.cmp(year_a))
                .then_with(|| a.event_code.cmp(&b.event_code))
        });
        ranked.truncate(self.max_matches);

        debug!(candidates = self.events.len(), matches = ranked.len(), "Matched claim against history");
        ranked.into_iter().map(|(_, m)| m).collect()
    }
}
