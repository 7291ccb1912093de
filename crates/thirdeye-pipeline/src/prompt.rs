//! Prompt construction for narrative synthesis

use thirdeye_domain::PatternMatch;
use thirdeye_scorer::{EvidenceBatch, SourceAssessment};

/// Builds the narrative-synthesis prompt from the scored context of one run
pub struct NarrativePrompt<'a> {
    query: &'a str,
    evidence: &'a EvidenceBatch,
    sources: &'a SourceAssessment,
    patterns: &'a [PatternMatch],
    evidence_limit: usize,
}

impl<'a> NarrativePrompt<'a> {
    /// Create a new prompt builder
    pub fn new(
        query: &'a str,
        evidence: &'a EvidenceBatch,
        sources: &'a SourceAssessment,
        patterns: &'a [PatternMatch],
    ) -> Self {
        Self {
            query,
            evidence,
            sources,
            patterns,
            evidence_limit: 10,
        }
    }

    /// List at most this many evidence items individually
    pub fn with_evidence_limit(mut self, limit: usize) -> Self {
        self.evidence_limit = limit;
        self
    }

    /// Build the complete synthesis prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(SYNTHESIS_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Claim:\n---\n");
        prompt.push_str(self.query);
        prompt.push_str("\n---\n\n");

        prompt.push_str(&self.evidence_summary());
        prompt.push('\n');
        prompt.push_str(&self.source_summary());
        prompt.push('\n');
        prompt.push_str(&self.pattern_summary());
        prompt.push('\n');

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }

    fn evidence_summary(&self) -> String {
        let batch = self.evidence;
        let mut out = String::from("Evidence analysis:\n");
        out.push_str(&format!("- Evidence quality score: {}/100\n", batch.evidence_quality_score));
        out.push_str(&format!("- Items found: {}\n", batch.items.len()));
        out.push_str(&format!("- Corroboration score: {}/100\n", batch.corroboration_score));
        out.push_str(&format!("- Evidence destruction indicators: {}\n", batch.destruction_indicators));

        for item in batch.items.iter().take(self.evidence_limit) {
            out.push_str(&format!(
                "  * [{} | {} | quality {}{}] {}\n",
                item.domain.as_deref().unwrap_or("unknown"),
                item.source_type,
                item.quality_score,
                if item.is_primary { " | primary" } else { "" },
                item.title
            ));
        }
        out
    }

    fn source_summary(&self) -> String {
        let metrics = &self.sources.metrics;
        let mut out = String::from("Source credibility:\n");
        out.push_str(&format!(
            "- Average source credibility: {}/100\n",
            self.sources.source_credibility_score
        ));
        out.push_str(&format!("- High credibility sources: {}\n", metrics.high_credibility_count));
        out.push_str(&format!("- Low credibility sources: {}\n", metrics.low_credibility_count));

        let bias = metrics
            .bias_distribution
            .iter()
            .map(|(rating, count)| format!("{}={}", rating.as_str(), count))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("- Bias distribution: {}\n", bias));
        out
    }

    fn pattern_summary(&self) -> String {
        if self.patterns.is_empty() {
            return "Historical pattern matches: none\n".to_string();
        }
        let mut out = String::from("Historical pattern matches:\n");
        for m in self.patterns {
            out.push_str(&format!(
                "- {} ({}): similarity {}/100, matching [{}], {} years from start to admission\n",
                m.event_name,
                m.event_code,
                m.similarity_score,
                m.matching_characteristics.join(", "),
                m.temporal_metrics.denial_to_admission_years
            ));
        }
        out
    }
}

const SYNTHESIS_INSTRUCTIONS: &str = "You are assessing how well a claim is supported by evidence. \
You are evaluating EVIDENCE QUALITY and PATTERNS, not declaring truth or falsehood.

Consider:
1. Logical consistency of the claim with the evidence found
2. Quality and independence of the sources
3. Similarity to historically documented programs
4. Red flags such as circular sourcing or unfalsifiable framing";

const OUTPUT_FORMAT_REMINDER: &str = r#"Respond with a single JSON object and nothing else:

{
  "summary": "balanced 2-3 sentence summary",
  "logicalConsistencyScore": 0-100,
  "strengths": ["point supporting the claim"],
  "weaknesses": ["point against the claim"],
  "redFlags": ["warning sign"],
  "investigationNeeded": ["open question"],
  "reasoning": "explanation of the assessment"
}

All seven fields are required. Do not add other fields."#;
