//! Strict parsing of narrative-synthesis output
//!
//! The provider must answer with exactly one JSON object of the documented
//! shape. Missing fields, unknown fields, wrong types and out-of-range
//! scores all fail the run; nothing is coerced to a default.

use crate::error::PipelineError;
use serde::Deserialize;
use thirdeye_domain::NarrativeAssessment;

/// Wire shape of the provider's answer
///
/// The score is accepted as any JSON number and rounded after range
/// checking.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireNarrative {
    summary: String,
    logical_consistency_score: f64,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    red_flags: Vec<String>,
    investigation_needed: Vec<String>,
    reasoning: String,
}

/// Parse the provider response into a narrative assessment
pub fn parse_narrative(response: &str) -> Result<NarrativeAssessment, PipelineError> {
    let json_str = extract_json(response)?;

    let wire: WireNarrative = serde_json::from_str(json_str)
        .map_err(|e| PipelineError::MalformedSynthesis(format!("JSON shape mismatch: {}", e)))?;

    let score = wire.logical_consistency_score;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(PipelineError::MalformedSynthesis(format!(
            "logicalConsistencyScore out of range: {}",
            score
        )));
    }
    if wire.summary.trim().is_empty() {
        return Err(PipelineError::MalformedSynthesis("summary is empty".to_string()));
    }

    Ok(NarrativeAssessment {
        summary: wire.summary,
        logical_consistency_score: score.round() as u8,
        strengths: wire.strengths,
        weaknesses: wire.weaknesses,
        red_flags: wire.red_flags,
        investigation_needed: wire.investigation_needed,
        reasoning: wire.reasoning,
    })
}

/// Strip a surrounding markdown code fence, if any
fn extract_json(response: &str) -> Result<&str, PipelineError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::MalformedSynthesis("Empty response".to_string()));
    }

    if trimmed.starts_with("```") {
        let body = trimmed
            .split_once('\n')
            .map(|(_, rest)| rest)
            .ok_or_else(|| PipelineError::MalformedSynthesis("Empty code block".to_string()))?;
        let body = body
            .trim_end()
            .strip_suffix("```")
            .ok_or_else(|| PipelineError::MalformedSynthesis("Unterminated code block".to_string()))?;
        Ok(body.trim())
    } else {
        Ok(trimmed)
    }
}
