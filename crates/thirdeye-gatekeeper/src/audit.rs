//! Fork bias auditing
//!
//! Scans source text of a modified copy of this system for changes that
//! would skew its output: inflated government weights, prompt steering,
//! and keyword censorship. The verdict is for publication only and never
//! feeds back into live analyses.

use crate::error::GuardError;
use regex::Regex;
use serde::Serialize;
use thirdeye_domain::unix_now;
use uuid::Uuid;

/// Category of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionKind {
    /// Credibility boosts for government sources
    SourceBias,
    /// Prompt text steering the narrative
    PromptManipulation,
    /// Keyword filtering of results
    Censorship,
}

/// Severity of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditSeverity {
    /// Weighted 25
    High,
    /// Weighted 40
    Critical,
}

impl AuditSeverity {
    /// Contribution to the bias score
    pub fn weight(&self) -> u32 {
        match self {
            AuditSeverity::High => 25,
            AuditSeverity::Critical => 40,
        }
    }
}

/// Overall risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Score below 20
    Low,
    /// Score 20-39
    Medium,
    /// Score 40 and above
    High,
}

/// Publication verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForkVerdict {
    /// No bias found
    Safe,
    /// Some bias found
    Modified,
    /// Significant bias found
    Compromised,
}

impl ForkVerdict {
    /// Recommendation published alongside the verdict
    pub fn recommendation(&self) -> &'static str {
        match self {
            ForkVerdict::Safe => "SAFE TO USE",
            ForkVerdict::Modified => "USE WITH CAUTION",
            ForkVerdict::Compromised => "DO NOT USE",
        }
    }
}

/// One matched pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// What kind of bias
    pub kind: DetectionKind,
    /// How severe
    pub severity: AuditSeverity,
    /// Matched source text
    pub matched: String,
}

/// Audit report for one fork
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkAudit {
    /// Identifier of this audit
    pub fork_id: String,
    /// Fork author as supplied
    pub author: String,
    /// Audit time (seconds since epoch)
    pub audited_at: u64,
    /// Every matched pattern
    pub detections: Vec<Detection>,
    /// Sum of detection weights
    pub bias_score: u32,
    /// Risk band of the score
    pub risk_level: RiskLevel,
    /// Verdict
    pub verdict: ForkVerdict,
    /// Published recommendation
    pub recommendation: String,
}

/// Pattern-based fork auditor
#[derive(Debug, Clone)]
pub struct ForkAuditor {
    rules: Vec<(DetectionKind, AuditSeverity, Regex)>,
}

const SOURCE_BIAS_PATTERNS: [&str; 3] = [
    r"weight\s*=\s*\{[^}]*government[^}]*:\s*[5-9]\d+",
    r"credibility\s*\*=\s*[5-9]\d+.*government",
    r"if.*official.*\+=",
];

const PROMPT_PATTERNS: [&str; 3] = [
    r"trust official",
    r"government sources are most credible",
    r"conspiracy theories are false",
];

const CENSORSHIP_PATTERNS: [&str; 3] = [r"block.*(CIA|FBI|NSA)", r"filter.*false flag", r"censor"];

impl ForkAuditor {
    /// Compile the audit rules
    pub fn new() -> Result<Self, GuardError> {
        let groups = [
            (DetectionKind::SourceBias, AuditSeverity::High, &SOURCE_BIAS_PATTERNS),
            (DetectionKind::PromptManipulation, AuditSeverity::Critical, &PROMPT_PATTERNS),
            (DetectionKind::Censorship, AuditSeverity::Critical, &CENSORSHIP_PATTERNS),
        ];

        let mut rules = Vec::new();
        for (kind, severity, patterns) in groups {
            for pattern in patterns.iter() {
                let regex = Regex::new(&format!("(?i){}", pattern))
                    .map_err(|e| GuardError::Config(format!("audit pattern {}: {}", pattern, e)))?;
                rules.push((kind, severity, regex));
            }
        }
        Ok(Self { rules })
    }

    /// Audit one fork's source text
    pub fn audit(&self, author: &str, code: &str) -> ForkAudit {
        let detections: Vec<Detection> = self
            .rules
            .iter()
            .flat_map(|(kind, severity, regex)| {
                regex.find_iter(code).map(|m| Detection {
                    kind: *kind,
                    severity: *severity,
                    matched: m.as_str().to_string(),
                })
            })
            .collect();

        let bias_score: u32 = detections.iter().map(|d| d.severity.weight()).sum();
        let (risk_level, verdict) = match bias_score {
            s if s >= 40 => (RiskLevel::High, ForkVerdict::Compromised),
            s if s >= 20 => (RiskLevel::Medium, ForkVerdict::Modified),
            _ => (RiskLevel::Low, ForkVerdict::Safe),
        };

        ForkAudit {
            fork_id: Uuid::now_v7().to_string(),
            author: author.to_string(),
            audited_at: unix_now(),
            detections,
            bias_score,
            risk_level,
            verdict,
            recommendation: verdict.recommendation().to_string(),
        }
    }
}
