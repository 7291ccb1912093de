//! Abuse reports emitted by the misuse guard

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of abuse signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbuseKind {
    /// Too many requests inside the short window (blocking)
    RapidFire,
    /// The same query string submitted again (advisory)
    RepetitiveQuery,
    /// Query contains a denylisted keyword (advisory)
    SuspiciousKeywords,
    /// A blocked actor tried again (blocking)
    BlockedActor,
}

impl AbuseKind {
    /// Get the kind as a storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            AbuseKind::RapidFire => "rapid_fire",
            AbuseKind::RepetitiveQuery => "repetitive_query",
            AbuseKind::SuspiciousKeywords => "suspicious_keywords",
            AbuseKind::BlockedActor => "blocked_actor",
        }
    }

    /// Parse a kind from a storage string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rapid_fire" => Some(AbuseKind::RapidFire),
            "repetitive_query" => Some(AbuseKind::RepetitiveQuery),
            "suspicious_keywords" => Some(AbuseKind::SuspiciousKeywords),
            "blocked_actor" => Some(AbuseKind::BlockedActor),
            _ => None,
        }
    }

    /// Whether the signal rejects the request that raised it
    pub fn is_blocking(&self) -> bool {
        matches!(self, AbuseKind::RapidFire | AbuseKind::BlockedActor)
    }
}

impl fmt::Display for AbuseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an abuse report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational
    Low,
    /// Worth review
    Medium,
    /// Act on it
    High,
}

impl Severity {
    /// Get the severity as a storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Parse a severity from a storage string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// One entry of the abuse audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseReport {
    /// Actor key (user id or IP)
    pub actor: String,
    /// Signal kind
    pub kind: AbuseKind,
    /// Severity
    pub severity: Severity,
    /// Human-readable detail
    pub description: String,
    /// Raised by the guard rather than a person
    pub automated: bool,
    /// Creation time (seconds since epoch)
    pub created_at: u64,
}

impl AbuseReport {
    /// Create an automated report stamped with the current time
    pub fn automated(
        actor: impl Into<String>,
        kind: AbuseKind,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            kind,
            severity,
            description: description.into(),
            automated: true,
            created_at: crate::unix_now(),
        }
    }
}
