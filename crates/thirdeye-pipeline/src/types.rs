//! Request types for the Orchestrator

use crate::orchestrator::ANALYZE_ACTION;
use thirdeye_domain::AnalysisSubject;

/// One pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Claim text or stored theory to analyse
    pub subject: AnalysisSubject,
    /// Requesting actor (user id or peer address)
    pub actor: String,
    /// Peer address for the query log, when known
    pub ip: Option<String>,
    /// Action name the misuse guard checks
    pub action: String,
}

impl AnalysisRequest {
    /// Analyse free-text claim
    pub fn claim(actor: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            subject: AnalysisSubject::Claim(text.into()),
            actor: actor.into(),
            ip: None,
            action: ANALYZE_ACTION.to_string(),
        }
    }

    /// Analyse a stored theory
    pub fn theory(actor: impl Into<String>, theory_id: i64) -> Self {
        Self {
            subject: AnalysisSubject::Theory(theory_id),
            actor: actor.into(),
            ip: None,
            action: ANALYZE_ACTION.to_string(),
        }
    }

    /// Record the peer address
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Declare the purpose of the run to the misuse guard
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }
}
