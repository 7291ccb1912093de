//! Request-rate and query-content abuse signals

use crate::config::GuardConfig;
use crate::window::ActorWindows;
use std::time::{Duration, Instant};
use thirdeye_domain::{AbuseKind, AbuseReport, Severity};

/// Outcome of inspecting one request
#[derive(Debug, Clone, PartialEq)]
pub enum Inspection {
    /// Request may proceed; advisory reports attached
    Admitted(Vec<AbuseReport>),
    /// Request exceeded the rate window
    Rejected {
        /// Seconds until a slot frees up
        retry_after_secs: u64,
        /// The rapid-fire report, once per actor per rate window
        report: Option<AbuseReport>,
    },
}

/// Sliding-window rate limiter plus advisory content checks
#[derive(Debug)]
pub struct AbuseDetector {
    requests: ActorWindows<()>,
    queries: ActorWindows<String>,
    reported: ActorWindows<AbuseKind>,
    rate_limit: usize,
    suspicious_keywords: Vec<String>,
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

impl AbuseDetector {
    /// Create a detector from guard configuration
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            requests: ActorWindows::new(config.rate_window(), config.max_tracked_actors),
            queries: ActorWindows::new(config.usage_window(), config.max_tracked_actors),
            reported: ActorWindows::new(config.rate_window(), config.max_tracked_actors),
            rate_limit: config.rate_limit,
            suspicious_keywords: config.suspicious_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Inspect a request, recording it if admitted
    ///
    /// The current request counts toward the limit, so with a limit of 5 the
    /// sixth request inside the window is rejected. Rejected requests are not
    /// recorded, and only the first rejection per rate window is reported.
    pub fn inspect(&mut self, actor: &str, query: Option<&str>, now: Instant) -> Inspection {
        let recent = self.requests.count(actor, now);
        if recent + 1 > self.rate_limit {
            let wait = self
                .requests
                .time_until_slot(actor, now)
                .unwrap_or_else(|| self.requests.ttl());
            let window = self.requests.ttl().as_secs();
            let report = self.first_in_window(actor, AbuseKind::RapidFire, now).then(|| {
                AbuseReport::automated(
                    actor,
                    AbuseKind::RapidFire,
                    Severity::Medium,
                    format!("More than {} requests in {} seconds", self.rate_limit, window),
                )
            });
            return Inspection::Rejected {
                retry_after_secs: ceil_secs(wait),
                report,
            };
        }
        self.requests.record(actor, (), now);

        let mut reports = Vec::new();
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            if self.queries.events(actor, now).any(|seen| seen == query) {
                reports.push(AbuseReport::automated(
                    actor,
                    AbuseKind::RepetitiveQuery,
                    Severity::Low,
                    "Identical query repeated",
                ));
            }
            self.queries.record(actor, query.to_string(), now);

            let lower = query.to_lowercase();
            if let Some(keyword) = self.suspicious_keywords.iter().find(|k| lower.contains(k.as_str())) {
                reports.push(AbuseReport::automated(
                    actor,
                    AbuseKind::SuspiciousKeywords,
                    Severity::Low,
                    format!("Query contains suspicious keyword {:?}", keyword),
                ));
            }
        }
        Inspection::Admitted(reports)
    }

    /// Whether `kind` has not yet been reported for the actor in this rate
    /// window; marks it reported
    pub fn first_in_window(&mut self, actor: &str, kind: AbuseKind, now: Instant) -> bool {
        if self.reported.events(actor, now).any(|k| *k == kind) {
            return false;
        }
        self.reported.record(actor, kind, now);
        true
    }

    /// Drop expired entries; returns entries dropped
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        self.requests.evict_expired(now) + self.queries.evict_expired(now) + self.reported.evict_expired(now)
    }

    /// Forget all windows
    pub fn clear(&mut self) {
        self.requests.clear();
        self.queries.clear();
        self.reported.clear();
    }
}
