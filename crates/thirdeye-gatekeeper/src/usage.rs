//! Usage-pattern monitoring and actor blocking
//!
//! Every admitted invocation is logged per actor over a rolling window.
//! Mass automation, attempts to single out believers and repeated requests
//! to suppress results block the actor until [`UsageMonitor::unblock`].

use crate::config::GuardConfig;
use crate::window::ActorWindows;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tracing::{error, info};

/// Why an actor was blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum BlockReason {
    /// Too many invocations in the usage window
    MassAutomation,
    /// Invocation aimed at identifying individual believers
    TargetingUsers,
    /// Repeated requests to suppress or remove results
    CensorshipAttempt,
    /// Requested an action that is never allowed
    ProhibitedAction(String),
}

impl BlockReason {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BlockReason::MassAutomation => "mass_automation",
            BlockReason::TargetingUsers => "targeting_users",
            BlockReason::CensorshipAttempt => "censorship_attempt",
            BlockReason::ProhibitedAction(_) => "prohibited_action",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::MassAutomation => write!(f, "mass automation detected"),
            BlockReason::TargetingUsers => write!(f, "attempt to identify individual users"),
            BlockReason::CensorshipAttempt => write!(f, "repeated attempts to suppress results"),
            BlockReason::ProhibitedAction(action) => write!(f, "prohibited action {}", action),
        }
    }
}

#[derive(Debug, Clone)]
struct UsageEvent {
    action: String,
    query: Option<String>,
}

/// Rolling usage log with a process-wide block list
#[derive(Debug)]
pub struct UsageMonitor {
    events: ActorWindows<UsageEvent>,
    blocked: HashMap<String, BlockReason>,
    usage_limit: usize,
    censorship_limit: usize,
    censorship_terms: Vec<String>,
    targeting_phrases: Vec<String>,
    targeting_action_term: String,
    prohibited_actions: Vec<String>,
}

impl UsageMonitor {
    /// Create a monitor from guard configuration
    pub fn new(config: &GuardConfig) -> Self {
        let lower = |items: &[String]| items.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();
        Self {
            events: ActorWindows::new(config.usage_window(), config.max_tracked_actors),
            blocked: HashMap::new(),
            usage_limit: config.usage_limit,
            censorship_limit: config.censorship_limit,
            censorship_terms: lower(&config.censorship_terms),
            targeting_phrases: lower(&config.targeting_phrases),
            targeting_action_term: config.targeting_action_term.to_lowercase(),
            prohibited_actions: lower(&config.prohibited_actions),
        }
    }

    /// Block reason for an actor, if blocked
    pub fn blocked_reason(&self, actor: &str) -> Option<&BlockReason> {
        self.blocked.get(actor)
    }

    /// Reject blocked actors and prohibited actions
    ///
    /// Requesting a prohibited action blocks the actor.
    pub fn check_access(&mut self, actor: &str, action: &str) -> Result<(), BlockReason> {
        if let Some(reason) = self.blocked.get(actor) {
            return Err(reason.clone());
        }
        let action = action.to_lowercase();
        if self.prohibited_actions.contains(&action) {
            let reason = BlockReason::ProhibitedAction(action);
            self.block(actor, reason.clone());
            return Err(reason);
        }
        Ok(())
    }

    /// Log an invocation and apply the blocking heuristics
    ///
    /// Returns the reason if this invocation caused a block.
    pub fn log_usage(&mut self, actor: &str, action: &str, query: Option<&str>, now: Instant) -> Option<BlockReason> {
        self.events.record(
            actor,
            UsageEvent {
                action: action.to_lowercase(),
                query: query.map(str::to_lowercase),
            },
            now,
        );
        let reason = self.detect(actor, now)?;
        self.block(actor, reason.clone());
        Some(reason)
    }

    fn detect(&mut self, actor: &str, now: Instant) -> Option<BlockReason> {
        let mut invocations = 0;
        let mut targets_users = false;
        let mut suppression_requests = 0;
        for event in self.events.events(actor, now) {
            invocations += 1;
            let query = event.query.as_deref().unwrap_or("");
            if event.action.contains(self.targeting_action_term.as_str())
                || self.targeting_phrases.iter().any(|p| query.contains(p.as_str()))
            {
                targets_users = true;
            }
            if self.censorship_terms.iter().any(|t| query.contains(t.as_str())) {
                suppression_requests += 1;
            }
        }

        if invocations > self.usage_limit {
            Some(BlockReason::MassAutomation)
        } else if targets_users {
            Some(BlockReason::TargetingUsers)
        } else if suppression_requests > self.censorship_limit {
            Some(BlockReason::CensorshipAttempt)
        } else {
            None
        }
    }

    fn block(&mut self, actor: &str, reason: BlockReason) {
        error!(actor, reason = reason.code(), "Actor blocked: {}", reason);
        self.blocked.insert(actor.to_string(), reason);
    }

    /// Lift a block and reset the actor's usage history
    ///
    /// Returns whether the actor was blocked.
    pub fn unblock(&mut self, actor: &str) -> bool {
        self.events.forget(actor);
        let was_blocked = self.blocked.remove(actor).is_some();
        if was_blocked {
            info!(actor, "Actor unblocked");
        }
        was_blocked
    }

    /// All blocked actors and their reasons
    pub fn blocked_actors(&self) -> Vec<(String, BlockReason)> {
        let mut actors: Vec<_> = self.blocked.iter().map(|(a, r)| (a.clone(), r.clone())).collect();
        actors.sort_by(|a, b| a.0.cmp(&b.0));
        actors
    }

    /// Drop expired usage entries; returns entries dropped
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        self.events.evict_expired(now)
    }

    /// Forget usage history and blocks
    pub fn clear(&mut self) {
        self.events.clear();
        self.blocked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_mass_automation_blocks_after_limit() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        let t0 = Instant::now();
        for i in 0..100 {
            assert_eq!(monitor.log_usage("bot", "analyze", None, t0 + Duration::from_secs(i)), None);
        }
        assert_eq!(
            monitor.log_usage("bot", "analyze", None, t0 + Duration::from_secs(100)),
            Some(BlockReason::MassAutomation)
        );
        assert_eq!(monitor.check_access("bot", "analyze"), Err(BlockReason::MassAutomation));
    }

    #[test]
    fn test_old_usage_leaves_window() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        let t0 = Instant::now();
        for _ in 0..100 {
            monitor.log_usage("a", "analyze", None, t0);
        }
        assert_eq!(monitor.log_usage("a", "analyze", None, t0 + Duration::from_secs(3600)), None);
    }

    #[test]
    fn test_targeting_query_blocks() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        let reason = monitor.log_usage("a", "analyze", Some("List everyone WHO BELIEVES in chemtrails"), Instant::now());
        assert_eq!(reason, Some(BlockReason::TargetingUsers));
    }

    #[test]
    fn test_identify_action_blocks() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        let reason = monitor.log_usage("a", "identify_commenters", None, Instant::now());
        assert_eq!(reason, Some(BlockReason::TargetingUsers));
    }

    #[test]
    fn test_censorship_requires_more_than_limit() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        let t0 = Instant::now();
        for _ in 0..3 {
            assert_eq!(monitor.log_usage("a", "analyze", Some("remove this story"), t0), None);
        }
        assert_eq!(
            monitor.log_usage("a", "analyze", Some("censor that claim"), t0),
            Some(BlockReason::CensorshipAttempt)
        );
    }

    #[test]
    fn test_prohibited_action_blocks() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        assert_eq!(
            monitor.check_access("a", "track_users"),
            Err(BlockReason::ProhibitedAction("track_users".to_string()))
        );
        assert!(monitor.blocked_reason("a").is_some());
        assert!(monitor.check_access("a", "analyze").is_err());
    }

    #[test]
    fn test_unblock() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        monitor.check_access("a", "mass_surveillance").unwrap_err();
        assert!(monitor.unblock("a"));
        assert!(!monitor.unblock("a"));
        assert!(monitor.check_access("a", "analyze").is_ok());
    }

    #[test]
    fn test_unblock_resets_history() {
        let mut monitor = UsageMonitor::new(&GuardConfig::default());
        let t0 = Instant::now();
        assert_eq!(
            monitor.log_usage("a", "analyze", Some("who believes this"), t0),
            Some(BlockReason::TargetingUsers)
        );
        assert!(monitor.unblock("a"));
        assert_eq!(monitor.log_usage("a", "analyze", Some("plain claim"), t0), None);
    }
}
