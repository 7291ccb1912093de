//! The misuse guard wrapping every pipeline entry point

use crate::config::GuardConfig;
use crate::detector::{AbuseDetector, Inspection};
use crate::error::GuardError;
use crate::usage::{BlockReason, UsageMonitor};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use thirdeye_domain::traits::AbuseReportSink;
use thirdeye_domain::{AbuseKind, AbuseReport, Severity};
use tokio::sync::watch;
use tracing::{debug, warn};

struct GuardState {
    detector: AbuseDetector,
    monitor: UsageMonitor,
}

/// Process-wide misuse guard
///
/// Checks run in a fixed order: block list, rate window, advisory content
/// signals, then usage logging. Every signal is reported to the sink;
/// sink failures are logged and never reject the request.
pub struct MisuseGuard {
    state: Mutex<GuardState>,
    sink: Arc<dyn AbuseReportSink>,
    config: GuardConfig,
    stop: watch::Sender<bool>,
}

impl MisuseGuard {
    /// Create a guard reporting to `sink`
    pub fn new(config: GuardConfig, sink: Arc<dyn AbuseReportSink>) -> Result<Self, GuardError> {
        config.validate().map_err(GuardError::Config)?;
        let (stop, _) = watch::channel(false);
        Ok(Self {
            state: Mutex::new(GuardState {
                detector: AbuseDetector::new(&config),
                monitor: UsageMonitor::new(&config),
            }),
            sink,
            config,
            stop,
        })
    }

    /// Guard configuration
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, GuardState>, GuardError> {
        self.state
            .lock()
            .map_err(|e| GuardError::State(format!("Guard lock error: {}", e)))
    }

    /// Admit or reject one invocation
    pub fn admit(&self, actor: &str, action: &str, query: Option<&str>) -> Result<(), GuardError> {
        self.admit_at(actor, action, query, Instant::now())
    }

    /// Admit or reject one invocation against a fixed clock
    pub fn admit_at(
        &self,
        actor: &str,
        action: &str,
        query: Option<&str>,
        now: Instant,
    ) -> Result<(), GuardError> {
        let (outcome, reports) = {
            let mut state = self.lock()?;
            let state = &mut *state;
            if let Some(reason) = state.monitor.blocked_reason(actor).cloned() {
                warn!(actor, action, reason = reason.code(), "Rejected blocked actor");
                let reports = state
                    .detector
                    .first_in_window(actor, AbuseKind::BlockedActor, now)
                    .then(|| {
                        AbuseReport::automated(
                            actor,
                            AbuseKind::BlockedActor,
                            Severity::High,
                            format!("Blocked actor attempted {}: {}", action, reason),
                        )
                    });
                (Err(GuardError::Blocked(reason)), reports.into_iter().collect())
            } else {
                match state.monitor.check_access(actor, action) {
                    Err(reason) => (Err(GuardError::Blocked(reason)), Vec::new()),
                    Ok(()) => match state.detector.inspect(actor, query, now) {
                        Inspection::Rejected { retry_after_secs, report } => (
                            Err(GuardError::RateLimited { retry_after_secs }),
                            report.into_iter().collect(),
                        ),
                        Inspection::Admitted(reports) => {
                            let outcome = match state.monitor.log_usage(actor, action, query, now) {
                                Some(reason) => Err(GuardError::Blocked(reason)),
                                None => Ok(()),
                            };
                            (outcome, reports)
                        }
                    },
                }
            }
        };

        self.report(&reports);
        if let Err(e) = &outcome {
            debug!(actor, action, error = %e, "Invocation rejected");
        }
        outcome
    }

    fn report(&self, reports: &[AbuseReport]) {
        for report in reports {
            warn!(
                actor = %report.actor,
                kind = report.kind.as_str(),
                severity = report.severity.as_str(),
                "{}",
                report.description
            );
            if let Err(e) = self.sink.submit(report) {
                warn!(actor = %report.actor, error = %e, "Failed to record abuse report");
            }
        }
    }

    /// Block reason for an actor, if blocked
    pub fn blocked_reason(&self, actor: &str) -> Result<Option<BlockReason>, GuardError> {
        Ok(self.lock()?.monitor.blocked_reason(actor).cloned())
    }

    /// All blocked actors
    pub fn blocked_actors(&self) -> Result<Vec<(String, BlockReason)>, GuardError> {
        Ok(self.lock()?.monitor.blocked_actors())
    }

    /// Manually lift a block; returns whether the actor was blocked
    pub fn unblock(&self, actor: &str) -> Result<bool, GuardError> {
        Ok(self.lock()?.monitor.unblock(actor))
    }

    /// Evict expired window entries
    pub fn sweep(&self) -> Result<usize, GuardError> {
        self.sweep_at(Instant::now())
    }

    /// Evict entries expired as of `now`
    pub fn sweep_at(&self, now: Instant) -> Result<usize, GuardError> {
        let mut state = self.lock()?;
        Ok(state.detector.evict_expired(now) + state.monitor.evict_expired(now))
    }

    /// Forget all window and block state and stop running workers
    pub fn clear(&self) -> Result<(), GuardError> {
        {
            let mut state = self.lock()?;
            state.detector.clear();
            state.monitor.clear();
        }
        self.stop.send_replace(true);
        Ok(())
    }

    pub(crate) fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::time::Duration;

    fn guard(config: GuardConfig) -> (MisuseGuard, MemorySink) {
        let sink = MemorySink::new();
        let guard = MisuseGuard::new(config, Arc::new(sink.clone())).unwrap();
        (guard, sink)
    }

    #[test]
    fn test_six_rapid_requests() {
        let (guard, sink) = guard(GuardConfig::default());
        let t0 = Instant::now();
        for i in 0..5 {
            guard
                .admit_at("a", "analyze", Some(&format!("claim {}", i)), t0)
                .unwrap();
        }
        let err = guard.admit_at("a", "analyze", Some("claim 5"), t0).unwrap_err();
        assert!(matches!(err, GuardError::RateLimited { retry_after_secs: 10 }));

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, AbuseKind::RapidFire);
    }

    #[test]
    fn test_blocked_after_mass_usage() {
        let (guard, _) = guard(GuardConfig::default());
        let t0 = Instant::now();
        for i in 0..100u64 {
            guard
                .admit_at("bot", "analyze", None, t0 + Duration::from_secs(i * 2))
                .unwrap();
        }
        let err = guard
            .admit_at("bot", "analyze", None, t0 + Duration::from_secs(200))
            .unwrap_err();
        assert_eq!(err, GuardError::Blocked(BlockReason::MassAutomation));
        assert!(matches!(
            guard.admit_at("bot", "analyze", None, t0 + Duration::from_secs(3000)),
            Err(GuardError::Blocked(_))
        ));

        assert!(guard.unblock("bot").unwrap());
        assert!(guard.blocked_reason("bot").unwrap().is_none());
    }

    #[test]
    fn test_blocked_rejection_is_reported() {
        let (guard, sink) = guard(GuardConfig::default());
        let t0 = Instant::now();
        for i in 0..101u64 {
            let _ = guard.admit_at("bot", "analyze", None, t0 + Duration::from_secs(i * 2));
        }
        assert!(sink.reports().iter().all(|r| r.kind != AbuseKind::BlockedActor));

        // 102nd request: rejected at entry and reported
        let at = t0 + Duration::from_secs(204);
        assert!(matches!(
            guard.admit_at("bot", "analyze", None, at),
            Err(GuardError::Blocked(BlockReason::MassAutomation))
        ));
        let blocked: Vec<AbuseReport> = sink
            .reports()
            .into_iter()
            .filter(|r| r.kind == AbuseKind::BlockedActor)
            .collect();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].severity, Severity::High);
        assert_eq!(blocked[0].actor, "bot");

        // Repeats inside the same rate window are not reported again
        guard.admit_at("bot", "analyze", None, at + Duration::from_secs(1)).unwrap_err();
        guard.admit_at("bot", "analyze", None, at + Duration::from_secs(20)).unwrap_err();
        let count = sink.reports().iter().filter(|r| r.kind == AbuseKind::BlockedActor).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_rapid_fire_reported_once_while_hammering() {
        let (guard, sink) = guard(GuardConfig::default());
        let t0 = Instant::now();
        for i in 0..50 {
            let _ = guard.admit_at("a", "analyze", Some(&format!("claim {}", i)), t0);
        }
        let rapid_fire = sink.reports().iter().filter(|r| r.kind == AbuseKind::RapidFire).count();
        assert_eq!(rapid_fire, 1);
    }

    #[test]
    fn test_advisory_signals_do_not_reject() {
        let (guard, sink) = guard(GuardConfig::default());
        let t0 = Instant::now();
        guard.admit_at("a", "analyze", Some("spam filter study"), t0).unwrap();
        guard.admit_at("a", "analyze", Some("spam filter study"), t0).unwrap();

        let kinds: Vec<AbuseKind> = sink.reports().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![AbuseKind::SuspiciousKeywords, AbuseKind::RepetitiveQuery, AbuseKind::SuspiciousKeywords]
        );
    }

    #[test]
    fn test_sink_failure_does_not_block() {
        let guard = MisuseGuard::new(GuardConfig::default(), Arc::new(MemorySink::failing())).unwrap();
        assert!(guard.admit("a", "analyze", Some("how to hack")).is_ok());
    }

    #[test]
    fn test_prohibited_action() {
        let (guard, _) = guard(GuardConfig::default());
        let err = guard.admit("a", "identify_believers", None).unwrap_err();
        assert_eq!(
            err,
            GuardError::Blocked(BlockReason::ProhibitedAction("identify_believers".to_string()))
        );
        assert_eq!(guard.blocked_actors().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_resets_state() {
        let (guard, _) = guard(GuardConfig::default());
        guard.admit("a", "censor_results", None).unwrap_err();
        guard.clear().unwrap();
        assert!(guard.admit("a", "analyze", None).is_ok());
    }
}
