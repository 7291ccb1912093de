//! Thirdeye Misuse & Bias Guard
//!
//! Gates every pipeline invocation and audits forks for bias.
//!
//! The guard provides:
//! - Sliding-window rate limiting with rapid-fire reports
//! - Advisory repetitive-query and suspicious-keyword reports
//! - Usage-pattern blocking (mass automation, targeting, censorship)
//! - Fork source auditing with a SAFE/MODIFIED/COMPROMISED verdict
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use thirdeye_gatekeeper::{GuardConfig, MemorySink, MisuseGuard};
//!
//! let sink = MemorySink::new();
//! let guard = MisuseGuard::new(GuardConfig::default(), Arc::new(sink.clone())).unwrap();
//!
//! assert!(guard.admit("203.0.113.7", "analyze", Some("Was COINTELPRO real?")).is_ok());
//! assert!(sink.reports().is_empty());
//! ```

#![warn(missing_docs)]

mod audit;
mod config;
mod detector;
mod error;
mod guard;
mod sink;
mod usage;
mod window;
mod worker;

pub use audit::{AuditSeverity, Detection, DetectionKind, ForkAudit, ForkAuditor, ForkVerdict, RiskLevel};
pub use config::GuardConfig;
pub use detector::{AbuseDetector, Inspection};
pub use error::GuardError;
pub use guard::MisuseGuard;
pub use sink::MemorySink;
pub use usage::{BlockReason, UsageMonitor};
pub use window::ActorWindows;
pub use worker::GuardWorker;
