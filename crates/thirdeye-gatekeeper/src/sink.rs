//! In-memory abuse report sink

use std::sync::{Arc, Mutex};
use thirdeye_domain::traits::AbuseReportSink;
use thirdeye_domain::AbuseReport;

/// Sink that keeps reports in memory
///
/// Clones share the same report list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<AbuseReport>>>,
    fail: bool,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every submit fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Reports received so far
    pub fn reports(&self) -> Vec<AbuseReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AbuseReportSink for MemorySink {
    fn submit(&self, report: &AbuseReport) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail {
            return Err("memory sink configured to fail".into());
        }
        self.reports
            .lock()
            .map_err(|e| format!("Sink lock error: {}", e))?
            .push(report.clone());
        Ok(())
    }
}
