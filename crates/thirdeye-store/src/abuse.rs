//! Abuse report audit trail

use crate::{conversion_error, SqliteStore, StoreError};
use rusqlite::params;
use rusqlite::types::Type;
use std::sync::{Arc, Mutex};
use thirdeye_domain::traits::AbuseReportSink;
use thirdeye_domain::{AbuseKind, AbuseReport, Severity};

impl SqliteStore {
    /// Append one abuse report
    pub fn insert_abuse_report(&mut self, report: &AbuseReport) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO abuse_reports (actor, kind, severity, description, automated, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &report.actor,
                report.kind.as_str(),
                report.severity.as_str(),
                &report.description,
                report.automated,
                report.created_at as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List abuse reports, optionally for one actor, oldest first
    pub fn list_abuse_reports(&self, actor: Option<&str>) -> Result<Vec<AbuseReport>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT actor, kind, severity, description, automated, created_at
             FROM abuse_reports
             WHERE ?1 IS NULL OR actor = ?1
             ORDER BY id ASC",
        )?;
        let reports = stmt
            .query_map(params![actor], |row| {
                let kind: String = row.get(1)?;
                let severity: String = row.get(2)?;
                Ok(AbuseReport {
                    actor: row.get(0)?,
                    kind: AbuseKind::parse(&kind).ok_or_else(|| {
                        conversion_error(
                            1,
                            Type::Text,
                            StoreError::InvalidData(format!("Unknown abuse kind: {}", kind)),
                        )
                    })?,
                    severity: Severity::parse(&severity).ok_or_else(|| {
                        conversion_error(
                            2,
                            Type::Text,
                            StoreError::InvalidData(format!("Unknown severity: {}", severity)),
                        )
                    })?,
                    description: row.get(3)?,
                    automated: row.get(4)?,
                    created_at: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }
}

/// Abuse report sink backed by a shared [`SqliteStore`]
#[derive(Clone)]
pub struct StoreReportSink(Arc<Mutex<SqliteStore>>);

impl StoreReportSink {
    /// Create a sink writing through the given store
    pub fn new(store: Arc<Mutex<SqliteStore>>) -> Self {
        Self(store)
    }
}

impl AbuseReportSink for StoreReportSink {
    fn submit(&self, report: &AbuseReport) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut store = self
            .0
            .lock()
            .map_err(|e| format!("Store lock error: {}", e))?;
        store.insert_abuse_report(report)?;
        Ok(())
    }
}
