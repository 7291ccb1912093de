//! Source credibility profiles

use crate::{conversion_error, SqliteStore, StoreError};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use thirdeye_domain::source::NEUTRAL_CREDIBILITY;
use thirdeye_domain::traits::SourceStore;
use thirdeye_domain::{unix_now, BiasRating, Source, SourceType, VerificationOutcome};

fn row_to_source(row: &rusqlite::Row<'_>) -> Result<Source, rusqlite::Error> {
    let type_str: String = row.get(1)?;
    let source_type = SourceType::parse(&type_str).ok_or_else(|| {
        conversion_error(
            1,
            Type::Text,
            StoreError::InvalidData(format!("Unknown source type: {}", type_str)),
        )
    })?;
    let bias: String = row.get(3)?;

    Ok(Source {
        domain: row.get(0)?,
        source_type,
        credibility_score: row.get(2)?,
        bias_rating: BiasRating::parse_lenient(&bias),
        verified_accurate: row.get::<_, i64>(4)? as u32,
        verified_inaccurate: row.get::<_, i64>(5)? as u32,
    })
}

fn load_source(conn: &Connection, domain: &str) -> Result<Option<Source>, StoreError> {
    let source = conn
        .query_row(
            "SELECT domain, source_type, credibility_score, bias_rating,
                    verified_accurate, verified_inaccurate
             FROM sources WHERE domain = ?1",
            params![domain],
            row_to_source,
        )
        .optional()?;
    Ok(source)
}

/// Insert a neutral profile if the domain is new; return its row id
pub(crate) fn ensure_source(
    conn: &Connection,
    domain: &str,
    source_type: SourceType,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO sources (domain, source_type, credibility_score, bias_rating, updated_at)
         VALUES (?1, ?2, ?3, 'unknown', ?4)
         ON CONFLICT(domain) DO NOTHING",
        params![domain, source_type.as_str(), NEUTRAL_CREDIBILITY, unix_now() as i64],
    )?;
    let id = conn.query_row(
        "SELECT id FROM sources WHERE domain = ?1",
        params![domain],
        |row| row.get(0),
    )?;
    Ok(id)
}

impl SqliteStore {
    /// Set the bias rating of a known source
    pub fn set_bias_rating(&mut self, domain: &str, rating: BiasRating) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE sources SET bias_rating = ?2, updated_at = ?3 WHERE domain = ?1",
            params![domain, rating.as_str(), unix_now() as i64],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("source {}", domain)));
        }
        Ok(())
    }
}

impl SourceStore for SqliteStore {
    type Error = StoreError;

    fn get_source(&self, domain: &str) -> Result<Option<Source>, Self::Error> {
        load_source(&self.conn, domain)
    }

    fn get_or_create_source(
        &mut self,
        domain: &str,
        source_type: SourceType,
    ) -> Result<Source, Self::Error> {
        let tx = self.conn.transaction()?;
        ensure_source(&tx, domain, source_type)?;
        let source = load_source(&tx, domain)?
            .ok_or_else(|| StoreError::NotFound(format!("source {}", domain)))?;
        tx.commit()?;
        Ok(source)
    }

    fn record_outcome(
        &mut self,
        domain: &str,
        source_type: SourceType,
        outcome: VerificationOutcome,
    ) -> Result<Source, Self::Error> {
        // IMMEDIATE takes the write lock before the read, so no other
        // connection can interleave between SELECT and UPDATE.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_source(&tx, domain, source_type)?;
        let current = load_source(&tx, domain)?
            .ok_or_else(|| StoreError::NotFound(format!("source {}", domain)))?;
        let updated = current.apply_outcome(outcome);

        tx.execute(
            "UPDATE sources
             SET credibility_score = ?2, verified_accurate = ?3,
                 verified_inaccurate = ?4, updated_at = ?5
             WHERE domain = ?1",
            params![
                domain,
                updated.credibility_score,
                updated.verified_accurate as i64,
                updated.verified_inaccurate as i64,
                unix_now() as i64,
            ],
        )?;
        tx.commit()?;

        Ok(updated)
    }

    fn list_sources(&self, min_credibility: Option<f64>) -> Result<Vec<Source>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, source_type, credibility_score, bias_rating,
                    verified_accurate, verified_inaccurate
             FROM sources
             WHERE credibility_score >= ?1
             ORDER BY credibility_score DESC, domain ASC",
        )?;
        let sources = stmt
            .query_map(params![min_credibility.unwrap_or(0.0)], row_to_source)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }
}
