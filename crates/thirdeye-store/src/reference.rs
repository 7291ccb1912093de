//! Stored theories and the historical event reference table

use crate::{json_column, SqliteStore, StoreError};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeSet;
use thirdeye_domain::traits::{HistoricalEventStore, TheoryStore};
use thirdeye_domain::{unix_now, HistoricalEvent, Theory};

fn row_to_theory(row: &rusqlite::Row<'_>) -> Result<Theory, rusqlite::Error> {
    Ok(Theory {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get::<_, i64>(3)? as u64,
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<HistoricalEvent, rusqlite::Error> {
    let characteristics: BTreeSet<String> = json_column(row, 4)?;
    Ok(HistoricalEvent {
        code: row.get(0)?,
        name: row.get(1)?,
        start_year: row.get(2)?,
        revealed_year: row.get(3)?,
        pattern_characteristics: characteristics,
        government_admission: row.get(5)?,
        evidence_destruction: row.get(6)?,
    })
}

impl TheoryStore for SqliteStore {
    type Error = StoreError;

    fn create_theory(&mut self, title: &str, description: &str) -> Result<Theory, Self::Error> {
        let created_at = unix_now();
        self.conn.execute(
            "INSERT INTO theories (title, description, created_at) VALUES (?1, ?2, ?3)",
            params![title, description, created_at as i64],
        )?;
        Ok(Theory {
            id: self.conn.last_insert_rowid(),
            title: title.to_string(),
            description: description.to_string(),
            created_at,
        })
    }

    fn get_theory(&self, id: i64) -> Result<Option<Theory>, Self::Error> {
        let theory = self
            .conn
            .query_row(
                "SELECT id, title, description, created_at FROM theories WHERE id = ?1",
                params![id],
                row_to_theory,
            )
            .optional()?;
        Ok(theory)
    }

    fn list_theories(&self) -> Result<Vec<Theory>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, created_at FROM theories ORDER BY id DESC",
        )?;
        let theories = stmt
            .query_map([], row_to_theory)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(theories)
    }
}

impl HistoricalEventStore for SqliteStore {
    type Error = StoreError;

    fn upsert_events(&mut self, events: &[HistoricalEvent]) -> Result<usize, Self::Error> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO historical_events
                    (code, name, start_year, revealed_year, pattern_characteristics,
                     government_admission, evidence_destruction)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(code) DO UPDATE SET
                    name = excluded.name,
                    start_year = excluded.start_year,
                    revealed_year = excluded.revealed_year,
                    pattern_characteristics = excluded.pattern_characteristics,
                    government_admission = excluded.government_admission,
                    evidence_destruction = excluded.evidence_destruction",
            )?;
            for event in events {
                stmt.execute(params![
                    &event.code,
                    &event.name,
                    event.start_year,
                    event.revealed_year,
                    serde_json::to_string(&event.pattern_characteristics)?,
                    event.government_admission,
                    event.evidence_destruction,
                ])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    fn get_event(&self, code: &str) -> Result<Option<HistoricalEvent>, Self::Error> {
        let event = self
            .conn
            .query_row(
                "SELECT code, name, start_year, revealed_year, pattern_characteristics,
                        government_admission, evidence_destruction
                 FROM historical_events WHERE code = ?1",
                params![code],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    fn list_events(&self) -> Result<Vec<HistoricalEvent>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT code, name, start_year, revealed_year, pattern_characteristics,
                    government_admission, evidence_destruction
             FROM historical_events ORDER BY code",
        )?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
