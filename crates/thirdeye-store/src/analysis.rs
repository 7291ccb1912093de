//! Analysis results, their children, query log and watermarks

use crate::{conversion_error, json_column, sources::ensure_source, SqliteStore, StoreError};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use thirdeye_domain::traits::AnalysisStore;
use thirdeye_domain::{
    AnalysisId, AnalysisRecord, AnalysisResult, AnalysisSummary, ComponentScores, EvidenceItem,
    PatternMatch, ProvenanceType, QueryEntry, SourceType, TemporalMetrics, Watermark,
    WatermarkCode,
};

fn id_column(row: &rusqlite::Row<'_>, column: usize) -> Result<AnalysisId, rusqlite::Error> {
    let bytes: Vec<u8> = row.get(column)?;
    SqliteStore::bytes_to_analysis_id(&bytes).map_err(|e| conversion_error(column, Type::Blob, e))
}

fn row_to_evidence(row: &rusqlite::Row<'_>) -> Result<EvidenceItem, rusqlite::Error> {
    let type_str: String = row.get(5)?;
    let provenance_str: String = row.get(8)?;
    Ok(EvidenceItem {
        title: row.get(0)?,
        url: row.get(1)?,
        domain: row.get(2)?,
        snippet: row.get(3)?,
        publish_date: row.get(4)?,
        source_type: SourceType::parse(&type_str).ok_or_else(|| {
            conversion_error(
                5,
                Type::Text,
                StoreError::InvalidData(format!("Unknown source type: {}", type_str)),
            )
        })?,
        quality_score: row.get(6)?,
        is_primary: row.get(7)?,
        provenance_type: ProvenanceType::parse(&provenance_str).ok_or_else(|| {
            conversion_error(
                8,
                Type::Text,
                StoreError::InvalidData(format!("Unknown provenance: {}", provenance_str)),
            )
        })?,
    })
}

fn row_to_match(row: &rusqlite::Row<'_>) -> Result<PatternMatch, rusqlite::Error> {
    let start_year: i32 = row.get(5)?;
    let revealed_year: i32 = row.get(6)?;
    Ok(PatternMatch {
        event_code: row.get(0)?,
        event_name: row.get(1)?,
        similarity_score: row.get(2)?,
        matching_characteristics: json_column(row, 3)?,
        differences: json_column(row, 4)?,
        temporal_metrics: TemporalMetrics {
            denial_to_admission_years: revealed_year - start_year,
            government_admission: row.get(7)?,
            evidence_destruction: row.get(8)?,
        },
    })
}

fn load_evidence(conn: &Connection, id_bytes: &[u8]) -> Result<Vec<EvidenceItem>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT title, url, domain, snippet, publish_date, source_type,
                quality_score, is_primary, provenance_type
         FROM evidence_items WHERE analysis_id = ?1 ORDER BY position",
    )?;
    let items = stmt
        .query_map(params![id_bytes], row_to_evidence)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn load_matches(conn: &Connection, id_bytes: &[u8]) -> Result<Vec<PatternMatch>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT m.event_code, e.name, m.similarity_score, m.matching_characteristics,
                m.differences, e.start_year, e.revealed_year,
                e.government_admission, e.evidence_destruction
         FROM pattern_matches m
         JOIN historical_events e ON e.code = m.event_code
         WHERE m.analysis_id = ?1
         ORDER BY m.position",
    )?;
    let matches = stmt
        .query_map(params![id_bytes], row_to_match)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(matches)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl AnalysisStore for SqliteStore {
    type Error = StoreError;

    fn record_query(&mut self, entry: &QueryEntry) -> Result<i64, Self::Error> {
        self.conn.execute(
            "INSERT INTO analysis_queries (actor, query_text, query_type, ip, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &entry.actor,
                &entry.query_text,
                &entry.query_type,
                &entry.ip,
                thirdeye_domain::unix_now() as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_analysis(&mut self, result: &AnalysisResult) -> Result<Vec<String>, Self::Error> {
        let id_bytes = Self::analysis_id_to_bytes(result.id);
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO analysis_results
                (id, query_id, actor, query_text, evidence_quality_score,
                 source_credibility_score, logical_consistency_score,
                 overall_confidence_score, corroboration_score, destruction_indicators,
                 source_metrics, summary, strengths, weaknesses, red_flags,
                 investigation_needed, reasoning, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                &id_bytes,
                result.query_id,
                &result.actor,
                &result.query,
                result.scores.evidence_quality_score,
                result.scores.source_credibility_score,
                result.scores.logical_consistency_score,
                result.overall_confidence_score,
                result.corroboration_score,
                result.destruction_indicators,
                serde_json::to_string(&result.source_metrics)?,
                &result.summary,
                serde_json::to_string(&result.strengths)?,
                serde_json::to_string(&result.weaknesses)?,
                serde_json::to_string(&result.red_flags)?,
                serde_json::to_string(&result.investigation_needed)?,
                &result.reasoning,
                result.created_at as i64,
            ],
        )?;

        for (position, item) in result.evidence.iter().enumerate() {
            let source_id = match &item.domain {
                Some(domain) => Some(ensure_source(&tx, domain, item.source_type)?),
                None => None,
            };
            tx.execute(
                "INSERT INTO evidence_items
                    (analysis_id, position, source_id, title, url, domain, snippet,
                     publish_date, source_type, quality_score, is_primary, provenance_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    &id_bytes,
                    position as i64,
                    source_id,
                    &item.title,
                    &item.url,
                    &item.domain,
                    &item.snippet,
                    &item.publish_date,
                    item.source_type.as_str(),
                    item.quality_score,
                    item.is_primary,
                    item.provenance_type.as_str(),
                ],
            )?;
        }

        let mut skipped = Vec::new();
        for (position, pattern) in result.pattern_matches.iter().enumerate() {
            let known = tx
                .query_row(
                    "SELECT 1 FROM historical_events WHERE code = ?1",
                    params![&pattern.event_code],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !known {
                skipped.push(pattern.event_code.clone());
                continue;
            }
            tx.execute(
                "INSERT INTO pattern_matches
                    (analysis_id, event_code, position, similarity_score,
                     matching_characteristics, differences)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &id_bytes,
                    &pattern.event_code,
                    position as i64,
                    pattern.similarity_score,
                    serde_json::to_string(&pattern.matching_characteristics)?,
                    serde_json::to_string(&pattern.differences)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(skipped)
    }

    fn insert_watermark(&mut self, watermark: &Watermark) -> Result<(), Self::Error> {
        let id_bytes = Self::analysis_id_to_bytes(watermark.analysis_id);
        self.conn
            .execute(
                "INSERT INTO watermarks (code, analysis_id, created_at) VALUES (?1, ?2, ?3)",
                params![watermark.code.as_str(), &id_bytes, watermark.created_at as i64],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateWatermark(watermark.code.to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(())
    }

    /// Only stamped results are visible; a result without a watermark is
    /// reported as missing.
    fn get_analysis(&self, id: AnalysisId) -> Result<Option<AnalysisRecord>, Self::Error> {
        let id_bytes = Self::analysis_id_to_bytes(id);

        let header = self
            .conn
            .query_row(
                "SELECT r.id, r.query_id, r.actor, r.query_text, r.evidence_quality_score,
                        r.source_credibility_score, r.logical_consistency_score,
                        r.overall_confidence_score, r.corroboration_score,
                        r.destruction_indicators, r.source_metrics, r.summary, r.strengths,
                        r.weaknesses, r.red_flags, r.investigation_needed, r.reasoning,
                        r.created_at, w.code
                 FROM analysis_results r
                 JOIN watermarks w ON w.analysis_id = r.id
                 WHERE r.id = ?1",
                params![&id_bytes],
                |row| {
                    let result = AnalysisResult {
                        id: id_column(row, 0)?,
                        query_id: row.get(1)?,
                        actor: row.get(2)?,
                        query: row.get(3)?,
                        scores: ComponentScores {
                            evidence_quality_score: row.get(4)?,
                            source_credibility_score: row.get(5)?,
                            logical_consistency_score: row.get(6)?,
                        },
                        overall_confidence_score: row.get(7)?,
                        corroboration_score: row.get(8)?,
                        destruction_indicators: row.get(9)?,
                        source_metrics: json_column(row, 10)?,
                        summary: row.get(11)?,
                        strengths: json_column(row, 12)?,
                        weaknesses: json_column(row, 13)?,
                        red_flags: json_column(row, 14)?,
                        investigation_needed: json_column(row, 15)?,
                        reasoning: row.get(16)?,
                        evidence: Vec::new(),
                        pattern_matches: Vec::new(),
                        created_at: row.get::<_, i64>(17)? as u64,
                    };
                    let watermark: String = row.get(18)?;
                    Ok((result, watermark))
                },
            )
            .optional()?;

        let Some((mut result, watermark)) = header else {
            return Ok(None);
        };
        result.evidence = load_evidence(&self.conn, &id_bytes)?;
        result.pattern_matches = load_matches(&self.conn, &id_bytes)?;

        Ok(Some(AnalysisRecord { result, watermark }))
    }

    /// Unstamped results are left out, matching `get_analysis`.
    fn list_analyses(
        &self,
        actor: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<AnalysisSummary>, Self::Error> {
        let page = page.max(1);
        let offset = (page as i64 - 1) * per_page as i64;

        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.query_text, r.overall_confidence_score, r.created_at, w.code
             FROM analysis_results r
             JOIN watermarks w ON w.analysis_id = r.id
             WHERE r.actor = ?1
             ORDER BY r.id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let summaries = stmt
            .query_map(params![actor, per_page as i64, offset], |row| {
                Ok(AnalysisSummary {
                    id: id_column(row, 0)?,
                    query: row.get(1)?,
                    overall_confidence_score: row.get(2)?,
                    created_at: row.get::<_, i64>(3)? as u64,
                    watermark: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn verify_watermark(&self, code: &WatermarkCode) -> Result<Option<Watermark>, Self::Error> {
        let watermark = self
            .conn
            .query_row(
                "SELECT code, analysis_id, created_at FROM watermarks WHERE code = ?1",
                params![code.as_str()],
                |row| {
                    let code: String = row.get(0)?;
                    Ok(Watermark {
                        code: WatermarkCode::parse(&code).map_err(|e| {
                            conversion_error(0, Type::Text, StoreError::InvalidData(e))
                        })?,
                        analysis_id: id_column(row, 1)?,
                        created_at: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(watermark)
    }
}
