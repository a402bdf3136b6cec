// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction history: SQLite table of past results, newest kept.
//
// Schema:
//   history(
//     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//     request_id  TEXT    NOT NULL,   -- UUID of the extraction request
//     timestamp   TEXT    NOT NULL,   -- RFC 3339
//     fingerprint TEXT    NOT NULL,   -- SHA-256 hex of the uploaded image
//     method      TEXT    NOT NULL,   -- "fast" or "fallback"
//     confidence  REAL,               -- absent when the engine reported none
//     characters  INTEGER NOT NULL,
//     text        TEXT    NOT NULL
//   )

use std::path::Path;

use chrono::Utc;
use lesewerk_core::error::LesewerkError;
use lesewerk_core::{ExtractionResult, Method, RequestId};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS history (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id  TEXT    NOT NULL,
        timestamp   TEXT    NOT NULL,
        fingerprint TEXT    NOT NULL,
        method      TEXT    NOT NULL,
        confidence  REAL,
        characters  INTEGER NOT NULL,
        text        TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS history_fingerprint ON history (fingerprint);";

const COLUMNS: &str = "id, request_id, timestamp, fingerprint, method, confidence, characters, text";

/// Convert a `rusqlite::Error` into a `LesewerkError::Database`.
fn db_err(e: rusqlite::Error) -> LesewerkError {
    LesewerkError::Database(e.to_string())
}

/// One stored extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub request_id: RequestId,
    pub timestamp: String,
    pub fingerprint: String,
    pub method: Method,
    pub confidence: Option<f32>,
    pub characters: u64,
    pub text: String,
}

impl HistoryEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let request_id: String = row.get(1)?;
        let request_id = Uuid::parse_str(&request_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        let method: String = row.get(4)?;
        let method = match method.as_str() {
            "fast" => Method::Fast,
            "fallback" => Method::Fallback,
            other => {
                return Err(rusqlite::Error::FromSqlConversionFailure(
                    4,
                    Type::Text,
                    format!("unknown extraction method {other:?}").into(),
                ));
            }
        };
        Ok(Self {
            id: row.get(0)?,
            request_id: RequestId(request_id),
            timestamp: row.get(2)?,
            fingerprint: row.get(3)?,
            method,
            confidence: row.get::<_, Option<f64>>(5)?.map(|c| c as f32),
            characters: row.get::<_, i64>(6)?.max(0) as u64,
            text: row.get(7)?,
        })
    }
}

/// SQLite-backed extraction history.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (or create) the history database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LesewerkError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("history store opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, LesewerkError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Store a successful extraction and return its row id.
    #[instrument(skip(self, result), fields(%request_id, method = %result.method))]
    pub fn record(
        &self,
        request_id: RequestId,
        fingerprint: &str,
        result: &ExtractionResult,
    ) -> Result<i64, LesewerkError> {
        let timestamp = Utc::now().to_rfc3339();
        let characters = i64::try_from(result.stats.characters).unwrap_or(i64::MAX);

        self.conn
            .execute(
                "INSERT INTO history
                    (request_id, timestamp, fingerprint, method, confidence, characters, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request_id.to_string(),
                    timestamp,
                    fingerprint,
                    result.method.as_str(),
                    result.confidence.map(f64::from),
                    characters,
                    result.text,
                ],
            )
            .map_err(db_err)?;

        let id = self.conn.last_insert_rowid();
        debug!(id, "history entry recorded");
        Ok(id)
    }

    /// The newest `limit` entries, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<HistoryEntry>, LesewerkError> {
        self.query(
            &format!("SELECT {COLUMNS} FROM history ORDER BY id DESC LIMIT ?1"),
            params![limit],
        )
    }

    /// Every extraction of the image with `fingerprint`, oldest first.
    pub fn for_fingerprint(&self, fingerprint: &str) -> Result<Vec<HistoryEntry>, LesewerkError> {
        self.query(
            &format!("SELECT {COLUMNS} FROM history WHERE fingerprint = ?1 ORDER BY id ASC"),
            params![fingerprint],
        )
    }

    pub fn count(&self) -> Result<u64, LesewerkError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))
            .map_err(db_err)
    }

    /// Delete every entry. Returns the number removed.
    pub fn clear(&self) -> Result<usize, LesewerkError> {
        let removed = self.conn.execute("DELETE FROM history", []).map_err(db_err)?;
        debug!(removed, "history cleared");
        Ok(removed)
    }

    /// Keep only the newest `keep` entries. Returns the number removed.
    pub fn prune(&self, keep: u32) -> Result<usize, LesewerkError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM history
                 WHERE id NOT IN (SELECT id FROM history ORDER BY id DESC LIMIT ?1)",
                params![keep],
            )
            .map_err(db_err)?;
        if removed > 0 {
            debug!(removed, keep, "history pruned");
        }
        Ok(removed)
    }

    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<HistoryEntry>, LesewerkError> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, HistoryEntry::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use lesewerk_core::TextStats;

    fn make_store() -> HistoryStore {
        HistoryStore::open_in_memory().expect("open in-memory history")
    }

    fn result(text: &str, method: Method, confidence: Option<f32>) -> ExtractionResult {
        ExtractionResult {
            text: text.to_string(),
            method,
            confidence,
            fallback_used: method == Method::Fallback,
            preprocessed: false,
            stats: TextStats::of(text),
        }
    }

    #[test]
    fn record_and_count() {
        let store = make_store();
        assert_eq!(store.count().unwrap(), 0);

        store
            .record(RequestId::new(), "aaa", &result("one", Method::Fast, Some(80.0)))
            .unwrap();
        store
            .record(RequestId::new(), "bbb", &result("two", Method::Fallback, None))
            .unwrap();

        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn entries_round_trip_fields() {
        let store = make_store();
        let id = RequestId::new();
        let hash = fingerprint(b"receipt.png");
        store
            .record(id, &hash, &result("Total 12.50", Method::Fallback, None))
            .unwrap();

        let entries = store.for_fingerprint(&hash).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.request_id, id);
        assert_eq!(entry.method, Method::Fallback);
        assert_eq!(entry.confidence, None);
        assert_eq!(entry.characters, 11);
        assert_eq!(entry.text, "Total 12.50");
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn for_fingerprint_filters_and_orders() {
        let store = make_store();
        store
            .record(RequestId::new(), "aaa", &result("first", Method::Fast, Some(70.0)))
            .unwrap();
        store
            .record(RequestId::new(), "bbb", &result("other", Method::Fast, Some(70.0)))
            .unwrap();
        store
            .record(RequestId::new(), "aaa", &result("second", Method::Fast, Some(75.5)))
            .unwrap();

        let entries = store.for_fingerprint("aaa").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "first");
        assert_eq!(entries[1].confidence, Some(75.5));
    }

    #[test]
    fn recent_is_newest_first() {
        let store = make_store();
        for i in 0..5 {
            store
                .record(
                    RequestId::new(),
                    &format!("hash_{i}"),
                    &result(&format!("text {i}"), Method::Fast, Some(90.0)),
                )
                .unwrap();
        }

        let recent = store.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
        assert_eq!(recent[0].text, "text 4");
    }

    #[test]
    fn prune_keeps_newest() {
        let store = make_store();
        for i in 0..10 {
            store
                .record(
                    RequestId::new(),
                    "same",
                    &result(&format!("text {i}"), Method::Fast, Some(90.0)),
                )
                .unwrap();
        }

        assert_eq!(store.prune(4).unwrap(), 6);
        assert_eq!(store.count().unwrap(), 4);
        let remaining = store.recent(10).unwrap();
        assert_eq!(remaining.last().unwrap().text, "text 6");
        assert_eq!(store.prune(4).unwrap(), 0);
    }

    #[test]
    fn clear_removes_everything() {
        let store = make_store();
        store
            .record(RequestId::new(), "aaa", &result("x y z", Method::Fast, Some(90.0)))
            .unwrap();
        assert_eq!(store.clear().unwrap(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let store = HistoryStore::open(&path).unwrap();
            store
                .record(RequestId::new(), "aaa", &result("kept", Method::Fast, Some(88.0)))
                .unwrap();
        }

        let reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.recent(1).unwrap()[0].text, "kept");
    }
}
