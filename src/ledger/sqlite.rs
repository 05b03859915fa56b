//! SQLite-backed progress ledger.

use crate::error::{MediascribeError, Result};
use crate::ledger::{schema, ItemStatus, LedgerEntry, ResultSummary, StatusCounts};
use crate::media::MediaItem;
use crate::transcribe::types::CombinedTranscript;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// One append-only audit event for an item.
#[derive(Debug, Clone)]
pub struct HistoryEvent {
    pub status: String,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// The durable ledger, backed by a single SQLite file.
///
/// Every transition commits in its own transaction. Completed entries are
/// never handed out again; failed entries re-enter the queue only through
/// [`SqliteLedger::retry_failed`].
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::run_migrations(&conn)?;
        info!(path = %path.display(), "ledger opened");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// In-memory ledger; contents vanish on drop.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MediascribeError::Other("ledger connection lock poisoned".to_string()))
    }

    /// Add a surveyed item as pending. Returns false if the key already
    /// exists (in any status) — re-surveying never resets progress.
    pub fn enqueue(&self, item: &MediaItem) -> Result<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO items (key, status, duration_seconds, size_bytes, enqueued_at)
             VALUES (?1, 'pending', ?2, ?3, ?4)
             ON CONFLICT(key) DO NOTHING",
            params![item.key(), item.duration_seconds, item.size_bytes, Utc::now()],
        )?;
        if inserted > 0 {
            record_history(&conn, &item.key(), "pending", Some("enqueued"))?;
        }
        Ok(inserted > 0)
    }

    /// Claim the oldest pending item, marking it in-progress and bumping its
    /// attempt count. Returns `None` when the queue is drained.
    ///
    /// Resume-correct by construction: the pending set is recomputed from
    /// persisted state on every call.
    pub fn claim_next(&self) -> Result<Option<LedgerEntry>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let entry = tx
            .query_row(
                "SELECT key, status, duration_seconds, size_bytes, attempts,
                        last_error, cost_usd, enqueued_at, started_at, finished_at
                 FROM items WHERE status = 'pending'
                 ORDER BY enqueued_at, key LIMIT 1",
                [],
                entry_from_row,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some(mut entry) = entry else {
            return Ok(None);
        };

        let now = Utc::now();
        tx.execute(
            "UPDATE items
             SET status = 'in_progress', attempts = attempts + 1,
                 started_at = ?1, last_error = NULL
             WHERE key = ?2",
            params![now, entry.key],
        )?;
        record_history(&tx, &entry.key, "in_progress", None)?;
        tx.commit()?;

        entry.status = ItemStatus::InProgress;
        entry.attempts += 1;
        entry.started_at = Some(now);
        entry.last_error = None;
        debug!(key = %entry.key, attempt = entry.attempts, "claimed item");
        Ok(Some(entry))
    }

    /// Record a completed item: ledger row, transcript, segments, and audit
    /// event all commit in one transaction.
    pub fn mark_completed(
        &self,
        key: &str,
        transcript: &CombinedTranscript,
        summary: &ResultSummary,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        tx.execute(
            "UPDATE items
             SET status = 'completed', cost_usd = ?1, finished_at = ?2, last_error = NULL
             WHERE key = ?3",
            params![summary.cost_usd, now, key],
        )?;

        tx.execute(
            "INSERT OR REPLACE INTO transcripts
                 (item_key, text, language, model, word_count, character_count,
                  chunk_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                key,
                transcript.text,
                transcript.language,
                summary.model,
                summary.word_count as i64,
                summary.character_count as i64,
                summary.chunk_count,
                now,
            ],
        )?;

        tx.execute(
            "DELETE FROM transcript_segments WHERE item_key = ?1",
            params![key],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO transcript_segments
                     (item_key, sequence, start_seconds, end_seconds, text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (sequence, segment) in transcript.segments.iter().enumerate() {
                insert.execute(params![
                    key,
                    sequence as i64,
                    segment.start_seconds,
                    segment.end_seconds,
                    segment.text,
                ])?;
            }
        }

        let detail = format!(
            "{} chunks, {} retries, {} words, ${:.4}",
            summary.chunk_count, summary.retries, summary.word_count, summary.cost_usd
        );
        record_history(&tx, key, "completed", Some(&detail))?;
        tx.commit()?;
        Ok(())
    }

    /// Record a terminal failure for an item.
    pub fn mark_failed(&self, key: &str, error: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE items
             SET status = 'failed', last_error = ?1, finished_at = ?2
             WHERE key = ?3",
            params![error, Utc::now(), key],
        )?;
        record_history(&tx, key, "failed", Some(error))?;
        tx.commit()?;
        Ok(())
    }

    /// Return items abandoned mid-flight by a killed process to the pending
    /// queue. Called once at startup, before claiming begins.
    pub fn recover_interrupted(&self) -> Result<u32> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let keys: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT key FROM items WHERE status = 'in_progress' ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        tx.execute(
            "UPDATE items SET status = 'pending', started_at = NULL
             WHERE status = 'in_progress'",
            [],
        )?;
        for key in &keys {
            record_history(&tx, key, "pending", Some("recovered after interruption"))?;
        }
        tx.commit()?;

        if !keys.is_empty() {
            info!(count = keys.len(), "recovered interrupted items");
        }
        Ok(keys.len() as u32)
    }

    /// Explicitly move failed items back to pending for another run.
    pub fn retry_failed(&self) -> Result<u32> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let keys: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT key FROM items WHERE status = 'failed' ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        tx.execute(
            "UPDATE items SET status = 'pending', started_at = NULL, finished_at = NULL
             WHERE status = 'failed'",
            [],
        )?;
        for key in &keys {
            record_history(&tx, key, "pending", Some("failed item re-queued"))?;
        }
        tx.commit()?;
        Ok(keys.len() as u32)
    }

    pub fn entry(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT key, status, duration_seconds, size_bytes, attempts,
                    last_error, cost_usd, enqueued_at, started_at, finished_at
             FROM items WHERE key = ?1",
            params![key],
            entry_from_row,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other.into()),
        })
    }

    pub fn all_pending(&self) -> Result<Vec<LedgerEntry>> {
        self.entries_with_status(ItemStatus::Pending)
    }

    pub fn failed_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.entries_with_status(ItemStatus::Failed)
    }

    fn entries_with_status(&self, status: ItemStatus) -> Result<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key, status, duration_seconds, size_bytes, attempts,
                    last_error, cost_usd, enqueued_at, started_at, finished_at
             FROM items WHERE status = ?1 ORDER BY enqueued_at, key",
        )?;
        let rows = stmt.query_map(params![status.as_str()], entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Per-status item counts.
    pub fn counts(&self) -> Result<StatusCounts> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM items GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row?;
            match ItemStatus::parse(&status) {
                Some(ItemStatus::Pending) => counts.pending = count,
                Some(ItemStatus::InProgress) => counts.in_progress = count,
                Some(ItemStatus::Completed) => counts.completed = count,
                Some(ItemStatus::Failed) => counts.failed = count,
                None => {}
            }
        }
        Ok(counts)
    }

    /// Total accumulated cost of completed items, in dollars.
    pub fn total_cost(&self) -> Result<f64> {
        let conn = self.lock()?;
        Ok(conn.query_row(
            "SELECT COALESCE(SUM(cost_usd), 0.0) FROM items WHERE status = 'completed'",
            [],
            |row| row.get(0),
        )?)
    }

    /// Stored transcript text for a completed item, if any.
    pub fn transcript_text(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT text FROM transcripts WHERE item_key = ?1",
            params![key],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other.into()),
        })
    }

    /// Audit trail for one item, oldest first.
    pub fn history(&self, key: &str) -> Result<Vec<HistoryEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT status, detail, recorded_at FROM history
             WHERE item_key = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok(HistoryEvent {
                status: row.get(0)?,
                detail: row.get(1)?,
                recorded_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}

fn record_history(
    conn: &Connection,
    key: &str,
    status: &str,
    detail: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO history (item_key, status, detail, recorded_at) VALUES (?1, ?2, ?3, ?4)",
        params![key, status, detail, Utc::now()],
    )?;
    Ok(())
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let status_raw: String = row.get(1)?;
    let status = ItemStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown status: {}", status_raw).into(),
        )
    })?;
    Ok(LedgerEntry {
        key: row.get(0)?,
        status,
        duration_seconds: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)? as u64,
        attempts: row.get(4)?,
        last_error: row.get(5)?,
        cost_usd: row.get(6)?,
        enqueued_at: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
    })
}
