//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `trip_flow.db` file in the configured output directory
//! with three tables: `segment_counts`, `trip_status`, and `trip_paths`.
//! [`ResultSink::write_checkpoint`] replaces counts and statuses in one
//! transaction.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, params};

use tf_core::{SegmentId, TripId, TripStatus};
use tf_flow::{Checkpoint, SegmentCounter};

use crate::writer::ResultSink;
use crate::{OutputError, OutputResult, TripPathRow};

pub const DATABASE_FILE: &str = "trip_flow.db";

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous  = NORMAL;
    CREATE TABLE IF NOT EXISTS segment_counts (
        segment_id TEXT PRIMARY KEY,
        trip_count INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trip_status (
        trip_id TEXT PRIMARY KEY,
        status  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trip_paths (
        trip_id          TEXT PRIMARY KEY,
        start_station_id TEXT NOT NULL,
        end_station_id   TEXT NOT NULL,
        segment_count    INTEGER NOT NULL,
        total_weight     REAL NOT NULL,
        segments         TEXT NOT NULL
    );";

/// Writes run results to an SQLite database.
pub struct SqliteWriter {
    conn: Connection,
}

impl SqliteWriter {
    /// Open (or create) `trip_flow.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(DATABASE_FILE))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Read back the checkpoint stored in this database.
    pub fn load_checkpoint(&self) -> OutputResult<Checkpoint> {
        let mut stmt = self
            .conn
            .prepare("SELECT segment_id, trip_count FROM segment_counts ORDER BY segment_id")?;
        let counts: SegmentCounter = stmt
            .query_map([], |r| {
                let id: String = r.get(0)?;
                let n: i64 = r.get(1)?;
                Ok((SegmentId::from(id), n.max(0) as u64))
            })?
            .collect::<Result<_, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT trip_id, status FROM trip_status ORDER BY trip_id")?;
        let raw: Vec<(String, String)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<_, _>>()?;

        let mut statuses = Vec::with_capacity(raw.len());
        for (i, (trip, status)) in raw.into_iter().enumerate() {
            let status: TripStatus = status.parse().map_err(|e| OutputError::Parse {
                line:    i as u64 + 1,
                message: format!("trip_status row for {trip}: {e}"),
            })?;
            statuses.push((TripId::from(trip), status));
        }
        Ok(Checkpoint::new(statuses, counts))
    }

    /// Status of one trip, if recorded.
    pub fn trip_status(&self, trip: &str) -> OutputResult<Option<TripStatus>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT status FROM trip_status WHERE trip_id = ?1", [trip], |r| r.get(0))
            .optional()?;
        raw.map(|s| {
            s.parse().map_err(|e| OutputError::Parse { line: 0, message: format!("{trip}: {e}") })
        })
        .transpose()
    }
}

fn replace_counts(tx: &Transaction<'_>, counts: &SegmentCounter) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM segment_counts", [])?;
    let mut stmt =
        tx.prepare_cached("INSERT INTO segment_counts (segment_id, trip_count) VALUES (?1, ?2)")?;
    for (id, &n) in counts {
        stmt.execute(params![id.as_str(), n as i64])?;
    }
    Ok(())
}

fn replace_statuses(tx: &Transaction<'_>, statuses: &[(TripId, TripStatus)]) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM trip_status", [])?;
    let mut stmt = tx.prepare_cached("INSERT INTO trip_status (trip_id, status) VALUES (?1, ?2)")?;
    for (id, status) in statuses {
        stmt.execute(params![id.as_str(), status.as_str()])?;
    }
    Ok(())
}

impl ResultSink for SqliteWriter {
    fn write_counts(&mut self, counts: &SegmentCounter) -> OutputResult<()> {
        let tx = self.conn.transaction()?;
        replace_counts(&tx, counts)?;
        tx.commit()?;
        Ok(())
    }

    fn write_statuses(&mut self, statuses: &[(TripId, TripStatus)]) -> OutputResult<()> {
        let tx = self.conn.transaction()?;
        replace_statuses(&tx, statuses)?;
        tx.commit()?;
        Ok(())
    }

    fn write_paths(&mut self, rows: &[TripPathRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO trip_paths \
                 (trip_id, start_station_id, end_station_id, segment_count, total_weight, segments) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.trip_id.as_str(),
                    row.start_station_id.as_str(),
                    row.end_station_id.as_str(),
                    row.segment_count as i64,
                    row.total_weight,
                    row.segments,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_checkpoint(&mut self, checkpoint: &Checkpoint) -> OutputResult<()> {
        let tx = self.conn.transaction()?;
        replace_statuses(&tx, &checkpoint.statuses)?;
        replace_counts(&tx, &checkpoint.counts)?;
        tx.commit()?;
        log::debug!(
            "checkpoint committed: {} statuses, {} segment counts",
            checkpoint.statuses.len(),
            checkpoint.counts.len(),
        );
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
