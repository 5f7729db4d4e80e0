//! CSV output backend.
//!
//! Writes three files in the configured output directory:
//! - `segment_counts.csv`: `segment_id,trip_count`, replaced on every save
//! - `trip_status.csv`: `trip_id,status`, replaced on every save
//! - `trip_paths.csv`: one row per succeeded trip, appended across runs
//!
//! Snapshot files are written to a `.tmp` sibling and renamed into place,
//! so a reader never sees a half-written file.
//!
//! # Checkpoint commit
//!
//! [`ResultSink::write_checkpoint`] must replace both snapshot files or
//! neither, but two renames cannot happen at once.  The commit goes:
//!
//! 1. write and sync both `.tmp` files;
//! 2. create the `checkpoint.commit` marker;
//! 3. rename both `.tmp` files into place;
//! 4. delete the marker.
//!
//! Before step 2 the previous pair is untouched.  From step 2 on, both new
//! files are complete on disk, so whoever finds the marker (the next
//! [`load_checkpoint_csv`] or `write_checkpoint`) finishes steps 3 and 4.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use serde::Serialize;

use tf_core::{TripId, TripStatus};
use tf_flow::{Checkpoint, SegmentCounter};

use crate::writer::ResultSink;
use crate::{OutputError, OutputResult, SegmentCountRow, TripPathRow, TripStatusRow};

pub const SEGMENT_COUNTS_FILE: &str = "segment_counts.csv";
pub const TRIP_STATUS_FILE:    &str = "trip_status.csv";
pub const TRIP_PATHS_FILE:     &str = "trip_paths.csv";
pub const COMMIT_MARKER_FILE:  &str = "checkpoint.commit";

const SNAPSHOT_FILES: [&str; 2] = [SEGMENT_COUNTS_FILE, TRIP_STATUS_FILE];

const COUNT_HEADER:  [&str; 2] = ["segment_id", "trip_count"];
const STATUS_HEADER: [&str; 2] = ["trip_id", "status"];
const PATH_HEADER:   [&str; 6] = [
    "trip_id", "start_station_id", "end_station_id", "segment_count", "total_weight", "segments",
];

/// Writes run results to CSV files in one directory.
pub struct CsvWriter {
    dir:   PathBuf,
    paths: Writer<File>,
}

impl CsvWriter {
    /// Create `dir` if needed and open `trip_paths.csv` for appending,
    /// writing the header row if the file is new.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(TRIP_PATHS_FILE))?;
        let is_new = file.metadata()?.len() == 0;

        let mut paths = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            paths.write_record(PATH_HEADER)?;
        }

        Ok(Self { dir: dir.to_path_buf(), paths })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stage_counts(&self, counts: &SegmentCounter) -> OutputResult<PathBuf> {
        let rows = counts.iter().map(|(id, &n)| SegmentCountRow {
            segment_id: id.clone(),
            trip_count: n,
        });
        stage(&self.dir.join(SEGMENT_COUNTS_FILE), &COUNT_HEADER, rows)
    }

    fn stage_statuses(&self, statuses: &[(TripId, TripStatus)]) -> OutputResult<PathBuf> {
        let rows = statuses.iter().map(|(id, st)| TripStatusRow {
            trip_id: id.clone(),
            status:  *st,
        });
        stage(&self.dir.join(TRIP_STATUS_FILE), &STATUS_HEADER, rows)
    }

    fn commit(&self, staged: &Path, file_name: &str) -> OutputResult<()> {
        fs::rename(staged, self.dir.join(file_name))?;
        Ok(())
    }

    fn marker(&self) -> PathBuf {
        self.dir.join(COMMIT_MARKER_FILE)
    }
}

impl ResultSink for CsvWriter {
    fn write_counts(&mut self, counts: &SegmentCounter) -> OutputResult<()> {
        let staged = self.stage_counts(counts)?;
        self.commit(&staged, SEGMENT_COUNTS_FILE)
    }

    fn write_statuses(&mut self, statuses: &[(TripId, TripStatus)]) -> OutputResult<()> {
        let staged = self.stage_statuses(statuses)?;
        self.commit(&staged, TRIP_STATUS_FILE)
    }

    fn write_paths(&mut self, rows: &[TripPathRow]) -> OutputResult<()> {
        for row in rows {
            self.paths.serialize(row)?;
        }
        Ok(())
    }

    /// Replace both snapshot files through the commit marker; see the
    /// module docs.
    fn write_checkpoint(&mut self, checkpoint: &Checkpoint) -> OutputResult<()> {
        finish_commit(&self.dir)?;

        let statuses = self.stage_statuses(&checkpoint.statuses)?;
        let counts = self.stage_counts(&checkpoint.counts)?;
        File::create(self.marker())?.sync_all()?;

        self.commit(&counts, SEGMENT_COUNTS_FILE)?;
        self.commit(&statuses, TRIP_STATUS_FILE)?;
        fs::remove_file(self.marker())?;
        log::debug!(
            "checkpoint saved to {}: {} statuses, {} segment counts",
            self.dir.display(),
            checkpoint.statuses.len(),
            checkpoint.counts.len(),
        );
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.paths.flush()?;
        Ok(())
    }
}

/// Write `rows` under `header` to `<target>.tmp`, returning the temp path.
fn stage<T, I>(target: &Path, header: &[&str], rows: I) -> OutputResult<PathBuf>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let tmp = target.with_extension("csv.tmp");
    let mut w = WriterBuilder::new().has_headers(false).from_path(&tmp)?;
    w.write_record(header)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(tmp)
}

/// Complete a checkpoint commit that was interrupted after its marker was
/// written.  Without a marker, stray `.tmp` files are left for the next
/// save to overwrite.
fn finish_commit(dir: &Path) -> OutputResult<()> {
    let marker = dir.join(COMMIT_MARKER_FILE);
    if !marker.exists() {
        return Ok(());
    }
    log::warn!("finishing interrupted checkpoint commit in {}", dir.display());
    for name in SNAPSHOT_FILES {
        let target = dir.join(name);
        let staged = target.with_extension("csv.tmp");
        if staged.exists() {
            fs::rename(&staged, &target)?;
        }
    }
    fs::remove_file(&marker)?;
    Ok(())
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read a checkpoint saved by [`CsvWriter`] from `dir`.
///
/// A directory with neither snapshot file yields an empty checkpoint, so a
/// first run and a resumed run can share one code path.  A commit that was
/// interrupted after both files were staged is completed first.
///
/// # Errors
///
/// [`OutputError::IncompleteCheckpoint`] if only one of the two files
/// exists; restoring half a checkpoint would skip or double-count trips.
pub fn load_checkpoint_csv(dir: &Path) -> OutputResult<Checkpoint> {
    finish_commit(dir)?;

    let counts_path = dir.join(SEGMENT_COUNTS_FILE);
    let status_path = dir.join(TRIP_STATUS_FILE);

    match (counts_path.exists(), status_path.exists()) {
        (false, false) => return Ok(Checkpoint::default()),
        (true, true) => {}
        _ => return Err(OutputError::IncompleteCheckpoint(dir.to_path_buf())),
    }

    let mut counts_rdr = csv::Reader::from_path(&counts_path)?;
    let counts: SegmentCounter = counts_rdr
        .deserialize::<SegmentCountRow>()
        .map(|r| r.map(|row| (row.segment_id, row.trip_count)))
        .collect::<Result<_, _>>()?;

    let mut status_rdr = csv::Reader::from_path(&status_path)?;
    let statuses: Vec<(TripId, TripStatus)> = status_rdr
        .deserialize::<TripStatusRow>()
        .map(|r| r.map(|row| (row.trip_id, row.status)))
        .collect::<Result<_, _>>()?;

    log::info!(
        "loaded checkpoint from {}: {} statuses, {} segment counts",
        dir.display(),
        statuses.len(),
        counts.len(),
    );
    Ok(Checkpoint::new(statuses, counts))
}
