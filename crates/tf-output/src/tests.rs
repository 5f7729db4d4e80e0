//! Integration tests for tf-output.

#[cfg(test)]
mod fixtures {
    use tempfile::TempDir;

    use tf_core::FlowConfig;

    pub fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    pub fn config() -> FlowConfig {
        FlowConfig { snap_tolerance_m: 0.5, snap_radius_m: 50.0, ..FlowConfig::default() }
    }

    /// A ── B ── C along the equator, 0.001° apart, plus an island D ── E.
    pub const SEGMENTS: &str = "\
segment_id,wkt,weight,oneway
AB,\"LINESTRING (0 0, 0.001 0)\",1,
BC,\"LINESTRING (0.001 0, 0.0015 0.0001, 0.002 0)\",1,false
DE,\"LINESTRING (0.01 0, 0.011 0)\",,yes
";

    pub const STATIONS: &str = "\
station_id,lon,lat
S1,0,0
S2,0.002,0
S3,0.001,0
S4,0.01,0
";

    pub const TRIPS: &str = "\
trip_id,start_station_id,end_station_id
T1,S1,S2
T2,S1,S3
T3,S1,S9
T4,S1,S4
T5,S3,S3
";
}

// ── Loaders ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod source_tests {
    use std::io::Cursor;

    use tf_core::GeoPoint;
    use tf_flow::TripSource;

    use super::fixtures::*;
    use crate::{
        CsvTripSource, OutputError, load_network_csv, load_segments_reader, load_stations_reader,
        load_trips_reader,
    };

    #[test]
    fn stations_parse_lon_lat_order() {
        let stations = load_stations_reader(Cursor::new(STATIONS)).unwrap();
        assert_eq!(stations.len(), 4);
        assert_eq!(stations[1].id.as_str(), "S2");
        assert_eq!(stations[1].location, GeoPoint::new(0.0, 0.002));
    }

    #[test]
    fn station_out_of_range_reports_line() {
        let csv = "station_id,lon,lat\nS1,0,0\nS2,0,95\n";
        let err = load_stations_reader(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, OutputError::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn segments_parse_wkt_weight_and_oneway() {
        let segs = load_segments_reader(Cursor::new(SEGMENTS)).unwrap();
        assert_eq!(segs.len(), 3);

        assert_eq!(segs[0].segment_id.as_str(), "AB");
        assert_eq!(segs[0].polyline, vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)]);
        assert_eq!(segs[0].weight, Some(1.0));
        assert!(!segs[0].oneway);

        assert_eq!(segs[1].polyline.len(), 3);
        assert!(!segs[1].oneway);

        assert_eq!(segs[2].weight, None);
        assert!(segs[2].oneway);
    }

    #[test]
    fn bad_wkt_is_a_parse_error() {
        let csv = "segment_id,wkt\nAB,\"POINT (0 0)\"\n";
        let err = load_segments_reader(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, OutputError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn bad_oneway_flag_rejected() {
        let csv = "segment_id,wkt,weight,oneway\nAB,\"LINESTRING (0 0, 0.001 0)\",,sometimes\n";
        assert!(load_segments_reader(Cursor::new(csv)).is_err());
    }

    #[test]
    fn negative_weight_fails_network_build() {
        let dir = tmp();
        let path = dir.path().join("segments.csv");
        std::fs::write(&path, "segment_id,wkt,weight\nAB,\"LINESTRING (0 0, 0.001 0)\",-1\n").unwrap();
        let err = load_network_csv(&path, &config()).unwrap_err();
        assert!(matches!(err, OutputError::Spatial(_)), "{err}");
    }

    #[test]
    fn network_loads_and_merges_endpoints() {
        let dir = tmp();
        let path = dir.path().join("segments.csv");
        std::fs::write(&path, SEGMENTS).unwrap();
        let net = load_network_csv(&path, &config()).unwrap();
        assert_eq!(net.segment_count(), 3);
        assert_eq!(net.node_count(), 5);
        // AB and BC both ways, DE one way.
        assert_eq!(net.edge_count(), 5);
    }

    #[test]
    fn trips_reader_loads_all() {
        let trips = load_trips_reader(Cursor::new(TRIPS)).unwrap();
        assert_eq!(trips.len(), 5);
        assert_eq!(trips[2].end_station_id.as_str(), "S9");
    }

    #[test]
    fn csv_trip_source_is_restartable_and_skips_bad_rows() {
        let dir = tmp();
        let path = dir.path().join("trips.csv");
        std::fs::write(&path, "trip_id,start_station_id,end_station_id\nT1,S1,S2\n,S1,S2\nT3,S2,S1\n")
            .unwrap();
        let source = CsvTripSource::new(&path);

        assert_eq!(source.trip_count().unwrap(), 3);
        for _ in 0..2 {
            let items: Vec<_> = source.trips().unwrap().collect();
            assert_eq!(items.len(), 3);
            assert!(items[0].is_ok());
            assert!(matches!(items[1], Err(OutputError::Parse { line: 3, .. })));
            assert_eq!(items[2].as_ref().unwrap().trip_id.as_str(), "T3");
        }
    }

    #[test]
    fn missing_trip_file_fails_to_open() {
        let source = CsvTripSource::new("/definitely/not/here.csv");
        assert!(source.trip_count().is_err());
        assert!(source.trips().is_err());
    }
}

// ── CSV writer ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod csv_tests {
    use std::fs;
    use std::path::Path;

    use tf_core::{SegmentId, TripId, TripStatus};
    use tf_flow::{Checkpoint, SegmentCounter};

    use super::fixtures::tmp;
    use crate::csv::{
        COMMIT_MARKER_FILE, CsvWriter, SEGMENT_COUNTS_FILE, TRIP_PATHS_FILE, TRIP_STATUS_FILE,
        load_checkpoint_csv,
    };
    use crate::{OutputError, ResultSink, TripPathRow};

    fn checkpoint() -> Checkpoint {
        let counts: SegmentCounter =
            [(SegmentId::from("AB"), 2), (SegmentId::from("BC"), 1)].into_iter().collect();
        Checkpoint::new(
            vec![
                (TripId::from("T1"), TripStatus::Succeeded),
                (TripId::from("T2"), TripStatus::Succeeded),
                (TripId::from("T3"), TripStatus::FailedMissingStation),
                (TripId::from("T4"), TripStatus::FailedNoPath),
            ],
            counts,
        )
    }

    fn path_row(id: &str) -> TripPathRow {
        TripPathRow {
            trip_id:          id.into(),
            start_station_id: "S1".into(),
            end_station_id:   "S2".into(),
            segment_count:    2,
            total_weight:     2.0,
            segments:         "AB;BC".into(),
        }
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&Checkpoint::default()).unwrap();
        assert!(dir.path().join(TRIP_PATHS_FILE).exists());
        assert!(dir.path().join(SEGMENT_COUNTS_FILE).exists());
        assert!(dir.path().join(TRIP_STATUS_FILE).exists());
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&checkpoint()).unwrap();
        w.flush().unwrap();

        let headers = |name: &str| -> Vec<String> {
            let mut rdr = ::csv::Reader::from_path(dir.path().join(name)).unwrap();
            rdr.headers().unwrap().iter().map(str::to_owned).collect()
        };
        assert_eq!(headers(SEGMENT_COUNTS_FILE), ["segment_id", "trip_count"]);
        assert_eq!(headers(TRIP_STATUS_FILE), ["trip_id", "status"]);
        assert_eq!(
            headers(TRIP_PATHS_FILE),
            ["trip_id", "start_station_id", "end_station_id", "segment_count", "total_weight", "segments"],
        );
    }

    #[test]
    fn statuses_written_as_snake_case() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&checkpoint()).unwrap();

        let mut rdr = ::csv::Reader::from_path(dir.path().join(TRIP_STATUS_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[2][1], "failed_missing_station");
        assert_eq!(&rows[3][1], "failed_no_path");
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        let cp = checkpoint();
        w.write_checkpoint(&cp).unwrap();
        assert_eq!(load_checkpoint_csv(dir.path()).unwrap(), cp);
    }

    #[test]
    fn later_checkpoint_replaces_earlier() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&checkpoint()).unwrap();
        w.write_checkpoint(&Checkpoint::default()).unwrap();
        assert!(load_checkpoint_csv(dir.path()).unwrap().is_empty());
        assert!(!dir.path().join("segment_counts.csv.tmp").exists());
    }

    #[test]
    fn empty_dir_loads_empty_checkpoint() {
        let dir = tmp();
        assert!(load_checkpoint_csv(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn half_checkpoint_rejected() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_counts(&checkpoint().counts).unwrap();
        let err = load_checkpoint_csv(dir.path()).unwrap_err();
        assert!(matches!(err, OutputError::IncompleteCheckpoint(_)));
    }

    /// `checkpoint()` plus one more succeeded trip over AB.
    fn next_checkpoint() -> Checkpoint {
        let mut cp = checkpoint();
        cp.statuses.push((TripId::from("T5"), TripStatus::Succeeded));
        cp.counts = [(SegmentId::from("AB"), 3), (SegmentId::from("BC"), 1)].into_iter().collect();
        cp
    }

    /// Save `cp` in a scratch directory and copy its two snapshot files into
    /// `dir` under the given names.
    fn place_snapshot(dir: &Path, cp: &Checkpoint, counts_as: &str, statuses_as: &str) {
        let scratch = tmp();
        CsvWriter::new(scratch.path()).unwrap().write_checkpoint(cp).unwrap();
        fs::copy(scratch.path().join(SEGMENT_COUNTS_FILE), dir.join(counts_as)).unwrap();
        fs::copy(scratch.path().join(TRIP_STATUS_FILE), dir.join(statuses_as)).unwrap();
    }

    #[test]
    fn interrupted_commit_is_finished_on_load() {
        let dir = tmp();
        CsvWriter::new(dir.path()).unwrap().write_checkpoint(&checkpoint()).unwrap();

        // Crash after the marker and the first rename, before the second.
        place_snapshot(dir.path(), &next_checkpoint(), SEGMENT_COUNTS_FILE, "trip_status.csv.tmp");
        fs::File::create(dir.path().join(COMMIT_MARKER_FILE)).unwrap();

        assert_eq!(load_checkpoint_csv(dir.path()).unwrap(), next_checkpoint());
        assert!(!dir.path().join(COMMIT_MARKER_FILE).exists());
        assert!(!dir.path().join("trip_status.csv.tmp").exists());
    }

    #[test]
    fn staged_files_without_marker_are_ignored() {
        let dir = tmp();
        CsvWriter::new(dir.path()).unwrap().write_checkpoint(&checkpoint()).unwrap();

        // Crash after staging, before the marker.
        place_snapshot(
            dir.path(),
            &next_checkpoint(),
            "segment_counts.csv.tmp",
            "trip_status.csv.tmp",
        );

        assert_eq!(load_checkpoint_csv(dir.path()).unwrap(), checkpoint());
    }

    #[test]
    fn interrupted_commit_is_finished_before_next_save() {
        let dir = tmp();
        CsvWriter::new(dir.path()).unwrap().write_checkpoint(&checkpoint()).unwrap();
        place_snapshot(
            dir.path(),
            &next_checkpoint(),
            "segment_counts.csv.tmp",
            "trip_status.csv.tmp",
        );
        fs::File::create(dir.path().join(COMMIT_MARKER_FILE)).unwrap();

        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&Checkpoint::default()).unwrap();
        assert!(load_checkpoint_csv(dir.path()).unwrap().is_empty());
        assert!(!dir.path().join(COMMIT_MARKER_FILE).exists());
    }

    #[test]
    fn paths_append_across_writers() {
        let dir = tmp();
        {
            let mut w = CsvWriter::new(dir.path()).unwrap();
            w.write_paths(&[path_row("T1")]).unwrap();
            w.flush().unwrap();
        }
        {
            let mut w = CsvWriter::new(dir.path()).unwrap();
            w.write_paths(&[path_row("T2"), path_row("T3")]).unwrap();
            w.flush().unwrap();
        }
        let mut rdr = ::csv::Reader::from_path(dir.path().join(TRIP_PATHS_FILE)).unwrap();
        let rows: Vec<TripPathRow> = rdr.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], path_row("T1"));
        assert_eq!(rows[2].segment_ids().collect::<Vec<_>>(), ["AB", "BC"]);
    }

    #[test]
    fn flush_twice_ok() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.flush().unwrap();
        w.flush().unwrap();
    }
}

// ── End to end through the engine ─────────────────────────────────────────────

#[cfg(test)]
mod integration_tests {
    use tf_core::TripStatus;
    use tf_flow::TripFlowEngineBuilder;

    use super::fixtures::*;
    use crate::csv::TRIP_PATHS_FILE;
    use crate::{
        CsvTripSource, CsvWriter, PathRecorder, ResultSink, TripPathRow, load_checkpoint_csv,
        load_network_csv, load_station_index,
    };

    fn write_inputs(dir: &std::path::Path) {
        std::fs::write(dir.join("segments.csv"), SEGMENTS).unwrap();
        std::fs::write(dir.join("stations.csv"), STATIONS).unwrap();
        std::fs::write(dir.join("trips.csv"), TRIPS).unwrap();
    }

    /// Load, run, and save once; returns (succeeded, scheduled).
    fn run_once(input: &std::path::Path, out: &std::path::Path, max_trips: Option<usize>) -> (usize, usize) {
        let mut cfg = config();
        cfg.max_trips = max_trips;
        cfg.batch_size = 2;
        cfg.concurrency = 2;

        let network = load_network_csv(&input.join("segments.csv"), &cfg).unwrap();
        let stations = load_station_index(&input.join("stations.csv")).unwrap();
        let mut engine = TripFlowEngineBuilder::dijkstra(cfg, network, stations)
            .resume(load_checkpoint_csv(out).unwrap())
            .build()
            .unwrap();

        let mut obs = PathRecorder::new(CsvWriter::new(out).unwrap());
        let report = engine.run(&CsvTripSource::new(input.join("trips.csv")), &mut obs).unwrap();
        assert!(obs.take_error().is_none(), "no write errors expected");

        let mut writer = obs.into_writer();
        writer.write_checkpoint(&engine.checkpoint()).unwrap();
        (report.succeeded, report.scheduled)
    }

    #[test]
    fn full_run_writes_counts_statuses_and_paths() {
        let input = tmp();
        let out = tmp();
        write_inputs(input.path());

        let (succeeded, scheduled) = run_once(input.path(), out.path(), None);
        assert_eq!(scheduled, 5);
        assert_eq!(succeeded, 3);

        let cp = load_checkpoint_csv(out.path()).unwrap();
        assert_eq!(cp.counts.get("AB"), 2);
        assert_eq!(cp.counts.get("BC"), 1);
        assert_eq!(cp.counts.get("DE"), 0);
        let status = |id: &str| cp.statuses.iter().find(|(t, _)| t.as_str() == id).map(|(_, s)| *s);
        assert_eq!(status("T3"), Some(TripStatus::FailedMissingStation));
        assert_eq!(status("T4"), Some(TripStatus::FailedNoPath));
        assert_eq!(status("T5"), Some(TripStatus::Succeeded));

        let mut rdr = ::csv::Reader::from_path(out.path().join(TRIP_PATHS_FILE)).unwrap();
        let mut rows: Vec<TripPathRow> = rdr.deserialize().map(|r| r.unwrap()).collect();
        rows.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].segments, "AB;BC");
        assert_eq!(rows[2].segment_count, 0);
    }

    #[test]
    fn resumed_runs_match_single_run() {
        let input = tmp();
        write_inputs(input.path());

        let single = tmp();
        run_once(input.path(), single.path(), None);

        let staged = tmp();
        let (_, first) = run_once(input.path(), staged.path(), Some(2));
        let (_, second) = run_once(input.path(), staged.path(), Some(2));
        let (_, third) = run_once(input.path(), staged.path(), Some(2));
        let (_, fourth) = run_once(input.path(), staged.path(), Some(2));
        assert_eq!((first, second, third, fourth), (2, 2, 1, 0));

        assert_eq!(
            load_checkpoint_csv(staged.path()).unwrap(),
            load_checkpoint_csv(single.path()).unwrap(),
        );
    }
}

// ── SQLite tests ──────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use tf_core::{SegmentId, TripId, TripStatus};
    use tf_flow::{Checkpoint, SegmentCounter};

    use super::fixtures::tmp;
    use crate::sqlite::{DATABASE_FILE, SqliteWriter};
    use crate::{ResultSink, TripPathRow};

    fn checkpoint() -> Checkpoint {
        let counts: SegmentCounter =
            [(SegmentId::from("AB"), 2), (SegmentId::from("BC"), 1)].into_iter().collect();
        Checkpoint::new(
            vec![
                (TripId::from("T1"), TripStatus::Succeeded),
                (TripId::from("T2"), TripStatus::FailedNoPath),
            ],
            counts,
        )
    }

    #[test]
    fn sqlite_db_created() {
        let dir = tmp();
        let _w = SqliteWriter::new(dir.path()).unwrap();
        assert!(dir.path().join(DATABASE_FILE).exists());
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&checkpoint()).unwrap();
        w.flush().unwrap();
        assert_eq!(w.load_checkpoint().unwrap(), checkpoint());
        assert_eq!(w.trip_status("T2").unwrap(), Some(TripStatus::FailedNoPath));
        assert_eq!(w.trip_status("T9").unwrap(), None);
    }

    #[test]
    fn checkpoint_replaces_previous_state() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&checkpoint()).unwrap();
        w.write_checkpoint(&Checkpoint::default()).unwrap();
        assert!(w.load_checkpoint().unwrap().is_empty());
    }

    #[test]
    fn status_stored_as_text() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_checkpoint(&checkpoint()).unwrap();
        w.flush().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join(DATABASE_FILE)).unwrap();
        let val: String = conn
            .query_row("SELECT status FROM trip_status WHERE trip_id = 'T2'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(val, "failed_no_path");
    }

    #[test]
    fn paths_upsert_by_trip() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        let row = TripPathRow {
            trip_id:          "T1".into(),
            start_station_id: "S1".into(),
            end_station_id:   "S2".into(),
            segment_count:    1,
            total_weight:     1.0,
            segments:         "AB".into(),
        };
        w.write_paths(&[row.clone()]).unwrap();
        w.write_paths(&[row]).unwrap();
        w.write_paths(&[]).unwrap();
        w.flush().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join(DATABASE_FILE)).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM trip_paths", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
