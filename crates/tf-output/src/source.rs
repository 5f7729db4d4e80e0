//! CSV loaders for stations, trips, and network segments.
//!
//! # CSV formats
//!
//! ```csv
//! station_id,lon,lat
//! S1,-105.2705,40.0150
//! ```
//!
//! ```csv
//! trip_id,start_station_id,end_station_id
//! T1,S1,S2
//! ```
//!
//! ```csv
//! segment_id,wkt,weight,oneway
//! AB,"LINESTRING (-105.2705 40.0150, -105.2690 40.0150)",,
//! BC,"LINESTRING (-105.2690 40.0150, -105.2680 40.0160)",12.5,true
//! ```
//!
//! `weight` defaults to the polyline length in metres; `oneway` accepts
//! `true`/`false`/`1`/`0`/`yes`/`no` and defaults to two-way.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use geo_types::LineString;
use serde::Deserialize;
use wkt::TryFromWkt;

use tf_core::{FlowConfig, GeoPoint, SegmentRecord, Station, Trip};
use tf_flow::{StationIndex, TripSource};
use tf_spatial::{NetworkGraph, NetworkGraphBuilder};

use crate::{OutputError, OutputResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StationRecord {
    station_id: String,
    lon:        f64,
    lat:        f64,
}

#[derive(Deserialize)]
struct TripRecord {
    trip_id:          String,
    start_station_id: String,
    end_station_id:   String,
}

#[derive(Deserialize)]
struct SegmentRow {
    segment_id: String,
    wkt:        String,
    #[serde(default)]
    weight:     Option<f64>,
    #[serde(default)]
    oneway:     Option<String>,
}

/// 1-based file line of the `i`-th data row (the header is line 1).
fn line_of(i: usize) -> u64 {
    i as u64 + 2
}

fn parse_err(i: usize, message: impl Into<String>) -> OutputError {
    OutputError::Parse { line: line_of(i), message: message.into() }
}

// ── Stations ──────────────────────────────────────────────────────────────────

pub fn load_stations_csv(path: &Path) -> OutputResult<Vec<Station>> {
    load_stations_reader(File::open(path)?)
}

/// Like [`load_stations_csv`] but accepts any `Read` source.
pub fn load_stations_reader<R: Read>(reader: R) -> OutputResult<Vec<Station>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut stations = Vec::new();
    for (i, result) in rdr.deserialize::<StationRecord>().enumerate() {
        let row = result?;
        let id = row.station_id.trim();
        if id.is_empty() {
            return Err(parse_err(i, "empty station_id"));
        }
        let location = GeoPoint::from_lon_lat(row.lon, row.lat);
        if !location.is_valid() {
            return Err(parse_err(i, format!("station {id}: coordinate {location} out of range")));
        }
        stations.push(Station::new(id, location));
    }
    Ok(stations)
}

/// Load stations and index them, rejecting duplicate ids.
pub fn load_station_index(path: &Path) -> OutputResult<StationIndex> {
    let stations = load_stations_csv(path)?;
    let index = StationIndex::build(stations)?;
    log::info!("loaded {} stations from {}", index.len(), path.display());
    Ok(index)
}

// ── Trips ─────────────────────────────────────────────────────────────────────

fn trip_from_record(i: usize, row: TripRecord) -> OutputResult<Trip> {
    let id = row.trip_id.trim();
    if id.is_empty() {
        return Err(parse_err(i, "empty trip_id"));
    }
    Ok(Trip::new(id, row.start_station_id.trim(), row.end_station_id.trim()))
}

/// Read every trip from `reader`, failing on the first malformed row.
pub fn load_trips_reader<R: Read>(reader: R) -> OutputResult<Vec<Trip>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize::<TripRecord>()
        .enumerate()
        .map(|(i, r)| trip_from_record(i, r?))
        .collect()
}

/// A trip file read lazily, from the start, on every pass.
///
/// Malformed rows are reported per item, so the engine skips them and keeps
/// going.
#[derive(Debug, Clone)]
pub struct CsvTripSource {
    path: PathBuf,
}

impl CsvTripSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TripSource for CsvTripSource {
    type Error = OutputError;

    fn trip_count(&self) -> OutputResult<usize> {
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let mut n = 0;
        for record in rdr.records() {
            record?;
            n += 1;
        }
        Ok(n)
    }

    fn trips(&self) -> OutputResult<Box<dyn Iterator<Item = OutputResult<Trip>> + '_>> {
        let rdr = csv::Reader::from_path(&self.path)?;
        Ok(Box::new(
            rdr.into_deserialize::<TripRecord>()
                .enumerate()
                .map(|(i, r)| trip_from_record(i, r?)),
        ))
    }
}

// ── Segments ──────────────────────────────────────────────────────────────────

pub fn load_segments_csv(path: &Path) -> OutputResult<Vec<SegmentRecord>> {
    load_segments_reader(File::open(path)?)
}

/// Like [`load_segments_csv`] but accepts any `Read` source.
pub fn load_segments_reader<R: Read>(reader: R) -> OutputResult<Vec<SegmentRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut segments = Vec::new();
    for (i, result) in rdr.deserialize::<SegmentRow>().enumerate() {
        segments.push(segment_from_row(i, result?)?);
    }
    Ok(segments)
}

fn segment_from_row(i: usize, row: SegmentRow) -> OutputResult<SegmentRecord> {
    let id = row.segment_id.trim();
    if id.is_empty() {
        return Err(parse_err(i, "empty segment_id"));
    }

    let line = LineString::<f64>::try_from_wkt_str(row.wkt.trim())
        .map_err(|e| parse_err(i, format!("segment {id}: invalid LINESTRING: {e}")))?;
    let polyline: Vec<GeoPoint> = line
        .coords()
        .map(|c| GeoPoint::from_lon_lat(c.x, c.y))
        .collect();

    let mut record = SegmentRecord::new(id, polyline);
    if let Some(w) = row.weight {
        record = record.with_weight(w);
    }
    if let Some(flag) = row.oneway.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if parse_flag(flag).ok_or_else(|| parse_err(i, format!("segment {id}: bad oneway {flag:?}")))? {
            record = record.oneway();
        }
    }
    Ok(record)
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Load segments from `path` and build the network with the snapping
/// parameters from `config`.
pub fn load_network_csv(path: &Path, config: &FlowConfig) -> OutputResult<NetworkGraph> {
    let segments = load_segments_csv(path)?;
    let mut builder = NetworkGraphBuilder::with_config(config);
    builder.extend(segments)?;
    let network = builder.build();
    log::info!(
        "loaded network from {}: {} segments, {} nodes, {} arcs",
        path.display(),
        network.segment_count(),
        network.node_count(),
        network.edge_count(),
    );
    Ok(network)
}
