//! Embedded Mobile, AL road network and bike-share stations.
//!
//! Five intersections joined by six roads; `DT_CP` is one-way from downtown
//! to the commerce park.  Station `FERRY` sits on the bay, well outside the
//! snap radius of every road.

use std::io::Cursor;

use anyhow::Result;

use tf_core::{FlowConfig, Trip};
use tf_flow::StationIndex;
use tf_output::{load_segments_reader, load_stations_reader, load_trips_reader};
use tf_spatial::{NetworkGraph, NetworkGraphBuilder};

const SEGMENTS_CSV: &str = "\
segment_id,wkt,weight,oneway
NR_DT,\"LINESTRING (-88.070 30.710, -88.060 30.703, -88.050 30.695)\",,
NR_CN,\"LINESTRING (-88.070 30.710, -88.060 30.680)\",,
CN_DT,\"LINESTRING (-88.060 30.680, -88.050 30.695)\",,
SR_CN,\"LINESTRING (-88.030 30.670, -88.060 30.680)\",,
SR_CP,\"LINESTRING (-88.030 30.670, -88.030 30.700)\",,
DT_CP,\"LINESTRING (-88.050 30.695, -88.030 30.700)\",,yes
";

const STATIONS_CSV: &str = "\
station_id,lon,lat
NORTH,-88.0701,30.7101
SOUTH,-88.0299,30.6699
DOWNTOWN,-88.0500,30.6951
COMMERCE,-88.0301,30.7000
CONNECTOR,-88.0600,30.6802
FERRY,-88.0000,30.6200
";

// T07 travels against the one-way road and detours through the south side.
// T11 names a station that was never installed; T12 repeats T01.
const TRIPS_CSV: &str = "\
trip_id,start_station_id,end_station_id
T01,NORTH,DOWNTOWN
T02,NORTH,COMMERCE
T03,SOUTH,DOWNTOWN
T04,SOUTH,COMMERCE
T05,CONNECTOR,DOWNTOWN
T06,DOWNTOWN,COMMERCE
T07,COMMERCE,DOWNTOWN
T08,NORTH,SOUTH
T09,DOWNTOWN,DOWNTOWN
T10,FERRY,DOWNTOWN
T11,NORTH,AIRPORT
T12,NORTH,DOWNTOWN
";

pub fn build_network(config: &FlowConfig) -> Result<NetworkGraph> {
    let segments = load_segments_reader(Cursor::new(SEGMENTS_CSV))?;
    let mut builder = NetworkGraphBuilder::with_config(config);
    builder.extend(segments)?;
    Ok(builder.build())
}

pub fn build_stations() -> Result<StationIndex> {
    let stations = load_stations_reader(Cursor::new(STATIONS_CSV))?;
    Ok(StationIndex::build(stations)?)
}

pub fn trips() -> Result<Vec<Trip>> {
    Ok(load_trips_reader(Cursor::new(TRIPS_CSV))?)
}
