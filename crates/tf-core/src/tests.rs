//! Unit tests for tf-core primitives.

#[cfg(test)]
mod ids {
    use std::collections::HashMap;

    use crate::{NodeId, SegmentId, SegmentIdx, StationId};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(SegmentIdx::default(), SegmentIdx::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(NodeId(7).to_string(), "NodeId(7)");
        assert_eq!(SegmentId::from("AB").to_string(), "AB");
    }

    #[test]
    fn string_ids_order_lexicographically() {
        let mut ids = vec![SegmentId::from("b"), SegmentId::from("a10"), SegmentId::from("a2")];
        ids.sort();
        let names: Vec<_> = ids.iter().map(SegmentId::as_str).collect();
        assert_eq!(names, ["a10", "a2", "b"]);
    }

    #[test]
    fn string_id_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(StationId::from("S1"), 1);
        assert_eq!(map.get("S1"), Some(&1));
        assert_eq!(map.get("S2"), None);
    }

    #[test]
    fn string_id_clone_shares_allocation() {
        let a = StationId::from(String::from("S1"));
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }
}

#[cfg(test)]
mod geo {
    use crate::{GeoPoint, polyline_length_m};

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(45.5, -73.57);
        assert!(p.distance_m(p) < 0.001);
    }

    #[test]
    fn one_degree_latitude() {
        let a = GeoPoint::new(30.0, -88.0);
        let b = GeoPoint::new(31.0, -88.0);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn lon_lat_constructor() {
        assert_eq!(GeoPoint::from_lon_lat(-73.5, 45.5), GeoPoint::new(45.5, -73.5));
    }

    #[test]
    fn validity() {
        assert!(GeoPoint::new(45.0, -73.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn polyline_length_sums_legs() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.01);
        let c = GeoPoint::new(0.0, 0.02);
        let total = polyline_length_m(&[a, b, c]);
        assert!((total - a.distance_m(c)).abs() < 0.01);
        assert_eq!(polyline_length_m(&[a]), 0.0);
    }
}

#[cfg(test)]
mod model {
    use crate::{TripStatus, Trip};

    #[test]
    fn only_unprocessed_is_pending() {
        assert!(!TripStatus::Unprocessed.is_terminal());
        assert!(TripStatus::Succeeded.is_terminal());
        assert!(TripStatus::FailedNoPath.is_terminal());
        assert!(TripStatus::FailedMissingStation.is_terminal());
    }

    #[test]
    fn status_string_roundtrip() {
        for st in TripStatus::ALL {
            assert_eq!(st.as_str().parse::<TripStatus>().unwrap(), st);
        }
        assert!("done".parse::<TripStatus>().is_err());
    }

    #[test]
    fn trip_constructor() {
        let t = Trip::new("t1", "S1", "S2");
        assert_eq!(t.trip_id.as_str(), "t1");
        assert_eq!(t.end_station_id.as_str(), "S2");
    }
}

#[cfg(test)]
mod config {
    use std::time::Duration;

    use crate::FlowConfig;

    #[test]
    fn default_is_valid() {
        FlowConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_batch_rejected() {
        let cfg = FlowConfig { batch_size: 0, ..FlowConfig::default() };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let cfg = FlowConfig { concurrency: 0, ..FlowConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_tolerance_rejected() {
        let cfg = FlowConfig { snap_tolerance_m: -1.0, ..FlowConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deadline_conversion() {
        let cfg = FlowConfig { search_deadline_ms: Some(250), ..FlowConfig::default() };
        assert_eq!(cfg.search_deadline(), Some(Duration::from_millis(250)));
        assert_eq!(FlowConfig::default().search_deadline(), None);
    }
}

#[cfg(test)]
mod time {
    use std::time::Duration;

    use crate::format_duration;

    #[test]
    fn seconds_only() {
        assert_eq!(format_duration(Duration::from_millis(4_900)), "4s");
    }

    #[test]
    fn minutes_and_hours() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3_723)), "1h 2m 3s");
    }
}
