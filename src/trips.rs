//! Trip table model and CSV loading.
//!
//! The trip table is the immutable input of both simulation modes: one row
//! per rental, sorted ascending by start time, produced by an external
//! ingestion pipeline. Timestamps are epoch seconds discretized to the
//! 5-minute grid by that pipeline.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::capacity::TICK_SECONDS;

/// Dense index assigned to a vehicle name at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub u32);

/// One rental trip of one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub vehicle: VehicleId,
    /// Trip start, epoch seconds.
    pub start_time: i64,
    /// Trip end, epoch seconds.
    pub end_time: i64,
    /// State of charge at trip start, percent (0–100).
    pub start_soc: f32,
    /// State of charge at trip end, percent (0–100).
    pub end_soc: f32,
    /// Trip duration in minutes.
    pub trip_duration: i64,
    /// Driven distance in km; unknown when the vehicle gained charge en route.
    pub trip_distance_km: Option<f32>,
    /// Whether the trip ended at a charging station.
    pub end_charging: bool,
}

/// Errors raised while loading or validating a trip table.
#[derive(Debug, Error)]
pub enum TripDataError {
    #[error("trip table `{path}`, row {row}: {source}")]
    Csv {
        path: String,
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("trip row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    #[error("trip table is not sorted ascending by start_time at row {row}")]
    Unsorted { row: usize },
    #[error("trip table is empty")]
    Empty,
}

/// Raw CSV row as produced by the ingestion pipeline.
///
/// Coordinates are parsed for schema fidelity but unused by the simulation.
#[derive(Debug, Deserialize)]
struct RawTrip {
    vehicle_id: String,
    start_time: i64,
    #[allow(dead_code)]
    start_lat: f64,
    #[allow(dead_code)]
    start_lon: f64,
    start_soc: f32,
    end_time: i64,
    #[allow(dead_code)]
    end_lat: f64,
    #[allow(dead_code)]
    end_lon: f64,
    end_soc: f32,
    trip_duration: i64,
    trip_distance: Option<f32>,
    end_charging: u8,
}

/// Validated, time-ordered trip table with interned vehicle names.
#[derive(Debug, Clone)]
pub struct TripTable {
    trips: Vec<TripRecord>,
    names: Vec<String>,
}

impl TripTable {
    /// Builds a table from records and the vehicle-name table indexed by
    /// [`VehicleId`].
    ///
    /// # Errors
    ///
    /// Returns a `TripDataError` when the table is empty, not sorted
    /// ascending by start time, a trip ends before it starts, an SoC value
    /// is outside 0–100, or a vehicle id has no name entry.
    pub fn new(trips: Vec<TripRecord>, names: Vec<String>) -> Result<Self, TripDataError> {
        if trips.is_empty() {
            return Err(TripDataError::Empty);
        }

        let mut aligned = true;
        for (row, trip) in trips.iter().enumerate() {
            if trip.start_time > trip.end_time {
                return Err(TripDataError::InvalidRow {
                    row,
                    message: format!(
                        "start_time {} is after end_time {}",
                        trip.start_time, trip.end_time
                    ),
                });
            }
            for (field, soc) in [("start_soc", trip.start_soc), ("end_soc", trip.end_soc)] {
                if !(0.0..=100.0).contains(&soc) {
                    return Err(TripDataError::InvalidRow {
                        row,
                        message: format!("{field} {soc} outside 0–100"),
                    });
                }
            }
            if trip.vehicle.0 as usize >= names.len() {
                return Err(TripDataError::InvalidRow {
                    row,
                    message: format!("vehicle id {} has no name entry", trip.vehicle.0),
                });
            }
            if row > 0 && trips[row - 1].start_time > trip.start_time {
                return Err(TripDataError::Unsorted { row });
            }
            aligned &= trip.start_time % TICK_SECONDS == 0 && trip.end_time % TICK_SECONDS == 0;
        }

        if !aligned {
            // Off-grid timestamps never match a tick, so such trips would be
            // silently ignored by the fixed-grid replay.
            warn!("trip table contains timestamps not aligned to the 5-minute grid");
        }

        Ok(Self { trips, names })
    }

    /// Loads and validates a trip table from a CSV file.
    ///
    /// Expected header: `vehicle_id,start_time,start_lat,start_lon,start_soc,`
    /// `end_time,end_lat,end_lon,end_soc,trip_duration,trip_distance,end_charging`.
    ///
    /// # Errors
    ///
    /// Returns a `TripDataError` on I/O failures, malformed rows, or any
    /// validation failure of [`TripTable::new`].
    pub fn from_csv(path: &Path) -> Result<Self, TripDataError> {
        let display = path.display().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|source| TripDataError::Csv {
            path: display.clone(),
            row: 0,
            source,
        })?;

        let mut interner = NameInterner::default();
        let mut trips = Vec::new();
        for (row, record) in reader.deserialize::<RawTrip>().enumerate() {
            let raw = record.map_err(|source| TripDataError::Csv {
                path: display.clone(),
                row,
                source,
            })?;
            trips.push(TripRecord {
                vehicle: interner.intern(&raw.vehicle_id),
                start_time: raw.start_time,
                end_time: raw.end_time,
                start_soc: raw.start_soc,
                end_soc: raw.end_soc,
                trip_duration: raw.trip_duration,
                trip_distance_km: raw.trip_distance,
                end_charging: raw.end_charging != 0,
            });
        }

        Self::new(trips, interner.into_names())
    }

    pub fn trips(&self) -> &[TripRecord] {
        &self.trips
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Number of distinct vehicles appearing in the table.
    pub fn vehicle_count(&self) -> usize {
        self.names.len()
    }

    /// Display name of a vehicle.
    pub fn vehicle_name(&self, id: VehicleId) -> &str {
        &self.names[id.0 as usize]
    }

    /// `(min start_time, max end_time)` across all trips.
    ///
    /// The maximum is taken over the whole table; the last row by start time
    /// is not necessarily the last to end.
    pub fn time_bounds(&self) -> (i64, i64) {
        let start = self.trips[0].start_time;
        let end = self.trips.iter().map(|t| t.end_time).max().unwrap_or(start);
        (start, end)
    }
}

/// Assigns dense [`VehicleId`]s to vehicle names in order of first appearance.
#[derive(Debug, Default)]
pub struct NameInterner {
    by_name: HashMap<String, u32>,
    names: Vec<String>,
}

impl NameInterner {
    pub fn intern(&mut self, name: &str) -> VehicleId {
        if let Some(&id) = self.by_name.get(name) {
            return VehicleId(id);
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        VehicleId(id)
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn trip(vehicle: u32, start: i64, end: i64) -> TripRecord {
        TripRecord {
            vehicle: VehicleId(vehicle),
            start_time: start,
            end_time: end,
            start_soc: 80.0,
            end_soc: 70.0,
            trip_duration: (end - start) / 60,
            trip_distance_km: Some(2.0),
            end_charging: false,
        }
    }

    #[test]
    fn interner_reuses_ids_for_known_names() {
        let mut interner = NameInterner::default();
        let a = interner.intern("S-GO1234");
        let b = interner.intern("B-GO5678");
        assert_eq!(interner.intern("S-GO1234"), a);
        assert_ne!(a, b);
        assert_eq!(interner.into_names(), vec!["S-GO1234", "B-GO5678"]);
    }

    #[test]
    fn rejects_empty_table() {
        let err = TripTable::new(Vec::new(), Vec::new()).expect_err("must fail");
        assert!(matches!(err, TripDataError::Empty));
    }

    #[test]
    fn rejects_unsorted_table() {
        let trips = vec![trip(0, 600, 900), trip(0, 300, 1200)];
        let err = TripTable::new(trips, vec!["EV-1".into()]).expect_err("must fail");
        assert!(matches!(err, TripDataError::Unsorted { row: 1 }));
    }

    #[test]
    fn rejects_inverted_times() {
        let trips = vec![trip(0, 900, 600)];
        let err = TripTable::new(trips, vec!["EV-1".into()]).expect_err("must fail");
        assert!(matches!(err, TripDataError::InvalidRow { row: 0, .. }));
    }

    #[test]
    fn rejects_out_of_range_soc() {
        let mut bad = trip(0, 0, 300);
        bad.end_soc = 120.0;
        let err = TripTable::new(vec![bad], vec!["EV-1".into()]).expect_err("must fail");
        assert!(matches!(err, TripDataError::InvalidRow { row: 0, .. }));
    }

    #[test]
    fn time_bounds_span_whole_table() {
        // The second trip starts later but ends earlier than the first.
        let trips = vec![trip(0, 0, 7200), trip(1, 300, 1200)];
        let table = TripTable::new(trips, vec!["EV-1".into(), "EV-2".into()]).expect("valid");
        assert_eq!(table.time_bounds(), (0, 7200));
    }

    #[test]
    fn loads_csv_with_empty_trip_distance() {
        let mut file = tempfile_path("trips");
        writeln!(
            file.1,
            "vehicle_id,start_time,start_lat,start_lon,start_soc,end_time,end_lat,end_lon,end_soc,trip_duration,trip_distance,end_charging"
        )
        .expect("write header");
        writeln!(
            file.1,
            "S-GO1,0,52.52,13.40,80,900,52.53,13.41,70,15,2.5,1"
        )
        .expect("write row");
        writeln!(file.1, "S-GO2,300,52.52,13.40,60,1200,52.53,13.41,75,15,,0")
            .expect("write row");
        drop(file.1);

        let table = TripTable::from_csv(&file.0).expect("csv should load");
        assert_eq!(table.len(), 2);
        assert_eq!(table.vehicle_count(), 2);
        assert_eq!(table.trips()[0].trip_distance_km, Some(2.5));
        assert!(table.trips()[0].end_charging);
        // Charge increased on the second trip, so distance is undefined.
        assert_eq!(table.trips()[1].trip_distance_km, None);
        assert!(!table.trips()[1].end_charging);

        std::fs::remove_file(&file.0).ok();
    }

    fn tempfile_path(tag: &str) -> (std::path::PathBuf, std::fs::File) {
        let path = std::env::temp_dir().join(format!(
            "fleet-vpp-test-{tag}-{}.csv",
            std::process::id()
        ));
        let file = std::fs::File::create(&path).expect("create temp file");
        (path, file)
    }
}
