//! Shared test fixtures for integration tests.

use std::collections::BTreeMap;

use fleet_vpp::capacity::ChargingParams;
use fleet_vpp::trips::{TripRecord, TripTable, VehicleId};

/// 2017-01-01 00:00:00 UTC.
pub const DAY0: i64 = 1_483_228_800;
/// Start of the following two days.
pub const DAY1: i64 = DAY0 + 86_400;
pub const DAY2: i64 = DAY0 + 2 * 86_400;

/// Default fleet parameters (3.6 kW charger, 16.5 kWh battery), charging
/// simulation off.
pub fn default_params() -> ChargingParams {
    ChargingParams::new(3.6, 16.5, false)
}

/// A trip record with the interesting fields exposed.
pub fn trip(
    vehicle: u32,
    start: i64,
    end: i64,
    start_soc: f32,
    end_soc: f32,
    end_charging: bool,
) -> TripRecord {
    TripRecord {
        vehicle: VehicleId(vehicle),
        start_time: start,
        end_time: end,
        start_soc,
        end_soc,
        trip_duration: (end - start) / 60,
        trip_distance_km: None,
        end_charging,
    }
}

/// Builds a validated table, naming vehicles `EV-<id>`.
pub fn table(trips: Vec<TripRecord>) -> TripTable {
    let vehicles = trips.iter().map(|t| t.vehicle.0).max().unwrap_or(0) + 1;
    let names = (0..vehicles).map(|i| format!("EV-{i}")).collect();
    TripTable::new(trips, names).expect("fixture table should be valid")
}

/// One vehicle parked at a charger from `DAY0 + 900` until `DAY2`, plus the
/// departing trip that withdraws it. Horizon: `DAY2 + 900`.
///
/// With charging simulation off this pins the VPP capacity at 3.6 kW for
/// the whole charging window, which makes bidding outcomes exact.
pub fn charging_window_table() -> TripTable {
    table(vec![
        trip(0, DAY0, DAY0 + 900, 80.0, 70.0, true),
        trip(0, DAY2, DAY2 + 900, 70.0, 60.0, false),
    ])
}

/// Flat clearing prices for every 15-minute slot in `[start, end)`.
pub fn flat_prices(start: i64, end: i64, price: f32) -> BTreeMap<i64, f32> {
    (0..(end - start) / 900)
        .map(|i| (start + i * 900, price))
        .collect()
}
