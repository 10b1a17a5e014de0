//! Seeded synthetic demo data: trip tables and clearing-price series.
//!
//! Stands in for real fleet telemetry when no data files are supplied, and
//! feeds the integration tests. Everything is driven by a single `StdRng`
//! so a seed fully determines the generated scenario.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capacity::ChargingParams;
use crate::market::SLOT_SECONDS;
use crate::trips::{TripDataError, TripRecord, TripTable, VehicleId};

/// Gaussian noise via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}

/// Generates a sorted, 5-minute-aligned trip table for `vehicles` EVs over
/// `days` days starting at `start_time` (epoch seconds, grid-aligned).
///
/// Per vehicle, rentals alternate with idle periods; SoC is continuous
/// across trips, and idle time at a charger recovers charge at the fleet
/// charging speed. Low-charge vehicles head for a charger.
///
/// # Errors
///
/// Returns a `TripDataError` if the generated table fails validation
/// (empty input ranges).
pub fn demo_trips(
    vehicles: u32,
    days: u32,
    start_time: i64,
    params: &ChargingParams,
    seed: u64,
) -> Result<TripTable, TripDataError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let horizon = start_time + i64::from(days) * 86_400;
    let step_per_minute = params.charging_step() / 5.0;

    let mut trips = Vec::new();
    let mut names = Vec::with_capacity(vehicles as usize);

    for v in 0..vehicles {
        names.push(format!("EV-{v:04}"));
        let id = VehicleId(v);

        let mut soc: f32 = rng.random_range(60.0..=100.0);
        // Stagger first departures over the first four hours.
        let mut cursor = start_time + 300 * rng.random_range(0..=48);

        loop {
            let duration_min = 5 * rng.random_range(2..=24);
            let end = cursor + duration_min * 60;
            if end >= horizon {
                break;
            }

            let max_drop = (soc - 5.0).max(0.0);
            let drop = (duration_min as f32 * rng.random_range(0.08..0.25)).min(max_drop);
            let end_soc = soc - drop;
            let end_charging = end_soc < 20.0 || rng.random_bool(0.4);

            trips.push(TripRecord {
                vehicle: id,
                start_time: cursor,
                end_time: end,
                start_soc: soc,
                end_soc,
                trip_duration: duration_min,
                trip_distance_km: Some(drop * 0.2),
                end_charging,
            });

            let idle_min = 5 * rng.random_range(3..=72);
            soc = end_soc;
            if end_charging {
                soc = (soc + idle_min as f32 * step_per_minute).min(100.0);
            }
            cursor = end + idle_min * 60;
        }
    }

    trips.sort_by_key(|t| t.start_time);
    TripTable::new(trips, names)
}

/// Generates a clearing-price series for every 15-minute slot in
/// `[start, end)`: a daily sinusoid around `base_eur_mwh` plus Gaussian
/// noise, the same shape the demo baseload follows.
pub fn demo_prices(
    start: i64,
    end: i64,
    base_eur_mwh: f32,
    amplitude_eur_mwh: f32,
    noise_std: f32,
    seed: u64,
) -> BTreeMap<i64, f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut prices = BTreeMap::new();

    let mut slot = start - start.rem_euclid(SLOT_SECONDS);
    if slot < start {
        slot += SLOT_SECONDS;
    }
    while slot < end {
        let day_fraction = slot.rem_euclid(86_400) as f32 / 86_400.0;
        let price = base_eur_mwh
            + amplitude_eur_mwh * (2.0 * std::f32::consts::PI * day_fraction + 1.2).sin()
            + gaussian_noise(&mut rng, noise_std);
        prices.insert(slot, price);
        slot += SLOT_SECONDS;
    }

    prices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ChargingParams {
        ChargingParams::new(3.6, 16.5, false)
    }

    #[test]
    fn same_seed_reproduces_the_same_table() {
        let a = demo_trips(5, 2, 0, &params(), 42).expect("generate");
        let b = demo_trips(5, 2, 0, &params(), 42).expect("generate");
        assert_eq!(a.trips(), b.trips());
    }

    #[test]
    fn different_seeds_differ() {
        let a = demo_trips(5, 2, 0, &params(), 42).expect("generate");
        let b = demo_trips(5, 2, 0, &params(), 43).expect("generate");
        assert_ne!(a.trips(), b.trips());
    }

    #[test]
    fn generated_table_is_grid_aligned_and_in_bounds() {
        let table = demo_trips(8, 3, 1_483_228_800, &params(), 7).expect("generate");
        let horizon = 1_483_228_800 + 3 * 86_400;

        for trip in table.trips() {
            assert_eq!(trip.start_time % 300, 0);
            assert_eq!(trip.end_time % 300, 0);
            assert!(trip.end_time < horizon);
            assert!((0.0..=100.0).contains(&trip.start_soc));
            assert!((0.0..=100.0).contains(&trip.end_soc));
        }
    }

    #[test]
    fn per_vehicle_trips_never_overlap() {
        let table = demo_trips(6, 3, 0, &params(), 11).expect("generate");
        let mut last_end: std::collections::BTreeMap<u32, i64> = Default::default();

        // Table order is start-time order; per vehicle each trip must start
        // after the previous one ended.
        for trip in table.trips() {
            if let Some(&end) = last_end.get(&trip.vehicle.0) {
                assert!(trip.start_time > end, "vehicle {} overlaps", trip.vehicle.0);
            }
            last_end.insert(trip.vehicle.0, trip.end_time);
        }
    }

    #[test]
    fn prices_cover_every_slot_in_range() {
        let prices = demo_prices(0, 86_400, 40.0, 8.0, 0.0, 1);
        assert_eq!(prices.len(), 96);
        assert!(prices.keys().all(|t| t % 900 == 0));
        // Noise-free prices stay within the sinusoid band.
        assert!(prices.values().all(|p| (32.0..=48.0).contains(p)));
    }

    #[test]
    fn price_series_is_seed_deterministic() {
        let a = demo_prices(0, 43_200, 40.0, 8.0, 2.0, 5);
        let b = demo_prices(0, 43_200, 40.0, 8.0, 2.0, 5);
        assert_eq!(a, b);
    }
}
