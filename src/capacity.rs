//! Fleet-state simulation on the fixed 5-minute grid.
//!
//! Replays the trip table tick by tick, maintaining four membership maps
//! (`fleet`, `rent`, `charging`, `vpp`) and emitting one aggregate row per
//! tick. The per-tick stage order is a contract: charge, evict, end trips,
//! start trips. Reordering the stages changes the emitted series.

use std::collections::BTreeMap;

use crate::trips::{TripTable, VehicleId};

/// Simulation tick length in seconds.
pub const TICK_SECONDS: i64 = 300;
/// Simulation tick length in minutes.
pub const TICK_MINUTES: f32 = 5.0;

/// Physical fleet parameters shared by both simulation modes.
///
/// # Examples
///
/// ```
/// use fleet_vpp::capacity::ChargingParams;
///
/// let params = ChargingParams::new(3.6, 16.5, false);
/// assert!((params.charging_step() - 1.818182).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct ChargingParams {
    /// Charger power in kW.
    pub charging_speed_kw: f32,
    /// Vehicle battery capacity in kWh.
    pub battery_capacity_kwh: f32,
    /// Whether plugged-in vehicles gain charge linearly each tick.
    pub sim_charging: bool,
}

impl ChargingParams {
    /// Creates charging parameters.
    ///
    /// # Panics
    ///
    /// Panics if `charging_speed_kw` or `battery_capacity_kwh` is not positive.
    pub fn new(charging_speed_kw: f32, battery_capacity_kwh: f32, sim_charging: bool) -> Self {
        assert!(charging_speed_kw > 0.0, "charging_speed_kw must be > 0");
        assert!(battery_capacity_kwh > 0.0, "battery_capacity_kwh must be > 0");
        Self {
            charging_speed_kw,
            battery_capacity_kwh,
            sim_charging,
        }
    }

    /// Percent SoC a plugged-in vehicle gains in one tick.
    ///
    /// Derived once per run: `100 * (speed/60 * tick_minutes) / capacity`.
    pub fn charging_step(&self) -> f32 {
        let kwh_per_tick = self.charging_speed_kw / 60.0 * TICK_MINUTES;
        100.0 * kwh_per_tick / self.battery_capacity_kwh
    }
}

/// One aggregate output row per simulation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityRow {
    /// Tick timestamp, epoch seconds, 5-minute aligned.
    pub timestamp: i64,
    /// Vehicles known to the fleet so far.
    pub fleet: usize,
    pub fleet_soc: f32,
    /// Vehicles available for rental.
    pub rent: usize,
    pub rent_soc: f32,
    /// Vehicles plugged in at a charging station.
    pub charging: usize,
    pub charging_soc: f32,
    /// Charging vehicles with enough headroom for one more charge step.
    pub vpp: usize,
    pub vpp_soc: f32,
    /// Flexible capacity offered to markets: `vpp * charging_speed_kw`.
    pub vpp_capacity_kw: f32,
}

/// Mean SoC of a membership map; 0 for an empty map.
fn avg_soc(members: &BTreeMap<VehicleId, f32>) -> f32 {
    if members.is_empty() {
        return 0.0;
    }
    members.values().sum::<f32>() / members.len() as f32
}

/// Replays the trip table on the 5-minute grid and returns the aggregate
/// capacity series.
///
/// Emits one row per tick over `[min start_time, max end_time]` inclusive:
/// `(max_end - min_start) / 300 + 1` rows, strictly increasing by 300 s.
///
/// Per tick, in contract order:
/// 1. If `sim_charging`: every `charging` vehicle gains one charge step
///    (saturating at 100); every `vpp` vehicle gains the step unconditionally.
/// 2. `vpp` drops vehicles whose SoC exceeds `100 - charging_step`.
/// 3. Trips ending now update `fleet` and enter `rent`; trips that ended
///    at a charger also enter `charging` and, with headroom, `vpp`.
/// 4. Trips starting now update `fleet` and leave `rent`, `charging`, `vpp`.
///
/// A vehicle that ends and starts a trip at the same tick passes through
/// stage 3 and then stage 4: briefly marked available, then removed. The
/// emitted row reflects the state after stage 4.
pub fn calculate_capacity(table: &TripTable, params: &ChargingParams) -> Vec<CapacityRow> {
    let charging_step = params.charging_step();
    let (start, end) = table.time_bounds();

    // Trip indices per tick, in table order.
    let mut ends_at: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    let mut starts_at: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, trip) in table.trips().iter().enumerate() {
        ends_at.entry(trip.end_time).or_default().push(i);
        starts_at.entry(trip.start_time).or_default().push(i);
    }

    let mut fleet: BTreeMap<VehicleId, f32> = BTreeMap::new();
    let mut rent: BTreeMap<VehicleId, f32> = BTreeMap::new();
    let mut charging: BTreeMap<VehicleId, f32> = BTreeMap::new();
    let mut vpp: BTreeMap<VehicleId, f32> = BTreeMap::new();

    let ticks = (end - start) / TICK_SECONDS + 1;
    let mut rows = Vec::with_capacity(ticks as usize);

    let mut t = start;
    while t <= end {
        // 1. Plugged-in vehicles charge linearly.
        if params.sim_charging {
            for soc in charging.values_mut() {
                if *soc <= 100.0 - charging_step {
                    *soc += charging_step;
                } else {
                    *soc = 100.0;
                }
            }
            // VPP members always have headroom here; stage 2 removes any
            // that no longer do.
            for soc in vpp.values_mut() {
                *soc += charging_step;
            }
        }

        // 2. Keep only vehicles with capacity for one more charge step.
        vpp.retain(|_, soc| *soc <= 100.0 - charging_step);

        // 3. Trip-ending vehicles become available.
        if let Some(ending) = ends_at.get(&t) {
            for &i in ending {
                let trip = &table.trips()[i];
                fleet.insert(trip.vehicle, trip.end_soc);
                rent.insert(trip.vehicle, trip.end_soc);
                if trip.end_charging {
                    charging.insert(trip.vehicle, trip.end_soc);
                    if trip.end_soc <= 100.0 - charging_step {
                        vpp.insert(trip.vehicle, trip.end_soc);
                    }
                }
            }
        }

        // 4. Trip-starting vehicles join the fleet and become unavailable.
        if let Some(starting) = starts_at.get(&t) {
            for &i in starting {
                let trip = &table.trips()[i];
                fleet.insert(trip.vehicle, trip.start_soc);
                rent.remove(&trip.vehicle);
                charging.remove(&trip.vehicle);
                vpp.remove(&trip.vehicle);
            }
        }

        rows.push(CapacityRow {
            timestamp: t,
            fleet: fleet.len(),
            fleet_soc: avg_soc(&fleet),
            rent: rent.len(),
            rent_soc: avg_soc(&rent),
            charging: charging.len(),
            charging_soc: avg_soc(&charging),
            vpp: vpp.len(),
            vpp_soc: avg_soc(&vpp),
            vpp_capacity_kw: vpp.len() as f32 * params.charging_speed_kw,
        });

        t += TICK_SECONDS;
    }

    rows
}
