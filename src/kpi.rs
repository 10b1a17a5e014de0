//! Post-hoc KPI aggregation over a complete run.

use std::fmt;

use crate::capacity::CapacityRow;
use crate::controller::BidStats;
use crate::sim::RunOutcome;

/// Aggregate indicators derived from the capacity series and the
/// event-driven run.
///
/// Computed post-hoc so the report always matches the emitted series.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of 5-minute ticks in the capacity series.
    pub ticks: usize,
    /// Largest fleet observed.
    pub fleet_size: usize,
    /// Peak simultaneous VPP enrollment.
    pub peak_vpp_count: usize,
    /// Peak flexible capacity (kW).
    pub peak_vpp_capacity_kw: f32,
    /// Mean flexible capacity across all ticks (kW).
    pub mean_vpp_capacity_kw: f32,
    /// Vehicles instantiated by the event-driven run.
    pub vehicle_count: usize,
    /// Trips replayed by the event-driven run.
    pub trips_replayed: usize,
    /// Final account balance (EUR saved versus the industry tariff).
    pub balance_eur: f32,
    /// Energy committed across both consumption plans (MWh).
    pub committed_energy_mwh: f32,
    /// Plan-update outcome counts.
    pub stats: BidStats,
}

impl RunReport {
    /// Builds the report from the capacity series and the run outcome.
    pub fn from_run(rows: &[CapacityRow], outcome: &RunOutcome) -> Self {
        let mut fleet_size = 0;
        let mut peak_vpp_count = 0;
        let mut peak_capacity = 0.0_f32;
        let mut capacity_sum = 0.0_f32;

        for row in rows {
            fleet_size = fleet_size.max(row.fleet);
            peak_vpp_count = peak_vpp_count.max(row.vpp);
            peak_capacity = peak_capacity.max(row.vpp_capacity_kw);
            capacity_sum += row.vpp_capacity_kw;
        }

        let mean_capacity = if rows.is_empty() {
            0.0
        } else {
            capacity_sum / rows.len() as f32
        };

        let committed_energy_mwh = outcome.controller.balancing.plan.total_energy_mwh()
            + outcome.controller.intraday.plan.total_energy_mwh();

        Self {
            ticks: rows.len(),
            fleet_size,
            peak_vpp_count,
            peak_vpp_capacity_kw: peak_capacity,
            mean_vpp_capacity_kw: mean_capacity,
            vehicle_count: outcome.vehicle_count,
            trips_replayed: outcome.trips_replayed,
            balance_eur: outcome.controller.account.balance_eur(),
            committed_energy_mwh,
            stats: outcome.controller.stats,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Report ---")?;
        writeln!(f, "Ticks simulated: {}", self.ticks)?;
        writeln!(f, "Fleet size: {}", self.fleet_size)?;
        writeln!(
            f,
            "Peak VPP: {} EVs / {:.2} kW",
            self.peak_vpp_count, self.peak_vpp_capacity_kw
        )?;
        writeln!(f, "Mean VPP capacity: {:.2} kW", self.mean_vpp_capacity_kw)?;
        writeln!(
            f,
            "Trips replayed: {} ({} vehicles)",
            self.trips_replayed, self.vehicle_count
        )?;
        writeln!(
            f,
            "Committed energy: {:.4} MWh over {} slots",
            self.committed_energy_mwh, self.stats.committed
        )?;
        writeln!(
            f,
            "Slots skipped: {} no forecast, {} tariff cheaper, {} rejected, {} uncleared, {} double-booked",
            self.stats.skipped_no_forecast,
            self.stats.skipped_tariff,
            self.stats.rejected,
            self.stats.unsuccessful,
            self.stats.double_booked
        )?;
        write!(f, "Account balance: {:.2} EUR", self.balance_eur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::{ChargingParams, calculate_capacity};
    use crate::controller::{BiddingController, Regular};
    use crate::forecast::CapacityForecast;
    use crate::market::Market;
    use crate::sim::Engine;
    use crate::trips::{TripRecord, TripTable, VehicleId};
    use std::collections::BTreeMap;

    fn outcome_and_rows() -> (Vec<CapacityRow>, RunOutcome) {
        let trips = vec![
            TripRecord {
                vehicle: VehicleId(0),
                start_time: 0,
                end_time: 900,
                start_soc: 80.0,
                end_soc: 70.0,
                trip_duration: 15,
                trip_distance_km: Some(2.0),
                end_charging: true,
            },
            TripRecord {
                vehicle: VehicleId(1),
                start_time: 300,
                end_time: 3600,
                start_soc: 60.0,
                end_soc: 50.0,
                trip_duration: 55,
                trip_distance_km: Some(4.0),
                end_charging: false,
            },
        ];
        let table = TripTable::new(trips, vec!["EV-0".into(), "EV-1".into()]).expect("valid");
        let params = ChargingParams::new(3.6, 16.5, false);
        let rows = calculate_capacity(&table, &params);
        let controller = BiddingController::new(
            Market::new("balancing", BTreeMap::new()),
            Market::new("intraday", BTreeMap::new()),
            CapacityForecast::from_rows(&rows),
            45.0,
        );
        let outcome = Engine::new(&table, Regular, controller, &params).run();
        (rows, outcome)
    }

    #[test]
    fn aggregates_match_the_run() {
        let (rows, outcome) = outcome_and_rows();
        let report = RunReport::from_run(&rows, &outcome);

        assert_eq!(report.ticks, 13);
        assert_eq!(report.fleet_size, 2);
        assert_eq!(report.peak_vpp_count, 1);
        assert!((report.peak_vpp_capacity_kw - 3.6).abs() < 1e-6);
        assert_eq!(report.trips_replayed, 2);
        assert_eq!(report.vehicle_count, 2);
        assert_eq!(report.balance_eur, 0.0);
        assert_eq!(report.committed_energy_mwh, 0.0);
    }

    #[test]
    fn empty_series_reports_zeros() {
        let (_, outcome) = outcome_and_rows();
        let report = RunReport::from_run(&[], &outcome);
        assert_eq!(report.ticks, 0);
        assert_eq!(report.mean_vpp_capacity_kw, 0.0);
    }

    #[test]
    fn display_does_not_panic() {
        let (rows, outcome) = outcome_and_rows();
        let report = RunReport::from_run(&rows, &outcome);
        let text = format!("{report}");
        assert!(text.contains("Account balance"));
    }
}
