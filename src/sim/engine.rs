//! Event-driven replay of the trip table with periodic controller ticks.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::capacity::{ChargingParams, TICK_SECONDS};
use crate::controller::{BiddingController, BiddingStrategy};
use crate::sim::clock::EventQueue;
use crate::sim::vehicle::{Vehicle, Vpp};
use crate::trips::{TripTable, VehicleId};

/// Events multiplexed on the logical clock.
#[derive(Debug, Clone, Copy)]
enum SimEvent {
    /// A trip leaves with the vehicle; index into the trip table.
    TripStart { trip: usize },
    /// A drive activity completes.
    TripEnd {
        vehicle: VehicleId,
        end_soc: f32,
        end_charging: bool,
    },
    /// Periodic bidding-controller invocation.
    ControllerTick,
}

/// Result of one event-driven run.
#[derive(Debug)]
pub struct RunOutcome {
    pub controller: BiddingController,
    pub vpp: Vpp,
    pub vehicle_count: usize,
    pub trips_replayed: usize,
}

/// Discrete-event engine owning the fleet entities, the event queue, and
/// the bidding controller.
///
/// Generic over `S: BiddingStrategy` for static dispatch. Trip starts are
/// scheduled up-front in table order, so same-timestamp trips fire in table
/// order and before the controller tick armed for the same instant.
pub struct Engine<'a, S: BiddingStrategy> {
    table: &'a TripTable,
    strategy: S,
    controller: BiddingController,
    queue: EventQueue<SimEvent>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    vpp: Vpp,
    horizon: i64,
    trips_replayed: usize,
}

impl<'a, S: BiddingStrategy> Engine<'a, S> {
    /// Creates an engine for one run over `table`.
    pub fn new(
        table: &'a TripTable,
        strategy: S,
        controller: BiddingController,
        params: &ChargingParams,
    ) -> Self {
        let (start, horizon) = table.time_bounds();

        let mut queue = EventQueue::new();
        for (i, trip) in table.trips().iter().enumerate() {
            queue.schedule(trip.start_time, SimEvent::TripStart { trip: i });
        }
        queue.schedule(start, SimEvent::ControllerTick);

        Self {
            table,
            strategy,
            controller,
            queue,
            vehicles: BTreeMap::new(),
            vpp: Vpp::new(params.charging_speed_kw, params.charging_step()),
            horizon,
            trips_replayed: 0,
        }
    }

    /// Runs to the horizon (the maximum trip end time, inclusive) and
    /// returns the final state.
    pub fn run(mut self) -> RunOutcome {
        info!(
            strategy = self.strategy.name(),
            trips = self.table.len(),
            horizon = self.horizon,
            "starting simulation"
        );

        while let Some(time) = self.queue.peek_time() {
            if time > self.horizon {
                break;
            }
            let Some((now, event)) = self.queue.pop() else {
                break;
            };
            self.dispatch(now, event);
        }

        info!(
            trips_replayed = self.trips_replayed,
            vehicles = self.vehicles.len(),
            balance_eur = self.controller.account.balance_eur(),
            "simulation finished"
        );

        RunOutcome {
            controller: self.controller,
            vpp: self.vpp,
            vehicle_count: self.vehicles.len(),
            trips_replayed: self.trips_replayed,
        }
    }

    fn dispatch(&mut self, now: i64, event: SimEvent) {
        match event {
            SimEvent::TripStart { trip } => self.start_trip(now, trip),
            SimEvent::TripEnd {
                vehicle,
                end_soc,
                end_charging,
            } => self.end_trip(now, vehicle, end_soc, end_charging),
            SimEvent::ControllerTick => {
                self.strategy.on_tick(now, &mut self.controller);
                let next = now + TICK_SECONDS;
                if next <= self.horizon {
                    self.queue.schedule(next, SimEvent::ControllerTick);
                }
            }
        }
    }

    fn start_trip(&mut self, now: i64, index: usize) {
        let trip = &self.table.trips()[index];
        let id = trip.vehicle;

        let vehicle = self.vehicles.entry(id).or_insert_with(|| {
            info!(
                vehicle = self.table.vehicle_name(id),
                soc = trip.start_soc,
                "new EV joins the fleet"
            );
            Vehicle::new(id, trip.start_soc)
        });
        vehicle.soc = trip.start_soc;

        // A departing vehicle offers no flexibility.
        self.vpp.withdraw(id);

        self.queue.schedule(
            now + trip.trip_duration * 60,
            SimEvent::TripEnd {
                vehicle: id,
                end_soc: trip.end_soc,
                end_charging: trip.end_charging,
            },
        );
        self.trips_replayed += 1;

        debug!(
            vehicle = self.table.vehicle_name(id),
            now,
            duration_min = trip.trip_duration,
            "trip started"
        );
    }

    fn end_trip(&mut self, now: i64, id: VehicleId, end_soc: f32, end_charging: bool) {
        if let Some(vehicle) = self.vehicles.get_mut(&id) {
            vehicle.soc = end_soc;
        }

        let enrolled = end_charging && self.vpp.try_enroll(id, end_soc);
        debug!(
            vehicle = self.table.vehicle_name(id),
            now,
            soc = end_soc,
            enrolled,
            vpp_capacity_kw = self.vpp.capacity_kw(),
            "trip ended"
        );
    }
}
