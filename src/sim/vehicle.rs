//! Fleet entities of the discrete-event run.

use std::collections::BTreeMap;

use crate::trips::VehicleId;

/// One carsharing EV. Created the first time its id appears in the trip
/// table; lives for the rest of the run.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Current state of charge, percent (0–100).
    pub soc: f32,
}

impl Vehicle {
    pub fn new(id: VehicleId, soc: f32) -> Self {
        Self { id, soc }
    }
}

/// The virtual power plant: charging vehicles currently offered as flexible
/// capacity.
#[derive(Debug, Clone)]
pub struct Vpp {
    enrolled: BTreeMap<VehicleId, f32>,
    charging_speed_kw: f32,
    charging_step: f32,
}

impl Vpp {
    pub fn new(charging_speed_kw: f32, charging_step: f32) -> Self {
        Self {
            enrolled: BTreeMap::new(),
            charging_speed_kw,
            charging_step,
        }
    }

    /// Enrolls a charging vehicle if its SoC leaves at least one charge
    /// step of headroom. Returns whether the vehicle was enrolled.
    pub fn try_enroll(&mut self, id: VehicleId, soc: f32) -> bool {
        if soc > 100.0 - self.charging_step {
            return false;
        }
        self.enrolled.insert(id, soc);
        true
    }

    /// Withdraws a vehicle; a no-op when it is not enrolled.
    pub fn withdraw(&mut self, id: VehicleId) {
        self.enrolled.remove(&id);
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.enrolled.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.enrolled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrolled.is_empty()
    }

    /// Aggregate flexible capacity: enrolled count times charger power.
    pub fn capacity_kw(&self) -> f32 {
        self.enrolled.len() as f32 * self.charging_speed_kw
    }

    /// Mean SoC of enrolled vehicles; 0 when empty.
    pub fn avg_soc(&self) -> f32 {
        if self.enrolled.is_empty() {
            return 0.0;
        }
        self.enrolled.values().sum::<f32>() / self.enrolled.len() as f32
    }
}
