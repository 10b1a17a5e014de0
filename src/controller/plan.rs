//! Per-market consumption plan at simulation-tick resolution.

use std::collections::BTreeMap;

use crate::capacity::TICK_SECONDS;

/// Committed charging quantities per 5-minute timeslot.
///
/// Accepted 15-minute market bids are bridged to simulation resolution by
/// writing the quantity into the slot's three 5-minute sub-slots.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionPlan {
    committed: BTreeMap<i64, f32>,
}

impl ConsumptionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed quantity at a timeslot; 0 for slots never written.
    ///
    /// A recorded zero-quantity commitment is indistinguishable from an
    /// unset slot; the double-booking check upstream relies on exactly this
    /// behavior.
    pub fn committed_kw(&self, timeslot: i64) -> f32 {
        self.committed.get(&timeslot).copied().unwrap_or(0.0)
    }

    /// Records a commitment at one 5-minute timeslot.
    pub fn add(&mut self, timeslot: i64, quantity_kw: f32) {
        self.committed.insert(timeslot, quantity_kw);
    }

    /// Number of written 5-minute slots.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f32)> + '_ {
        self.committed.iter().map(|(&t, &kw)| (t, kw))
    }

    /// Total committed energy in MWh across all written sub-slots.
    pub fn total_energy_mwh(&self) -> f32 {
        let tick_hours = TICK_SECONDS as f32 / 3600.0;
        self.committed.values().map(|kw| kw * tick_hours).sum::<f32>() / 1000.0
    }
}
