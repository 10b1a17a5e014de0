//! Minimum-capacity forecasting over the aggregate capacity series.

use thiserror::Error;

use crate::capacity::{CapacityRow, TICK_SECONDS};
use crate::market::SLOT_SECONDS;

/// Raised when no capacity data covers a requested timeslot.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no capacity forecast for timeslot {timeslot}")]
pub struct ForecastError {
    pub timeslot: i64,
}

/// Guaranteed-capacity forecast backed by the fleet-state capacity series.
///
/// For a 15-minute market slot the prediction is the minimum VPP capacity
/// across the slot's three 5-minute ticks: capacity committed to a market
/// must be available for the whole slot, so the weakest tick bounds it.
#[derive(Debug, Clone)]
pub struct CapacityForecast {
    start: i64,
    capacity_kw: Vec<f32>,
}

impl CapacityForecast {
    /// Builds a forecast from the capacity series.
    ///
    /// Rows must be the contiguous 5-minute series produced by
    /// [`calculate_capacity`](crate::capacity::calculate_capacity).
    pub fn from_rows(rows: &[CapacityRow]) -> Self {
        Self {
            start: rows.first().map(|r| r.timestamp).unwrap_or(0),
            capacity_kw: rows.iter().map(|r| r.vpp_capacity_kw).collect(),
        }
    }

    fn capacity_at(&self, tick: i64) -> Option<f32> {
        if tick < self.start || (tick - self.start) % TICK_SECONDS != 0 {
            return None;
        }
        let index = ((tick - self.start) / TICK_SECONDS) as usize;
        self.capacity_kw.get(index).copied()
    }

    /// Minimum guaranteed VPP capacity over the 15-minute slot starting at
    /// `timeslot`.
    ///
    /// # Errors
    ///
    /// Returns a `ForecastError` when the slot is not fully covered by the
    /// capacity series or is not aligned to the 5-minute grid.
    pub fn min_capacity_kw(&self, timeslot: i64) -> Result<f32, ForecastError> {
        let mut min = f32::INFINITY;
        let mut tick = timeslot;
        while tick < timeslot + SLOT_SECONDS {
            let kw = self
                .capacity_at(tick)
                .ok_or(ForecastError { timeslot })?;
            min = min.min(kw);
            tick += TICK_SECONDS;
        }
        Ok(min)
    }
}
