//! Bidding strategies invoked once per controller tick.
//!
//! Each strategy decides, for the current clock value, which 15-minute
//! slots to bid on and with what share of the predicted capacity. All
//! failures below the double-booking invariant are local: the affected slot
//! is skipped and the run continues.

use chrono::{DateTime, Days, NaiveTime, Timelike, Utc};
use tracing::warn;

use super::{BiddingController, MarketSide};
use crate::market::SLOT_SECONDS;

/// Daily cutoff (UTC) at which next-day balancing bids are placed.
const BALANCING_CUTOFF_HOUR: u32 = 16;
/// Intraday bids target the slot this far ahead of the clock.
const INTRADAY_LEAD_SECONDS: i64 = 30 * 60;
/// 15-minute slots per calendar day.
const SLOTS_PER_DAY: i64 = 96;

/// Names accepted by the scenario configuration.
pub const STRATEGIES: &[&str] = &["regular", "balancing", "intraday", "integrated"];

/// A bidding strategy, invoked with the logical clock each controller tick.
pub trait BiddingStrategy {
    fn name(&self) -> &'static str;
    fn on_tick(&self, now: i64, controller: &mut BiddingController);
}

/// Predicts capacity for one slot and attempts the plan update, scaling by
/// `ratio`. Mirrors the per-slot error handling contract: prediction
/// failures and double bookings are warned about and skipped, never retried.
fn bid_for_slot(controller: &mut BiddingController, side: MarketSide, timeslot: i64, ratio: f32) {
    let quantity_kw = match controller.predict_min_capacity(timeslot) {
        Ok(kw) => kw * ratio,
        Err(err) => {
            warn!(timeslot, "could not update consumption plan: {err}");
            return;
        }
    };

    if let Err(err) = controller.update_consumption_plan(side, timeslot, quantity_kw) {
        warn!(timeslot, "could not update consumption plan: {err}");
    }
}

/// Baseline: charge at regular prices, no market participation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Regular;

impl BiddingStrategy for Regular {
    fn name(&self) -> &'static str {
        "regular"
    }

    fn on_tick(&self, _now: i64, _controller: &mut BiddingController) {}
}

/// Day-ahead benchmark: at the daily cutoff, bid every 15-minute slot of
/// the next calendar day on the balancing market.
#[derive(Debug, Clone, Copy)]
pub struct Balancing {
    pub ratio: f32,
}

impl Default for Balancing {
    fn default() -> Self {
        Self { ratio: 1.0 }
    }
}

impl BiddingStrategy for Balancing {
    fn name(&self) -> &'static str {
        "balancing"
    }

    fn on_tick(&self, now: i64, controller: &mut BiddingController) {
        let Some(clock) = DateTime::<Utc>::from_timestamp(now, 0) else {
            return;
        };
        if clock.hour() != BALANCING_CUTOFF_HOUR || clock.minute() != 0 || clock.second() != 0 {
            return;
        }

        let Some(tomorrow) = clock.date_naive().checked_add_days(Days::new(1)) else {
            return;
        };
        let midnight = tomorrow.and_time(NaiveTime::MIN).and_utc().timestamp();

        for slot in 0..SLOTS_PER_DAY {
            let timeslot = midnight + slot * SLOT_SECONDS;
            bid_for_slot(controller, MarketSide::Balancing, timeslot, self.ratio);
        }
    }
}

/// Intraday benchmark: bid the slot 30 minutes ahead whenever it lands on a
/// 15-minute boundary. The assumption carried over from the benchmark: 30
/// minutes ahead, capacity can always be procured at the clearing price.
#[derive(Debug, Clone, Copy)]
pub struct Intraday {
    pub ratio: f32,
}

impl Default for Intraday {
    fn default() -> Self {
        Self { ratio: 1.0 }
    }
}

impl BiddingStrategy for Intraday {
    fn name(&self) -> &'static str {
        "intraday"
    }

    fn on_tick(&self, now: i64, controller: &mut BiddingController) {
        let timeslot = now + INTRADAY_LEAD_SECONDS;
        if (timeslot / 60) % 15 != 0 {
            return;
        }
        bid_for_slot(controller, MarketSide::Intraday, timeslot, self.ratio);
    }
}

/// Combined strategy: half the predicted capacity day-ahead on the
/// balancing market, half intraday.
///
/// TODO: the 0.5/0.5 split does not necessarily add up to the full
/// predicted capacity; the prediction changes between the day-ahead cutoff
/// and the intraday window, and slots skipped on one market are not made up
/// on the other.
#[derive(Debug, Default, Clone, Copy)]
pub struct Integrated;

impl BiddingStrategy for Integrated {
    fn name(&self) -> &'static str {
        "integrated"
    }

    fn on_tick(&self, now: i64, controller: &mut BiddingController) {
        Balancing { ratio: 0.5 }.on_tick(now, controller);
        Intraday { ratio: 0.5 }.on_tick(now, controller);
    }
}
