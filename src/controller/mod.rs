//! Market-bidding controller: run-state, plan-update protocol, accounting.

pub mod plan;
pub mod strategy;

use thiserror::Error;
use tracing::{info, warn};

use crate::capacity::TICK_SECONDS;
use crate::forecast::{CapacityForecast, ForecastError};
use crate::market::{Bid, Market};

pub use plan::ConsumptionPlan;
pub use strategy::{Balancing, BiddingStrategy, Integrated, Intraday, Regular};

/// Running balance of savings versus the industry tariff, EUR.
#[derive(Debug, Clone, Default)]
pub struct Account {
    balance_eur: f32,
}

impl Account {
    pub fn add(&mut self, amount_eur: f32) {
        self.balance_eur += amount_eur;
    }

    pub fn balance_eur(&self) -> f32 {
        self.balance_eur
    }
}

/// The two markets the controller participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSide {
    Balancing,
    Intraday,
}

/// A market together with the consumption plan recording its commitments.
#[derive(Debug, Clone)]
pub struct MarketPlan {
    pub market: Market,
    pub plan: ConsumptionPlan,
}

impl MarketPlan {
    pub fn new(market: Market) -> Self {
        Self {
            market,
            plan: ConsumptionPlan::new(),
        }
    }
}

/// Counts of plan-update outcomes across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BidStats {
    /// Slots committed to a plan after a clean acceptance.
    pub committed: usize,
    /// Slots skipped because no clearing-price forecast was available.
    pub skipped_no_forecast: usize,
    /// Slots skipped because the industry tariff was cheaper.
    pub skipped_tariff: usize,
    /// Slots skipped after the market rejected the bid outright.
    pub rejected: usize,
    /// Slots skipped because the bid did not clear.
    pub unsuccessful: usize,
    /// Double-booking violations raised.
    pub double_booked: usize,
}

/// Double-booking is an invariant violation: a slot is committed at most
/// once per market per run, and an existing commitment is never overwritten.
#[derive(Debug, Error, PartialEq)]
#[error("timeslot {timeslot} was already in the {market} consumption plan ({committed_kw} kW)")]
pub struct AlreadyCommitted {
    pub market: String,
    pub timeslot: i64,
    pub committed_kw: f32,
}

/// Mutable run-state of the bidding controller.
///
/// Created at run start, handed by reference into the strategy each
/// controller tick, discarded at run end.
#[derive(Debug)]
pub struct BiddingController {
    pub balancing: MarketPlan,
    pub intraday: MarketPlan,
    pub account: Account,
    /// Fixed grid tariff the fleet pays outside market participation, EUR/MWh.
    pub industry_tariff_eur_mwh: f32,
    pub stats: BidStats,
    forecast: CapacityForecast,
}

impl BiddingController {
    pub fn new(
        balancing: Market,
        intraday: Market,
        forecast: CapacityForecast,
        industry_tariff_eur_mwh: f32,
    ) -> Self {
        Self {
            balancing: MarketPlan::new(balancing),
            intraday: MarketPlan::new(intraday),
            account: Account::default(),
            industry_tariff_eur_mwh,
            stats: BidStats::default(),
            forecast,
        }
    }

    /// Best-effort forecast of the flexible capacity guaranteed to be
    /// available over the 15-minute slot.
    ///
    /// # Errors
    ///
    /// Returns a `ForecastError` when no capacity data covers the slot.
    pub fn predict_min_capacity(&self, timeslot: i64) -> Result<f32, ForecastError> {
        self.forecast.min_capacity_kw(timeslot)
    }

    fn side(&self, side: MarketSide) -> &MarketPlan {
        match side {
            MarketSide::Balancing => &self.balancing,
            MarketSide::Intraday => &self.intraday,
        }
    }

    fn side_mut(&mut self, side: MarketSide) -> &mut MarketPlan {
        match side {
            MarketSide::Balancing => &mut self.balancing,
            MarketSide::Intraday => &mut self.intraday,
        }
    }

    /// Attempts to commit `quantity_kw` for the 15-minute slot at `timeslot`
    /// on one market.
    ///
    /// Recoverable conditions (missing forecast, unfavorable tariff,
    /// rejected or uncleared bid) are logged and skipped. On a clean
    /// acceptance the accounting step runs and the accepted quantity is
    /// written into the slot's three 5-minute sub-slots.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyCommitted`] when the accepted slot already holds a
    /// nonzero commitment; the existing plan entry is left untouched.
    pub fn update_consumption_plan(
        &mut self,
        side: MarketSide,
        timeslot: i64,
        quantity_kw: f32,
    ) -> Result<(), AlreadyCommitted> {
        let market_name = self.side(side).market.name().to_string();

        let predicted = match self.side(side).market.predict_clearing_price(timeslot) {
            Ok(price) => price,
            Err(err) => {
                warn!(market = %market_name, timeslot, "{err}");
                self.stats.skipped_no_forecast += 1;
                return Ok(());
            }
        };

        if predicted > self.industry_tariff_eur_mwh {
            info!(
                market = %market_name,
                timeslot,
                predicted_eur_mwh = predicted,
                "the industry tariff is cheaper"
            );
            self.stats.skipped_tariff += 1;
            return Ok(());
        }

        // Simple policy carried over from the benchmark: always bid at the
        // predicted clearing price.
        let bid = match self.side(side).market.bid(timeslot, predicted, quantity_kw) {
            Ok(Some(bid)) => bid,
            Ok(None) => {
                info!(market = %market_name, timeslot, "bid unsuccessful");
                self.stats.unsuccessful += 1;
                return Ok(());
            }
            Err(err) => {
                warn!(market = %market_name, timeslot, "{err}");
                self.stats.rejected += 1;
                return Ok(());
            }
        };

        let committed_kw = self.side(side).plan.committed_kw(bid.timeslot);
        if committed_kw != 0.0 {
            self.stats.double_booked += 1;
            return Err(AlreadyCommitted {
                market: market_name,
                timeslot: bid.timeslot,
                committed_kw,
            });
        }

        info!(
            market = %market_name,
            timeslot = bid.timeslot,
            "bought {:.2} kWh for {:.2} EUR/MWh",
            bid.quantity_kw * 0.25,
            bid.price_eur_mwh,
        );
        self.account_bid(&bid);

        for offset in [0, TICK_SECONDS, 2 * TICK_SECONDS] {
            self.side_mut(side)
                .plan
                .add(bid.timeslot + offset, bid.quantity_kw);
        }
        self.stats.committed += 1;
        Ok(())
    }

    /// Credits the account with the savings of an accepted bid over the
    /// industry tariff.
    fn account_bid(&mut self, bid: &Bid) {
        // 15-minute slot: kW -> MWh is quantity * 0.25 / 1000.
        let quantity_mwh = bid.quantity_kw * (15.0 / 60.0) / 1000.0;
        let market_cost = quantity_mwh * bid.price_eur_mwh;
        let tariff_cost = quantity_mwh * self.industry_tariff_eur_mwh;
        let savings = tariff_cost - market_cost;

        self.account.add(savings);
        info!(
            "charging for {:.2} EUR less than regularly, balance {:.2} EUR",
            savings,
            self.account.balance_eur()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::CapacityRow;
    use std::collections::BTreeMap;

    fn forecast_kw(values: &[f32]) -> CapacityForecast {
        let rows: Vec<CapacityRow> = values
            .iter()
            .enumerate()
            .map(|(i, &kw)| CapacityRow {
                timestamp: i as i64 * 300,
                fleet: 0,
                fleet_soc: 0.0,
                rent: 0,
                rent_soc: 0.0,
                charging: 0,
                charging_soc: 0.0,
                vpp: 0,
                vpp_soc: 0.0,
                vpp_capacity_kw: kw,
            })
            .collect();
        CapacityForecast::from_rows(&rows)
    }

    fn controller(balancing: &[(i64, f32)], tariff: f32) -> BiddingController {
        let prices: BTreeMap<i64, f32> = balancing.iter().copied().collect();
        BiddingController::new(
            Market::new("balancing", prices),
            Market::new("intraday", BTreeMap::new()),
            forecast_kw(&[10.0; 12]),
            tariff,
        )
    }

    #[test]
    fn favorable_bid_credits_savings_and_fills_sub_slots() {
        // Clearing 40 vs tariff 45 for 10 kW over 15 minutes: 0.025 MWh,
        // 0.125 EUR saved.
        let mut ctl = controller(&[(900, 40.0)], 45.0);
        ctl.update_consumption_plan(MarketSide::Balancing, 900, 10.0)
            .expect("clean acceptance");

        assert!((ctl.account.balance_eur() - 0.125).abs() < 1e-6);
        for slot in [900, 1200, 1500] {
            assert_eq!(ctl.balancing.plan.committed_kw(slot), 10.0);
        }
        assert_eq!(ctl.balancing.plan.len(), 3);
        assert_eq!(ctl.stats.committed, 1);
    }

    #[test]
    fn unfavorable_price_changes_nothing() {
        let mut ctl = controller(&[(900, 50.0)], 45.0);
        ctl.update_consumption_plan(MarketSide::Balancing, 900, 10.0)
            .expect("skip is not an error");

        assert_eq!(ctl.account.balance_eur(), 0.0);
        assert!(ctl.balancing.plan.is_empty());
        assert_eq!(ctl.stats.skipped_tariff, 1);
    }

    #[test]
    fn missing_forecast_skips_slot() {
        let mut ctl = controller(&[(900, 40.0)], 45.0);
        ctl.update_consumption_plan(MarketSide::Balancing, 1800, 10.0)
            .expect("skip is not an error");

        assert!(ctl.balancing.plan.is_empty());
        assert_eq!(ctl.stats.skipped_no_forecast, 1);
    }

    #[test]
    fn double_booking_is_a_deterministic_error() {
        let mut ctl = controller(&[(900, 40.0)], 45.0);
        ctl.update_consumption_plan(MarketSide::Balancing, 900, 10.0)
            .expect("first commitment");

        let err = ctl
            .update_consumption_plan(MarketSide::Balancing, 900, 5.0)
            .expect_err("second commitment must fail");
        assert_eq!(err.timeslot, 900);
        assert_eq!(err.committed_kw, 10.0);
        // The original commitment is preserved.
        assert_eq!(ctl.balancing.plan.committed_kw(900), 10.0);
        assert_eq!(ctl.stats.double_booked, 1);
        assert!((ctl.account.balance_eur() - 0.125).abs() < 1e-6);
    }

    #[test]
    fn plans_are_tracked_per_market() {
        let prices: BTreeMap<i64, f32> = [(900, 40.0)].into_iter().collect();
        let mut ctl = BiddingController::new(
            Market::new("balancing", prices.clone()),
            Market::new("intraday", prices),
            forecast_kw(&[10.0; 12]),
            45.0,
        );

        ctl.update_consumption_plan(MarketSide::Balancing, 900, 10.0)
            .expect("balancing commitment");
        // The same slot on the other market is a fresh commitment, not a
        // double booking.
        ctl.update_consumption_plan(MarketSide::Intraday, 900, 4.0)
            .expect("intraday commitment");

        assert_eq!(ctl.balancing.plan.committed_kw(900), 10.0);
        assert_eq!(ctl.intraday.plan.committed_kw(900), 4.0);
        assert_eq!(ctl.stats.committed, 2);
    }

    #[test]
    fn accepted_zero_quantity_commitment_reads_as_unset() {
        // The nonzero double-booking check cannot tell a recorded 0 kW
        // commitment from an untouched slot, so a second update succeeds.
        let mut ctl = controller(&[(900, 40.0)], 45.0);
        ctl.update_consumption_plan(MarketSide::Balancing, 900, 0.0)
            .expect("zero-quantity acceptance");
        assert_eq!(ctl.stats.committed, 1);

        ctl.update_consumption_plan(MarketSide::Balancing, 900, 10.0)
            .expect("slot still reads as unset");
        assert_eq!(ctl.balancing.plan.committed_kw(900), 10.0);
        assert_eq!(ctl.stats.committed, 2);
    }
}
