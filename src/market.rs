//! Electricity-market collaborator: clearing-price forecasts and bidding.
//!
//! The controller treats the market as an oracle with two operations:
//! predicting the clearing price of a 15-minute slot and submitting a bid.
//! One price table serves both; the benchmark assumption carried over from
//! the bidding strategies is that a bid at the predicted clearing price is
//! procurable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Market timeslot length in seconds (15 minutes).
pub const SLOT_SECONDS: i64 = 900;

/// An accepted bid: market slot, procured quantity, and clearing price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid {
    /// 15-minute slot start, epoch seconds.
    pub timeslot: i64,
    pub quantity_kw: f32,
    pub price_eur_mwh: f32,
}

#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    /// No clearing-price forecast covers the requested slot.
    #[error("{market}: no clearing-price forecast for timeslot {timeslot}")]
    NoForecast { market: String, timeslot: i64 },
    /// The bid names a slot that is not 15-minute aligned.
    #[error("{market}: rejected bid for malformed timeslot {timeslot}")]
    MalformedTimeslot { market: String, timeslot: i64 },
}

/// Errors raised while loading a clearing-price table.
#[derive(Debug, Error)]
pub enum PriceDataError {
    #[error("price table `{path}`, row {row}: {source}")]
    Csv {
        path: String,
        row: usize,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    timestamp: i64,
    price_eur_mwh: f32,
}

/// A short-term electricity market with a clearing-price table per
/// 15-minute slot.
#[derive(Debug, Clone)]
pub struct Market {
    name: String,
    clearing_prices: BTreeMap<i64, f32>,
}

impl Market {
    pub fn new(name: impl Into<String>, clearing_prices: BTreeMap<i64, f32>) -> Self {
        Self {
            name: name.into(),
            clearing_prices,
        }
    }

    /// Loads a market from a price CSV with header `timestamp,price_eur_mwh`.
    ///
    /// # Errors
    ///
    /// Returns a `PriceDataError` on I/O failures or malformed rows.
    pub fn from_price_csv(name: impl Into<String>, path: &Path) -> Result<Self, PriceDataError> {
        let display = path.display().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|source| PriceDataError::Csv {
            path: display.clone(),
            row: 0,
            source,
        })?;

        let mut clearing_prices = BTreeMap::new();
        for (row, record) in reader.deserialize::<RawPrice>().enumerate() {
            let raw = record.map_err(|source| PriceDataError::Csv {
                path: display.clone(),
                row,
                source,
            })?;
            clearing_prices.insert(raw.timestamp, raw.price_eur_mwh);
        }

        Ok(Self::new(name, clearing_prices))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Predicted clearing price for the slot, EUR/MWh.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NoForecast` when no price data covers the slot.
    pub fn predict_clearing_price(&self, timeslot: i64) -> Result<f32, MarketError> {
        self.clearing_prices
            .get(&timeslot)
            .copied()
            .ok_or_else(|| MarketError::NoForecast {
                market: self.name.clone(),
                timeslot,
            })
    }

    /// Submits a bid for one 15-minute slot.
    ///
    /// Returns `Ok(Some(bid))` when the offered price meets or exceeds the
    /// clearing price: the full quantity is procured at the clearing price.
    /// Returns `Ok(None)` when the bid does not clear (offered price too
    /// low, or no clearing data for the slot).
    ///
    /// # Errors
    ///
    /// Returns `MarketError::MalformedTimeslot` when `timeslot` is not
    /// 15-minute aligned.
    pub fn bid(
        &self,
        timeslot: i64,
        price_eur_mwh: f32,
        quantity_kw: f32,
    ) -> Result<Option<Bid>, MarketError> {
        if timeslot.rem_euclid(SLOT_SECONDS) != 0 {
            return Err(MarketError::MalformedTimeslot {
                market: self.name.clone(),
                timeslot,
            });
        }

        let Some(&clearing) = self.clearing_prices.get(&timeslot) else {
            return Ok(None);
        };
        if price_eur_mwh < clearing {
            return Ok(None);
        }

        Ok(Some(Bid {
            timeslot,
            quantity_kw,
            price_eur_mwh: clearing,
        }))
    }
}
