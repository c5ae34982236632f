//! Currency conversion adapters. Implement RatePort.
//!
//! `RateTable` holds units of each currency per one unit of the table's base
//! currency, so any pair converts through the base.

pub mod exchange_client;

pub use exchange_client::ExchangeRateClient;

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub base: String,
    pub rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(base: &str, rates: HashMap<String, f64>) -> Self {
        let base = base.to_uppercase();
        let mut rates: HashMap<String, f64> = rates
            .into_iter()
            .map(|(code, rate)| (code.to_uppercase(), rate))
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .collect();
        rates.insert(base.clone(), 1.0);
        Self { base, rates }
    }

    /// Cross conversion through the base. `None` when either side is unknown.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Some(amount);
        }
        let from_rate = self.rates.get(&from)?;
        let to_rate = self.rates.get(&to)?;
        Some(amount / from_rate * to_rate)
    }
}

/// Round to two decimals for display and ranking.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
