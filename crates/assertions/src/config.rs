//! Engine tolerances and thresholds

use ledger_model::{BPS, WAD};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssertionConfig {
    /// Absolute slack of the liquidity index identity, in smallest units.
    /// Absorbs ray-multiplication rounding only.
    pub index_tolerance: u64,

    /// Largest oracle move tolerated within one transaction
    pub max_price_deviation_bps: u64,

    /// Flash loan premium charged by the pool
    pub flash_loan_premium_bps: u64,

    /// Liquidations require the pre health factor below this (wad)
    pub liquidation_health_factor_threshold: u64,

    /// Liquidations must leave the user at or above this (wad)
    pub min_post_liquidation_health_factor: u64,

    /// Rules excluded from evaluation, by name
    pub disabled_rules: Vec<String>,
}

impl Default for AssertionConfig {
    fn default() -> Self {
        Self {
            index_tolerance: 10,
            max_price_deviation_bps: 500,
            flash_loan_premium_bps: 5,
            liquidation_health_factor_threshold: WAD as u64,
            min_post_liquidation_health_factor: 950_000_000_000_000_000,
            disabled_rules: Vec::new(),
        }
    }
}

impl AssertionConfig {
    pub fn index_tolerance(&self) -> u128 {
        self.index_tolerance as u128
    }

    pub fn max_price_deviation_bps(&self) -> u128 {
        (self.max_price_deviation_bps as u128).min(BPS * 100)
    }

    pub fn flash_loan_premium_bps(&self) -> u128 {
        self.flash_loan_premium_bps as u128
    }

    pub fn liquidation_health_factor_threshold(&self) -> u128 {
        self.liquidation_health_factor_threshold as u128
    }

    pub fn min_post_liquidation_health_factor(&self) -> u128 {
        self.min_post_liquidation_health_factor as u128
    }
}
