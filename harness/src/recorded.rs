//! Recorded ledger states and replay cases
//!
//! A case file holds the ledger as observed before and after one transaction,
//! plus the transaction's call frames and logs, all as JSON.

use anyhow::{Context, Result};
use lending_assertions::{CheckpointPair, LedgerView, ReserveData, Transaction};
use ledger_model::{AccountSnapshot, Address, LiquidationConstants};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedToken {
    pub total_supply: u128,
    /// Defaults to `total_supply` when omitted
    #[serde(default)]
    pub scaled_total_supply: Option<u128>,
    #[serde(default)]
    pub balances: BTreeMap<Address, u128>,
    #[serde(default)]
    pub scaled_balances: BTreeMap<Address, u128>,
}

/// Ledger state at one checkpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedLedger {
    pub timestamp: u64,
    pub constants: LiquidationConstants,
    /// Reserve ids in order; falls back to the keys of `reserves`
    pub reserves_list: Vec<Address>,
    pub reserves: BTreeMap<Address, ReserveData>,
    /// Collateral tokens, debt tokens and underlying assets
    pub tokens: BTreeMap<Address, RecordedToken>,
    pub prices: BTreeMap<Address, u128>,
    pub accounts: BTreeMap<Address, AccountSnapshot>,
}

impl LedgerView for RecordedLedger {
    fn reserves_list(&self) -> Vec<Address> {
        if self.reserves_list.is_empty() {
            self.reserves.keys().copied().collect()
        } else {
            self.reserves_list.clone()
        }
    }

    fn reserve_data(&self, asset: &Address) -> Option<ReserveData> {
        self.reserves.get(asset).cloned()
    }

    fn total_supply(&self, token: &Address) -> Option<u128> {
        self.tokens.get(token).map(|t| t.total_supply)
    }

    fn scaled_total_supply(&self, token: &Address) -> Option<u128> {
        self.tokens
            .get(token)
            .map(|t| t.scaled_total_supply.unwrap_or(t.total_supply))
    }

    fn balance_of(&self, token: &Address, holder: &Address) -> Option<u128> {
        self.tokens
            .get(token)
            .map(|t| t.balances.get(holder).copied().unwrap_or(0))
    }

    fn scaled_balance_of(&self, token: &Address, holder: &Address) -> Option<u128> {
        self.tokens.get(token).map(|t| {
            t.scaled_balances
                .get(holder)
                .or_else(|| t.balances.get(holder))
                .copied()
                .unwrap_or(0)
        })
    }

    fn asset_price(&self, asset: &Address) -> Option<u128> {
        self.prices.get(asset).copied()
    }

    fn user_account_data(&self, user: &Address) -> Option<AccountSnapshot> {
        self.accounts.get(user).copied()
    }

    fn liquidation_constants(&self) -> LiquidationConstants {
        self.constants
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Pass,
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedCase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pre: RecordedLedger,
    pub post: RecordedLedger,
    pub transaction: Transaction,
    /// Verdict the case is known to produce, for regression runs
    #[serde(default)]
    pub expect: Option<Expectation>,
}

impl RecordedCase {
    pub fn load(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let bytes = std::fs::read(expanded.as_ref()).context(format!("Failed to read case from {}", path))?;
        serde_json::from_slice(&bytes).context(format!("Failed to parse case JSON in {}", path))
    }

    pub fn ledger(&self) -> CheckpointPair<RecordedLedger> {
        CheckpointPair {
            pre: self.pre.clone(),
            post: self.post.clone(),
        }
    }
}
