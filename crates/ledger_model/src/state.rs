//! Immutable ledger snapshots taken at transaction entry and exit

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 1e27 fixed-point unit for indexes
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;
/// 1e18 fixed-point unit for health factors
pub const WAD: u128 = 1_000_000_000_000_000_000;
/// 100% in basis points
pub const BPS: u128 = 10_000;
/// Health factor reported for accounts without debt
pub const HEALTH_FACTOR_NO_DEBT: u128 = u128::MAX;

/// Point in the transaction a snapshot was taken at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Checkpoint {
    Pre,
    Post,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Pre => write!(f, "pre"),
            Checkpoint::Post => write!(f, "post"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveFlags {
    pub active: bool,
    pub frozen: bool,
    pub paused: bool,
    pub borrowing_enabled: bool,
}

impl ReserveFlags {
    /// Flags of a freshly listed, fully enabled reserve
    pub fn enabled() -> Self {
        Self {
            active: true,
            frozen: false,
            paused: false,
            borrowing_enabled: true,
        }
    }
}

/// Per-asset view: reserve configuration, accounting and token totals
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveSnapshot {
    pub asset: Address,
    pub collateral_token: Address,
    pub debt_token: Address,
    pub flags: ReserveFlags,
    pub decimals: u8,
    /// Whole tokens, 0 = no cap
    pub supply_cap: u128,
    /// Whole tokens, 0 = no cap
    pub borrow_cap: u128,
    pub liquidity_index: u128, // ray
    pub accrued_to_treasury: u128, // scaled
    pub virtual_balance: u128,
    pub deficit: u128,
    pub pending_ltv: u16,
    pub liquidation_grace_period_until: u64,
    pub collateral_supply: u128,
    pub scaled_collateral_supply: u128,
    pub debt_supply: u128,
    /// Underlying tokens held by the collateral token contract
    pub underlying_balance: u128,
    /// Oracle price in base currency units
    pub price: u128,
}

/// Per (user, asset) balances
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub collateral: u128,
    pub scaled_collateral: u128,
    pub debt: u128,
}

/// Per-user aggregate account data as reported by the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub total_collateral_base: u128,
    pub total_debt_base: u128,
    pub health_factor: u128, // wad
}

impl Default for AccountSnapshot {
    fn default() -> Self {
        Self {
            total_collateral_base: 0,
            total_debt_base: 0,
            health_factor: HEALTH_FACTOR_NO_DEBT,
        }
    }
}

/// Liquidation constants exposed by the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationConstants {
    pub close_factor_bps: u16,
    /// Below this health factor the full debt may be covered (wad)
    pub close_factor_hf_threshold: u128,
    /// Positions below this debt (base currency) may be fully covered
    pub min_base_max_close_factor_threshold: u128,
    /// Minimum dust left on either side of a partial liquidation (base currency)
    pub min_leftover_base: u128,
}

impl Default for LiquidationConstants {
    fn default() -> Self {
        Self {
            close_factor_bps: 5_000,
            close_factor_hf_threshold: 950_000_000_000_000_000,
            min_base_max_close_factor_threshold: 2_000 * 100_000_000,
            min_leftover_base: 1_000 * 100_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissingEntry {
    #[error("reserve {0} not captured in snapshot")]
    Reserve(Address),
    #[error("position of {user} in {asset} not captured in snapshot")]
    Position { user: Address, asset: Address },
    #[error("account {0} not captured in snapshot")]
    Account(Address),
}

/// Immutable view of everything one evaluation reads at one checkpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub point: Checkpoint,
    pub timestamp: u64,
    pub constants: LiquidationConstants,
    reserves: BTreeMap<Address, ReserveSnapshot>,
    positions: BTreeMap<(Address, Address), PositionSnapshot>,
    accounts: BTreeMap<Address, AccountSnapshot>,
}

impl Snapshot {
    pub fn new(point: Checkpoint, timestamp: u64, constants: LiquidationConstants) -> Self {
        Self {
            point,
            timestamp,
            constants,
            reserves: BTreeMap::new(),
            positions: BTreeMap::new(),
            accounts: BTreeMap::new(),
        }
    }

    pub fn with_reserve(mut self, reserve: ReserveSnapshot) -> Self {
        self.reserves.insert(reserve.asset, reserve);
        self
    }

    pub fn with_position(mut self, user: Address, asset: Address, position: PositionSnapshot) -> Self {
        self.positions.insert((user, asset), position);
        self
    }

    pub fn with_account(mut self, user: Address, account: AccountSnapshot) -> Self {
        self.accounts.insert(user, account);
        self
    }

    pub fn reserve(&self, asset: &Address) -> Result<&ReserveSnapshot, MissingEntry> {
        self.reserves.get(asset).ok_or(MissingEntry::Reserve(*asset))
    }

    pub fn position(&self, user: &Address, asset: &Address) -> Result<&PositionSnapshot, MissingEntry> {
        self.positions
            .get(&(*user, *asset))
            .ok_or(MissingEntry::Position { user: *user, asset: *asset })
    }

    pub fn account(&self, user: &Address) -> Result<&AccountSnapshot, MissingEntry> {
        self.accounts.get(user).ok_or(MissingEntry::Account(*user))
    }

    pub fn reserves(&self) -> impl Iterator<Item = &ReserveSnapshot> {
        self.reserves.values()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Address> {
        self.reserves.keys()
    }
}
