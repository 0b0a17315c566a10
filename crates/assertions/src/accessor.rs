//! State Snapshot Accessor
//!
//! Reads the ledger, its tokens and the oracle at one checkpoint and freezes
//! the result into an immutable [`Snapshot`]. Unknown assets, tokens and
//! prices are errors: a missing value is never read as zero.

use crate::calls::{CallParams, CallRecord};
use crate::error::AssertionError;
use ledger_model::{
    AccountSnapshot, Address, Checkpoint, LiquidationConstants, PositionSnapshot, ReserveFlags, ReserveSnapshot,
    Snapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reserve configuration and accounting as stored by the pool
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveData {
    pub collateral_token: Address,
    pub debt_token: Address,
    pub flags: ReserveFlags,
    pub decimals: u8,
    pub supply_cap: u128,
    pub borrow_cap: u128,
    pub liquidity_index: u128,
    pub accrued_to_treasury: u128,
    pub virtual_balance: u128,
    pub deficit: u128,
    pub pending_ltv: u16,
    pub liquidation_grace_period_until: u64,
}

/// Read-only interface of the pool, its tokens and the oracle at one point in time
///
/// `None` means the ledger does not know the asset, token or account.
pub trait LedgerView {
    /// Listed reserves, indexed by reserve id
    fn reserves_list(&self) -> Vec<Address>;
    fn reserve_data(&self, asset: &Address) -> Option<ReserveData>;
    fn total_supply(&self, token: &Address) -> Option<u128>;
    fn scaled_total_supply(&self, token: &Address) -> Option<u128>;
    fn balance_of(&self, token: &Address, holder: &Address) -> Option<u128>;
    fn scaled_balance_of(&self, token: &Address, holder: &Address) -> Option<u128>;
    fn asset_price(&self, asset: &Address) -> Option<u128>;
    fn user_account_data(&self, user: &Address) -> Option<AccountSnapshot>;
    fn liquidation_constants(&self) -> LiquidationConstants;
    fn timestamp(&self) -> u64;
}

/// A ledger that can be observed at transaction entry and exit
pub trait CheckpointedLedger {
    fn view(&self, point: Checkpoint) -> &dyn LedgerView;
}

/// Two full copies of the ledger taken around one transaction
#[derive(Clone, Debug)]
pub struct CheckpointPair<L> {
    pub pre: L,
    pub post: L,
}

impl<L: LedgerView> CheckpointedLedger for CheckpointPair<L> {
    fn view(&self, point: Checkpoint) -> &dyn LedgerView {
        match point {
            Checkpoint::Pre => &self.pre,
            Checkpoint::Post => &self.post,
        }
    }
}

/// Assets and users an evaluation needs captured
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    pub assets: BTreeSet<Address>,
    pub users: BTreeSet<Address>,
}

impl Scope {
    /// Everything referenced by `calls`
    ///
    /// A liquidation widens the asset set to every listed reserve: deficit
    /// accounting needs the user's whole portfolio.
    pub fn of_calls<'a>(calls: impl IntoIterator<Item = &'a CallRecord>, reserves: &[Address]) -> Self {
        let mut scope = Scope::default();
        let mut liquidation = false;
        for call in calls {
            scope.assets.extend(call.params.assets());
            scope.users.extend(call.users());
            liquidation |= matches!(call.params, CallParams::LiquidationCall { .. });
        }
        if liquidation {
            scope.assets.extend(reserves.iter().filter(|a| !a.is_zero()).copied());
        }
        scope
    }
}

pub struct SnapshotAccessor<'a, L: ?Sized> {
    ledger: &'a L,
}

impl<'a, L: CheckpointedLedger + ?Sized> SnapshotAccessor<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Reserve list as seen at `point`
    pub fn reserves_list(&self, point: Checkpoint) -> Vec<Address> {
        self.ledger.view(point).reserves_list()
    }

    /// Per-asset view at `point`
    pub fn asset(&self, point: Checkpoint, asset: &Address) -> Result<ReserveSnapshot, AssertionError> {
        let view = self.ledger.view(point);
        let data = view
            .reserve_data(asset)
            .ok_or(AssertionError::AssetNotConfigured(*asset))?;
        if data.collateral_token.is_zero() || data.debt_token.is_zero() {
            return Err(AssertionError::AssetNotConfigured(*asset));
        }

        let token_not_found = |token: Address| AssertionError::TokenNotFound { asset: *asset, token };
        let collateral_supply = view
            .total_supply(&data.collateral_token)
            .ok_or_else(|| token_not_found(data.collateral_token))?;
        let scaled_collateral_supply = view
            .scaled_total_supply(&data.collateral_token)
            .ok_or_else(|| token_not_found(data.collateral_token))?;
        let debt_supply = view
            .total_supply(&data.debt_token)
            .ok_or_else(|| token_not_found(data.debt_token))?;
        let underlying_balance = view
            .balance_of(asset, &data.collateral_token)
            .ok_or_else(|| token_not_found(*asset))?;
        let price = view
            .asset_price(asset)
            .ok_or(AssertionError::PriceUnavailable(*asset))?;

        Ok(ReserveSnapshot {
            asset: *asset,
            collateral_token: data.collateral_token,
            debt_token: data.debt_token,
            flags: data.flags,
            decimals: data.decimals,
            supply_cap: data.supply_cap,
            borrow_cap: data.borrow_cap,
            liquidity_index: data.liquidity_index,
            accrued_to_treasury: data.accrued_to_treasury,
            virtual_balance: data.virtual_balance,
            deficit: data.deficit,
            pending_ltv: data.pending_ltv,
            liquidation_grace_period_until: data.liquidation_grace_period_until,
            collateral_supply,
            scaled_collateral_supply,
            debt_supply,
            underlying_balance,
            price,
        })
    }

    /// Per-user aggregate account data at `point`
    pub fn user(&self, point: Checkpoint, user: &Address) -> Result<AccountSnapshot, AssertionError> {
        self.ledger
            .view(point)
            .user_account_data(user)
            .ok_or(AssertionError::AccountUnavailable(*user))
    }

    /// Balances of `user` in the tokens of `reserve`
    pub fn position(
        &self,
        point: Checkpoint,
        user: &Address,
        reserve: &ReserveSnapshot,
    ) -> Result<PositionSnapshot, AssertionError> {
        let view = self.ledger.view(point);
        let token_not_found = |token: Address| AssertionError::TokenNotFound {
            asset: reserve.asset,
            token,
        };
        Ok(PositionSnapshot {
            collateral: view
                .balance_of(&reserve.collateral_token, user)
                .ok_or_else(|| token_not_found(reserve.collateral_token))?,
            scaled_collateral: view
                .scaled_balance_of(&reserve.collateral_token, user)
                .ok_or_else(|| token_not_found(reserve.collateral_token))?,
            debt: view
                .balance_of(&reserve.debt_token, user)
                .ok_or_else(|| token_not_found(reserve.debt_token))?,
        })
    }

    /// Freeze everything in `scope` at `point`
    pub fn capture(&self, point: Checkpoint, scope: &Scope) -> Result<Snapshot, AssertionError> {
        let view = self.ledger.view(point);
        let mut snapshot = Snapshot::new(point, view.timestamp(), view.liquidation_constants());

        for asset in &scope.assets {
            let reserve = self.asset(point, asset)?;
            for user in &scope.users {
                let position = self.position(point, user, &reserve)?;
                snapshot = snapshot.with_position(*user, *asset, position);
            }
            snapshot = snapshot.with_reserve(reserve);
        }
        for user in &scope.users {
            snapshot = snapshot.with_account(*user, self.user(point, user)?);
        }

        log::debug!(
            "captured {} snapshot: {} assets, {} users",
            point,
            scope.assets.len(),
            scope.users.len()
        );
        Ok(snapshot)
    }
}
