//! Replay of the call list over pre-state balances
//!
//! Amount caps ("repay at most the outstanding debt", "withdraw the entire
//! balance") depend on what earlier calls of the same batch did, so the rules
//! share one running replay instead of looking at calls in isolation.

use super::EvalContext;
use crate::calls::{CallParams, CallRecord, AMOUNT_MAX};
use ledger_model::math::{add_i128, add_u128, sub_u128, u128_to_i128};
use ledger_model::{Address, MissingEntry, Snapshot};
use std::collections::{BTreeMap, BTreeSet};

/// Signed per-asset and per-(user, asset) changes implied by the calls
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flows {
    pub per_asset: BTreeMap<Address, i128>,
    pub per_user: BTreeMap<(Address, Address), i128>,
    /// Balances after the replay
    pub running: BTreeMap<(Address, Address), u128>,
}

impl Flows {
    pub fn asset_delta(&self, asset: &Address) -> i128 {
        self.per_asset.get(asset).copied().unwrap_or(0)
    }

    pub fn user_delta(&self, user: &Address, asset: &Address) -> i128 {
        self.per_user.get(&(*user, *asset)).copied().unwrap_or(0)
    }

    fn balance(&mut self, pre: &Snapshot, user: Address, asset: Address, field: Field) -> Result<u128, MissingEntry> {
        if let Some(b) = self.running.get(&(user, asset)) {
            return Ok(*b);
        }
        let position = pre.position(&user, &asset)?;
        let b = match field {
            Field::Collateral => position.collateral,
            Field::Debt => position.debt,
        };
        self.running.insert((user, asset), b);
        Ok(b)
    }

    fn credit(&mut self, pre: &Snapshot, user: Address, asset: Address, field: Field, amount: u128) -> Result<(), MissingEntry> {
        let b = self.balance(pre, user, asset, field)?;
        self.running.insert((user, asset), add_u128(b, amount));
        self.record(user, asset, u128_to_i128(amount));
        Ok(())
    }

    /// Debit at most the running balance; returns the amount actually taken
    fn debit(&mut self, pre: &Snapshot, user: Address, asset: Address, field: Field, amount: u128) -> Result<u128, MissingEntry> {
        let b = self.balance(pre, user, asset, field)?;
        let taken = if amount == AMOUNT_MAX { b } else { amount.min(b) };
        self.running.insert((user, asset), sub_u128(b, taken));
        self.record(user, asset, -u128_to_i128(taken));
        Ok(taken)
    }

    fn record(&mut self, user: Address, asset: Address, delta: i128) {
        let a = self.per_asset.entry(asset).or_insert(0);
        *a = add_i128(*a, delta);
        let u = self.per_user.entry((user, asset)).or_insert(0);
        *u = add_i128(*u, delta);
    }
}

#[derive(Clone, Copy)]
enum Field {
    Collateral,
    Debt,
}

/// Debt covered by a liquidation: the pool's reported amount, otherwise the
/// requested amount capped at the running debt
fn covered_debt(call: &CallRecord, debt_to_cover: u128, running: u128) -> u128 {
    match call.outcome {
        Some(outcome) => outcome.debt_covered,
        None if debt_to_cover == AMOUNT_MAX => running,
        None => debt_to_cover.min(running),
    }
}

/// Variable debt opened and closed by the calls (before any deficit burn)
pub fn debt_flows(ctx: &EvalContext<'_>) -> Result<Flows, MissingEntry> {
    let mut flows = Flows::default();
    for call in ctx.calls {
        match &call.params {
            CallParams::Borrow {
                asset,
                amount,
                interest_rate_mode,
                on_behalf_of,
                ..
            } if interest_rate_mode.is_variable() => {
                flows.credit(ctx.pre, *on_behalf_of, *asset, Field::Debt, *amount)?;
            }
            CallParams::FlashLoan { legs, on_behalf_of, .. } => {
                for leg in legs.iter().filter(|l| l.mode.is_variable()) {
                    flows.credit(ctx.pre, *on_behalf_of, leg.asset, Field::Debt, leg.amount)?;
                }
            }
            CallParams::Repay {
                asset,
                amount,
                interest_rate_mode,
                on_behalf_of,
            } if interest_rate_mode.is_variable() => {
                flows.debit(ctx.pre, *on_behalf_of, *asset, Field::Debt, *amount)?;
            }
            CallParams::LiquidationCall {
                debt_asset,
                user,
                debt_to_cover,
                ..
            } => {
                let running = flows.balance(ctx.pre, *user, *debt_asset, Field::Debt)?;
                let covered = covered_debt(call, *debt_to_cover, running);
                flows.debit(ctx.pre, *user, *debt_asset, Field::Debt, covered)?;
            }
            _ => {}
        }
    }
    Ok(flows)
}

/// Collateral token movements implied by the calls
pub fn collateral_flows(ctx: &EvalContext<'_>) -> Result<Flows, MissingEntry> {
    let mut flows = Flows::default();
    for call in ctx.calls {
        match &call.params {
            CallParams::Supply {
                asset,
                amount,
                on_behalf_of,
                ..
            } => {
                flows.credit(ctx.pre, *on_behalf_of, *asset, Field::Collateral, *amount)?;
            }
            CallParams::Withdraw { asset, amount, .. } => {
                flows.debit(ctx.pre, call.caller, *asset, Field::Collateral, *amount)?;
            }
            CallParams::LiquidationCall {
                collateral_asset,
                user,
                receive_a_token,
                ..
            } => {
                let seized = seized_collateral(ctx, call, user, collateral_asset)?;
                let to_liquidator_as_a_token = call
                    .outcome
                    .map(|o| o.receive_a_token)
                    .unwrap_or(*receive_a_token);
                if to_liquidator_as_a_token {
                    // Balance moves between holders; supply is unchanged
                    flows.debit(ctx.pre, *user, *collateral_asset, Field::Collateral, seized)?;
                    flows.credit(ctx.pre, call.caller, *collateral_asset, Field::Collateral, seized)?;
                } else {
                    flows.debit(ctx.pre, *user, *collateral_asset, Field::Collateral, seized)?;
                }
            }
            _ => {}
        }
    }
    Ok(flows)
}

/// Collateral taken from the user: the pool's reported amount, otherwise the
/// observed balance reduction
fn seized_collateral(
    ctx: &EvalContext<'_>,
    call: &CallRecord,
    user: &Address,
    collateral_asset: &Address,
) -> Result<u128, MissingEntry> {
    if let Some(outcome) = call.outcome {
        return Ok(outcome.collateral_seized);
    }
    let pre = ctx.pre.position(user, collateral_asset)?.collateral;
    let post = ctx.post.position(user, collateral_asset)?.collateral;
    Ok(sub_u128(pre, post))
}

/// Users liquidated in this transaction
pub fn liquidated_users(ctx: &EvalContext<'_>) -> BTreeSet<Address> {
    ctx.calls
        .iter()
        .filter_map(|c| match &c.params {
            CallParams::LiquidationCall { user, .. } => Some(*user),
            _ => None,
        })
        .collect()
}

/// Liquidated users left without any collateral: their remaining debt is
/// burned into reserve deficits
pub fn written_off_users(ctx: &EvalContext<'_>) -> Result<BTreeSet<Address>, MissingEntry> {
    let mut out = BTreeSet::new();
    for user in liquidated_users(ctx) {
        if ctx.post.account(&user)?.total_collateral_base == 0 {
            out.insert(user);
        }
    }
    Ok(out)
}
