//! Token supply accounting: debt and collateral totals, caps

use super::flows::{collateral_flows, debt_flows, written_off_users};
use super::{EvalContext, Findings, InvariantResult};
use crate::calls::CallParams;
use ledger_model::math::{add_i128, signed_delta, sub_i128, sub_u128, u128_to_i128};
use ledger_model::{cap_in_units, index_identity_claims, Address, MissingEntry};
use std::collections::BTreeSet;

pub const DEBT_SUPPLY: &str = "debt-supply-consistency";
pub const COLLATERAL_SUPPLY: &str = "collateral-supply-consistency";
pub const SUPPLY_CAP: &str = "supply-cap";
pub const BORROW_CAP: &str = "borrow-cap";

/// Debt token supply change equals borrowed minus repaid minus liquidated
/// minus written-off debt, with no tolerance
///
/// Each touched user's own debt balance must move by its call-implied amount,
/// and the supply change must equal the sum of those individual changes.
pub fn debt_supply_consistency(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let flows = debt_flows(ctx)?;
    let written_off = written_off_users(ctx)?;
    let users = ctx.touched_users();
    let mut f = Findings::new(DEBT_SUPPLY);

    let mut assets: BTreeSet<Address> = ctx.touched_assets();
    assets.extend(flows.per_asset.keys().copied());
    for reserve in ctx.post.reserves() {
        if reserve.deficit != ctx.pre.reserve(&reserve.asset)?.deficit {
            assets.insert(reserve.asset);
        }
    }

    for asset in &assets {
        let pre = ctx.pre.reserve(asset)?;
        let post = ctx.post.reserve(asset)?;

        let observed = signed_delta(pre.debt_supply, post.debt_supply);
        let burned = u128_to_i128(sub_u128(post.deficit, pre.deficit));
        let expected = sub_i128(flows.asset_delta(asset), burned);
        f.check(observed == expected, || {
            format!(
                "debt supply of {} changed by {}, calls imply {} (burned to deficit {})",
                asset, observed, expected, burned
            )
        });

        let mut individual = 0i128;
        for user in &users {
            let before = ctx.pre.position(user, asset)?.debt;
            let after = ctx.post.position(user, asset)?.debt;
            let change = signed_delta(before, after);
            individual = add_i128(individual, change);

            // Written-off balances are checked by deficit accounting
            if written_off.contains(user) {
                continue;
            }
            let implied = flows.user_delta(user, asset);
            f.check(change == implied, || {
                format!(
                    "debt of {} in {} changed by {}, calls imply {}",
                    user, asset, change, implied
                )
            });
        }
        f.check(individual == observed, || {
            format!(
                "Debt token supply change does not match individual balance changes: {} supply {}, balances {}",
                asset, observed, individual
            )
        });
    }

    Ok(f.finish())
}

/// Collateral token supply change equals supplied minus withdrawn minus
/// collateral seized for the liquidator in underlying
pub fn collateral_supply_consistency(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let flows = collateral_flows(ctx)?;
    let mut f = Findings::new(COLLATERAL_SUPPLY);

    let mut assets = ctx.touched_assets();
    assets.extend(flows.per_asset.keys().copied());

    for asset in &assets {
        let pre = ctx.pre.reserve(asset)?;
        let post = ctx.post.reserve(asset)?;
        let observed = signed_delta(pre.collateral_supply, post.collateral_supply);
        let expected = flows.asset_delta(asset);
        f.check(observed == expected, || {
            format!(
                "collateral supply of {} changed by {}, calls imply {}",
                asset, observed, expected
            )
        });
    }

    Ok(f.finish())
}

/// A supply that grows the reserve keeps it under its supply cap
pub fn supply_cap(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(SUPPLY_CAP);
    let assets: BTreeSet<Address> = ctx
        .calls
        .iter()
        .filter_map(|c| match &c.params {
            CallParams::Supply { asset, .. } => Some(*asset),
            _ => None,
        })
        .collect();

    for asset in &assets {
        let pre = ctx.pre.reserve(asset)?;
        let post = ctx.post.reserve(asset)?;
        if post.collateral_supply <= pre.collateral_supply {
            continue;
        }
        if let Some(cap) = cap_in_units(post.supply_cap, post.decimals) {
            let total = index_identity_claims(post);
            f.check(total <= cap, || {
                format!("supply cap of {} exceeded: {} > {}", asset, total, cap)
            });
        }
    }

    Ok(f.finish())
}

/// New debt keeps the reserve under its borrow cap
pub fn borrow_cap(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(BORROW_CAP);
    let mut assets = BTreeSet::new();
    for call in ctx.calls {
        match &call.params {
            CallParams::Borrow { asset, .. } => {
                assets.insert(*asset);
            }
            CallParams::FlashLoan { legs, .. } => {
                assets.extend(legs.iter().filter(|l| l.mode.is_variable()).map(|l| l.asset));
            }
            _ => {}
        }
    }

    for asset in &assets {
        let pre = ctx.pre.reserve(asset)?;
        let post = ctx.post.reserve(asset)?;
        if post.debt_supply <= pre.debt_supply {
            continue;
        }
        if let Some(cap) = cap_in_units(post.borrow_cap, post.decimals) {
            f.check(post.debt_supply <= cap, || {
                format!("borrow cap of {} exceeded: {} > {}", asset, post.debt_supply, cap)
            });
        }
    }

    Ok(f.finish())
}
