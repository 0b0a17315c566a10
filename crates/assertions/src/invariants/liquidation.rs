//! Liquidation sizing and timing

use super::{EvalContext, Findings, InvariantResult};
use crate::calls::{CallParams, AMOUNT_MAX};
use ledger_model::math::{add_u128, percent_of};
use ledger_model::{value_in_base, Address, MissingEntry};
use std::collections::{BTreeMap, BTreeSet};

pub const CLOSE_FACTOR: &str = "liquidation-close-factor";
pub const GRACE_PERIOD: &str = "liquidation-grace-period";

/// Covering more than the close factor is only legal for small or deeply
/// unhealthy positions, and a partial liquidation must not leave dust
///
/// A full close is allowed when the pre-state debt of the covered reserve is
/// below `min_base_max_close_factor_threshold` in base currency, or when the
/// health factor is strictly below `close_factor_hf_threshold` (0.95). The
/// 3.3 pool rule that also admits a small collateral reserve, or a health
/// factor equal to the threshold, is not accepted here.
pub fn liquidation_close_factor(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let constants = &ctx.pre.constants;
    let mut f = Findings::new(CLOSE_FACTOR);

    // (user, debt asset) -> covered, summed over the batch
    let mut covered: BTreeMap<(Address, Address), u128> = BTreeMap::new();
    let mut pairs: BTreeSet<(Address, Address, Address)> = BTreeSet::new();

    for call in ctx.calls {
        let CallParams::LiquidationCall {
            collateral_asset,
            debt_asset,
            user,
            debt_to_cover,
            ..
        } = &call.params
        else {
            continue;
        };
        let pre_debt = ctx.pre.position(user, debt_asset)?.debt;
        let amount = match call.outcome {
            Some(outcome) => outcome.debt_covered,
            None if *debt_to_cover == AMOUNT_MAX => pre_debt,
            None => (*debt_to_cover).min(pre_debt),
        };
        let total = covered.entry((*user, *debt_asset)).or_insert(0);
        *total = add_u128(*total, amount);
        pairs.insert((*user, *collateral_asset, *debt_asset));
    }

    for ((user, asset), amount) in &covered {
        let pre_debt = ctx.pre.position(user, asset)?.debt;
        let max_normal = percent_of(pre_debt, constants.close_factor_bps as u128);
        if *amount <= max_normal {
            continue;
        }
        let debt_base = value_in_base(ctx.pre.reserve(asset)?, pre_debt);
        let hf = ctx.pre.account(user)?.health_factor;
        // Debt side only, strict comparison
        let small = debt_base < constants.min_base_max_close_factor_threshold;
        let critical = hf < constants.close_factor_hf_threshold;
        f.check(small || critical, || {
            format!(
                "liquidation of {} covered {} of {} debt in {}, above the {} bps close factor (debt {} base, health factor {})",
                user, amount, pre_debt, asset, constants.close_factor_bps, debt_base, hf
            )
        });
    }

    for (user, collateral_asset, debt_asset) in &pairs {
        let debt = ctx.post.position(user, debt_asset)?.debt;
        let collateral = ctx.post.position(user, collateral_asset)?.collateral;
        if debt == 0 || collateral == 0 {
            continue;
        }
        let debt_base = value_in_base(ctx.post.reserve(debt_asset)?, debt);
        let collateral_base = value_in_base(ctx.post.reserve(collateral_asset)?, collateral);
        let min = constants.min_leftover_base;
        f.check(debt_base >= min && collateral_base >= min, || {
            format!(
                "liquidation of {} left dust: debt {} ({} base), collateral {} ({} base), minimum {} base",
                user, debt, debt_base, collateral, collateral_base, min
            )
        });
    }

    Ok(f.finish())
}

/// Neither reserve of a liquidation may still be in its grace period
pub fn liquidation_grace_period(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(GRACE_PERIOD);
    let mut assets = BTreeSet::new();
    for call in ctx.calls {
        if let CallParams::LiquidationCall {
            collateral_asset,
            debt_asset,
            ..
        } = &call.params
        {
            assets.insert(*collateral_asset);
            assets.insert(*debt_asset);
        }
    }

    let now = ctx.pre.timestamp;
    for asset in assets {
        let until = ctx.pre.reserve(&asset)?.liquidation_grace_period_until;
        f.check(until <= now, || {
            format!("Liquidation during grace period: {} until {}, now {}", asset, until, now)
        });
    }
    Ok(f.finish())
}
