//! Per-reserve solvency and configuration rules, checked on every touched asset

use super::{EvalContext, Findings, InvariantResult};
use crate::calls::{CallParams, CallRecord};
use ledger_model::math::{clamp_pos_i128, sub_i128, sub_u128};
use ledger_model::{
    index_identity_assets, index_identity_claims, index_identity_gap, net_liability, Address, MissingEntry, ReserveFlags,
    RAY,
};

pub const UNDERLYING: &str = "underlying-reserve-sufficiency";
pub const VIRTUAL_BALANCE: &str = "virtual-balance-sufficiency";
pub const LIQUIDITY_INDEX: &str = "liquidity-index-identity";
pub const FROZEN_PENDING_LTV: &str = "frozen-reserve-pending-ltv";
pub const RESERVE_STATUS: &str = "reserve-status";

/// The vault holds at least its net liability, and never loses more
/// underlying than its net liability shrank
pub fn underlying_reserve_sufficiency(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(UNDERLYING);
    for asset in ctx.touched_assets() {
        let pre = ctx.pre.reserve(&asset)?;
        let post = ctx.post.reserve(&asset)?;

        let owed = clamp_pos_i128(net_liability(post));
        f.check(post.underlying_balance >= owed, || {
            format!(
                "vault of {} holds {} underlying, net liability is {}",
                asset, post.underlying_balance, owed
            )
        });

        if post.underlying_balance < pre.underlying_balance {
            let outflow = pre.underlying_balance - post.underlying_balance;
            let liability_drop = clamp_pos_i128(sub_i128(net_liability(pre), net_liability(post)));
            f.check(outflow <= liability_drop, || {
                format!(
                    "underlying of {} fell by {} while net liability fell by {}",
                    asset, outflow, liability_drop
                )
            });
        }
    }
    Ok(f.finish())
}

/// Real underlying always covers the virtual balance
pub fn virtual_balance_sufficiency(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(VIRTUAL_BALANCE);
    for asset in ctx.touched_assets() {
        let pre = ctx.pre.reserve(&asset)?;
        let post = ctx.post.reserve(&asset)?;

        f.check(post.underlying_balance >= post.virtual_balance, || {
            format!(
                "virtual balance of {} is {} but the vault holds {}",
                asset, post.virtual_balance, post.underlying_balance
            )
        });
        if post.virtual_balance > pre.virtual_balance {
            f.check(post.underlying_balance >= pre.underlying_balance, || {
                format!(
                    "virtual balance of {} grew by {} while underlying shrank by {}",
                    asset,
                    post.virtual_balance - pre.virtual_balance,
                    sub_u128(pre.underlying_balance, post.underlying_balance)
                )
            });
        }
    }
    Ok(f.finish())
}

/// virtual + debt + deficit == (scaled supply + treasury) * index, within the
/// configured rounding tolerance
pub fn liquidity_index_identity(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(LIQUIDITY_INDEX);
    let tolerance = ctx.config.index_tolerance();
    for asset in ctx.touched_assets() {
        let post = ctx.post.reserve(&asset)?;

        f.check(post.liquidity_index >= RAY, || {
            format!("liquidity index of {} is {}, below 1 ray", asset, post.liquidity_index)
        });

        let gap = index_identity_gap(post);
        f.check(gap <= tolerance, || {
            format!(
                "index identity of {} off by {} (assets {}, claims {}, tolerance {})",
                asset,
                gap,
                index_identity_assets(post),
                index_identity_claims(post),
                tolerance
            )
        });
    }
    Ok(f.finish())
}

/// A frozen reserve must be mid-transition
pub fn frozen_reserve_pending_ltv(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(FROZEN_PENDING_LTV);
    for asset in ctx.touched_assets() {
        let post = ctx.post.reserve(&asset)?;
        f.check(!post.flags.frozen || post.pending_ltv != 0, || {
            format!("reserve {} is frozen with no pending LTV change", asset)
        });
    }
    Ok(f.finish())
}

#[derive(Clone, Copy)]
struct Requirement {
    unfrozen: bool,
    borrowable: bool,
}

const MOVE_FUNDS: Requirement = Requirement {
    unfrozen: false,
    borrowable: false,
};
const ADD_EXPOSURE: Requirement = Requirement {
    unfrozen: true,
    borrowable: false,
};
const OPEN_DEBT: Requirement = Requirement {
    unfrozen: true,
    borrowable: true,
};

fn status_problem(flags: &ReserveFlags, req: Requirement) -> Option<&'static str> {
    if !flags.active {
        Some("inactive")
    } else if flags.paused {
        Some("paused")
    } else if req.unfrozen && flags.frozen {
        Some("frozen")
    } else if req.borrowable && !flags.borrowing_enabled {
        Some("not borrowable")
    } else {
        None
    }
}

fn requirements(call: &CallRecord) -> Vec<(Address, Requirement)> {
    match &call.params {
        CallParams::Supply { asset, .. } => vec![(*asset, ADD_EXPOSURE)],
        CallParams::Borrow { asset, .. } => vec![(*asset, OPEN_DEBT)],
        CallParams::Repay { asset, .. } | CallParams::Withdraw { asset, .. } => vec![(*asset, MOVE_FUNDS)],
        CallParams::LiquidationCall {
            collateral_asset,
            debt_asset,
            ..
        } => vec![(*collateral_asset, MOVE_FUNDS), (*debt_asset, MOVE_FUNDS)],
        CallParams::FlashLoan { legs, .. } => legs
            .iter()
            .map(|l| (l.asset, if l.mode.is_variable() { OPEN_DEBT } else { MOVE_FUNDS }))
            .collect(),
        CallParams::FlashLoanSimple { asset, .. } => vec![(*asset, MOVE_FUNDS)],
    }
}

/// Each call only acts on reserves whose pre-state flags allow it
pub fn reserve_status(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(RESERVE_STATUS);
    for call in ctx.calls {
        for (asset, req) in requirements(call) {
            let flags = ctx.pre.reserve(&asset)?.flags;
            if let Some(problem) = status_problem(&flags, req) {
                f.fail(format!("{} #{} acted on {} reserve {}", call.kind(), call.index, problem, asset));
            }
        }
    }
    Ok(f.finish())
}
