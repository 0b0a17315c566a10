//! Health factor direction per operation class

use super::{EvalContext, Findings, InvariantResult};
use crate::calls::{CallParams, CallRecord};
use ledger_model::{Address, MissingEntry};
use std::collections::BTreeMap;

pub const HEALTH_FACTOR: &str = "health-factor-monotonicity";

#[derive(Clone, Copy, Default)]
struct Direction {
    raises: bool,
    lowers: bool,
    liquidated: bool,
}

fn classify(call: &CallRecord, classes: &mut BTreeMap<Address, Direction>) {
    match &call.params {
        CallParams::Supply { on_behalf_of, .. } | CallParams::Repay { on_behalf_of, .. } => {
            classes.entry(*on_behalf_of).or_default().raises = true;
        }
        CallParams::Borrow { on_behalf_of, .. } => {
            classes.entry(*on_behalf_of).or_default().lowers = true;
        }
        CallParams::Withdraw { .. } => {
            classes.entry(call.caller).or_default().lowers = true;
        }
        CallParams::FlashLoan { legs, on_behalf_of, .. } if legs.iter().any(|l| l.mode.is_variable()) => {
            classes.entry(*on_behalf_of).or_default().lowers = true;
        }
        CallParams::LiquidationCall { user, .. } => {
            classes.entry(*user).or_default().liquidated = true;
        }
        _ => {}
    }
}

fn wad(hf: u128) -> String {
    if hf == u128::MAX {
        "inf".to_string()
    } else {
        format!("{}.{:018}", hf / ledger_model::WAD, hf % ledger_model::WAD)
    }
}

/// Supply and repay never lower a user's health factor, borrow and withdraw
/// never raise it. A liquidation needs an unhealthy user and must leave them
/// strictly healthier and at least at the post-liquidation floor.
///
/// Users whose calls in the batch pull both ways are left to the accounting
/// rules.
pub fn health_factor_monotonicity(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let threshold = ctx.config.liquidation_health_factor_threshold();
    let floor = ctx.config.min_post_liquidation_health_factor();
    let mut f = Findings::new(HEALTH_FACTOR);

    let mut classes = BTreeMap::new();
    for call in ctx.calls {
        classify(call, &mut classes);
    }

    for (user, dir) in &classes {
        let pre = ctx.pre.account(user)?.health_factor;
        let post = ctx.post.account(user)?.health_factor;

        if dir.liquidated {
            f.check(pre < threshold, || {
                format!("health factor not below 1: {} liquidated at {}", user, wad(pre))
            });
        }

        match (dir.raises, dir.lowers, dir.liquidated) {
            (true, false, false) => f.check(post >= pre, || {
                format!("health factor of {} fell from {} to {}", user, wad(pre), wad(post))
            }),
            (false, true, false) => f.check(post <= pre, || {
                format!("health factor of {} rose from {} to {}", user, wad(pre), wad(post))
            }),
            (false, false, true) => {
                f.check(post > pre, || {
                    format!(
                        "liquidation did not improve health factor of {} ({} -> {})",
                        user,
                        wad(pre),
                        wad(post)
                    )
                });
                f.check(post >= floor, || {
                    format!(
                        "health factor of {} left at {} after liquidation, below {}",
                        user,
                        wad(post),
                        wad(floor)
                    )
                });
            }
            _ => log::debug!("{}: mixed operations for {}, direction not checked", HEALTH_FACTOR, user),
        }
    }
    Ok(f.finish())
}
