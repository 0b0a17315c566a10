//! Bad debt write-off accounting
//!
//! When a liquidation leaves a user with no collateral anywhere, the pool
//! burns the user's remaining debt in every reserve and records it as reserve
//! deficit. The rule checks the increment: deficit growth equals the debt
//! burned without repayment, reserve by reserve.

use super::flows::{debt_flows, written_off_users};
use super::{EvalContext, Findings, InvariantResult};
use ledger_model::math::add_u128;
use ledger_model::MissingEntry;

pub const DEFICIT: &str = "deficit-accounting";

pub fn deficit_accounting(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let written_off = written_off_users(ctx)?;
    let flows = debt_flows(ctx)?;
    let mut f = Findings::new(DEFICIT);

    for post in ctx.post.reserves() {
        let asset = post.asset;
        let pre = ctx.pre.reserve(&asset)?;

        if post.deficit < pre.deficit {
            f.fail(format!(
                "deficit of {} decreased from {} to {}",
                asset, pre.deficit, post.deficit
            ));
            continue;
        }
        f.check(post.deficit == 0 || post.flags.active, || {
            format!("deficit {} recorded on inactive reserve {}", post.deficit, asset)
        });

        // Debt the written-off users still owed once their calls settled
        let mut burned = 0u128;
        for user in &written_off {
            let remaining = match flows.running.get(&(*user, asset)) {
                Some(debt) => *debt,
                None => ctx.pre.position(user, &asset)?.debt,
            };
            burned = add_u128(burned, remaining);
        }

        let increase = post.deficit - pre.deficit;
        if increase > 0 && written_off.is_empty() {
            f.fail(format!(
                "deficit of {} grew by {} without a fully liquidated user",
                asset, increase
            ));
        } else {
            f.check(increase == burned, || {
                format!(
                    "deficit of {} grew by {}, debt burned without repayment is {}",
                    asset, increase, burned
                )
            });
        }

        for user in &written_off {
            let left = ctx.post.position(user, &asset)?.debt;
            f.check(left == 0, || {
                format!(
                    "bad debt of {} in {} left unaccounted: {} debt with no collateral",
                    user, asset, left
                )
            });
        }
    }
    Ok(f.finish())
}
