//! Oracle sanity across the transaction

use super::{EvalContext, Findings, InvariantResult};
use crate::calls::CallParams;
use ledger_model::{deviation_bps, deviation_within_bps, Address, MissingEntry};
use std::collections::BTreeSet;

pub const PRICE_DEVIATION: &str = "oracle-price-deviation";

/// Assets whose price an operation relies on
fn priced_assets(ctx: &EvalContext<'_>) -> BTreeSet<Address> {
    let mut assets = BTreeSet::new();
    for call in ctx.calls {
        match &call.params {
            CallParams::Supply { asset, .. } | CallParams::Borrow { asset, .. } => {
                assets.insert(*asset);
            }
            CallParams::LiquidationCall {
                collateral_asset,
                debt_asset,
                ..
            } => {
                assets.insert(*collateral_asset);
                assets.insert(*debt_asset);
            }
            _ => {}
        }
    }
    assets
}

/// Prices are non-zero at both checkpoints and move at most the configured
/// number of basis points
pub fn oracle_price_deviation(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let mut f = Findings::new(PRICE_DEVIATION);
    let max_bps = ctx.config.max_price_deviation_bps();

    for asset in priced_assets(ctx) {
        let pre = ctx.pre.reserve(&asset)?.price;
        let post = ctx.post.reserve(&asset)?.price;

        if pre == 0 || post == 0 {
            let point = if pre == 0 { ctx.pre.point } else { ctx.post.point };
            f.fail(format!("oracle returned zero price for {} at {}", asset, point));
            continue;
        }
        f.check(deviation_within_bps(pre, post, max_bps), || {
            format!(
                "price of {} moved {} bps ({} -> {}), limit {} bps",
                asset,
                deviation_bps(pre, post),
                pre,
                post,
                max_bps
            )
        });
    }
    Ok(f.finish())
}
