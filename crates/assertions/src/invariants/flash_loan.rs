//! Flash loan premium collection

use super::{EvalContext, Findings, InvariantResult};
use crate::calls::{CallParams, InterestRateMode};
use ledger_model::math::{add_u128, sub_u128};
use ledger_model::{flash_loan_fee, Address, MissingEntry};
use std::collections::BTreeMap;

pub const REPAYMENT: &str = "flash-loan-repayment";

#[derive(Default)]
struct Owed {
    fee: u128,
    /// Legs converted into debt leave the vault for good
    kept: u128,
}

/// Every repaid flash loan returns its amount plus premium to the vault
///
/// Aggregated per asset: the vault must end at or above its pre balance plus
/// all premiums, less whatever was kept as new debt.
pub fn flash_loan_repayment(ctx: &EvalContext<'_>) -> Result<InvariantResult, MissingEntry> {
    let premium_bps = ctx.config.flash_loan_premium_bps();
    let mut owed: BTreeMap<Address, Owed> = BTreeMap::new();

    for call in ctx.calls {
        match &call.params {
            CallParams::FlashLoan { legs, .. } => {
                for leg in legs {
                    let entry = owed.entry(leg.asset).or_default();
                    if leg.mode == InterestRateMode::None {
                        entry.fee = add_u128(entry.fee, flash_loan_fee(leg.amount, premium_bps));
                    } else {
                        entry.kept = add_u128(entry.kept, leg.amount);
                    }
                }
            }
            CallParams::FlashLoanSimple { asset, amount, .. } => {
                let entry = owed.entry(*asset).or_default();
                entry.fee = add_u128(entry.fee, flash_loan_fee(*amount, premium_bps));
            }
            _ => {}
        }
    }

    let mut f = Findings::new(REPAYMENT);
    for (asset, due) in &owed {
        let before = ctx.pre.reserve(asset)?.underlying_balance;
        let after = ctx.post.reserve(asset)?.underlying_balance;
        let required = sub_u128(add_u128(before, due.fee), due.kept);
        f.check(after >= required, || {
            format!(
                "flash loan of {} not repaid: vault holds {}, expected at least {} (premium {})",
                asset, after, required, due.fee
            )
        });
    }
    Ok(f.finish())
}
