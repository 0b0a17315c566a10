//! Kani proofs over the arithmetic behind the invariant rules

use crate::{generators::*, sanitizer::*};
use kani::{any, assume};
use ledger_model::math::*;
use ledger_model::*;

/// Oracle deviation bound agrees with its exact integer definition
#[kani::proof]
fn deviation_bound_is_exact() {
    let pre = any_balance();
    let post = any_balance();
    let max_bps = bps(any());

    let expected = abs_diff(pre, post) * BPS <= max_bps * pre;
    kani::assert(
        deviation_within_bps(pre, post, max_bps) == expected,
        "deviation check must match |post - pre| * 10000 <= max * pre",
    );
}

/// A vanished price only passes when it stays zero
#[kani::proof]
fn deviation_from_zero_price() {
    let post = any_balance();
    let max_bps = bps(any());
    kani::assert(
        deviation_within_bps(0, post, max_bps) == (post == 0),
        "pre price 0 tolerates no movement",
    );
}

/// An unchanged price is always within bounds
#[kani::proof]
fn deviation_reflexive() {
    let p = any_balance();
    kani::assert(deviation_within_bps(p, p, 0), "no movement is no deviation");
}

#[kani::proof]
fn ray_mul_by_one_ray_is_identity() {
    let a = any_balance();
    kani::assert(ray_mul(a, RAY) == a, "x * 1 ray must be x");
}

#[kani::proof]
fn mul_div_total_on_zero_divisor() {
    let a: u128 = any();
    let b: u128 = any();
    kani::assert(mul_div(a, b, 0) == 0, "division by zero yields 0");
}

/// Premium never exceeds the principal for premiums up to 100%
#[kani::proof]
fn flash_fee_bounded_by_amount() {
    let amount = any_balance();
    let premium = bps(any());
    kani::assert(flash_loan_fee(amount, premium) <= amount, "fee <= amount");
}

#[kani::proof]
fn signed_delta_antisymmetric() {
    let a = any_balance();
    let b = any_balance();
    kani::assert(
        signed_delta(a, b) == -signed_delta(b, a),
        "delta(a, b) == -delta(b, a)",
    );
}

/// Valuation is monotone in the amount
#[kani::proof]
fn to_base_monotone() {
    let a = any_balance();
    let b = any_balance();
    let price: u32 = any();
    let decimals: u8 = any();
    assume(a <= b);
    assume(decimals <= MAX_DECIMALS);
    kani::assert(
        to_base(a, price as u128, decimals) <= to_base(b, price as u128, decimals),
        "larger balances never value lower",
    );
}

/// Fully backed reserves owe suppliers nothing beyond debt and deficit
#[kani::proof]
fn net_liability_zero_when_backed() {
    let mut r = any_reserve().sanitize();
    r.collateral_supply = r.debt_supply + r.deficit;
    kani::assert(net_liability(&r) == 0, "collateral == debt + deficit nets to zero");
}

/// Writing debt off into the deficit leaves the index identity unchanged
#[kani::proof]
fn deficit_write_off_preserves_identity() {
    let mut r = any_reserve().sanitize();
    let burned: u128 = any_balance();
    assume(burned <= r.debt_supply);

    let gap_before = index_identity_gap(&r);
    r.debt_supply -= burned;
    r.deficit += burned;
    kani::assert(
        index_identity_gap(&r) == gap_before,
        "moving debt to the deficit keeps both sides equal",
    );
}

#[kani::proof]
fn cap_zero_means_uncapped() {
    let decimals: u8 = any();
    kani::assert(cap_in_units(0, decimals).is_none(), "cap 0 is uncapped");
}
