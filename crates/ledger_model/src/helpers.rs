//! Invariant checking helpers over reserve snapshots

use crate::math::*;
use crate::state::*;
use alloy_primitives::U256;

/// Collateral minus debt and recorded deficit: what the vault owes suppliers
/// in real tokens
pub fn net_liability(r: &ReserveSnapshot) -> i128 {
    let claims = sub_i128(u128_to_i128(r.collateral_supply), u128_to_i128(r.debt_supply));
    sub_i128(claims, u128_to_i128(r.deficit))
}

/// Left side of the index identity: virtual + debt + deficit
pub fn index_identity_assets(r: &ReserveSnapshot) -> u128 {
    add_u128(add_u128(r.virtual_balance, r.debt_supply), r.deficit)
}

/// Right side of the index identity: (scaled supply + treasury) * index
pub fn index_identity_claims(r: &ReserveSnapshot) -> u128 {
    ray_mul(
        add_u128(r.scaled_collateral_supply, r.accrued_to_treasury),
        r.liquidity_index,
    )
}

/// Absolute gap between both sides of the index identity
pub fn index_identity_gap(r: &ReserveSnapshot) -> u128 {
    abs_diff(index_identity_assets(r), index_identity_claims(r))
}

/// Exact check |post - pre| * 10_000 <= max_bps * pre
///
/// Zero prices are handled by the caller; with pre == 0 only post == 0 passes.
pub fn deviation_within_bps(pre: u128, post: u128, max_bps: u128) -> bool {
    let lhs = U256::from(abs_diff(pre, post)) * U256::from(BPS);
    let rhs = U256::from(max_bps) * U256::from(pre);
    lhs <= rhs
}

/// Deviation in whole basis points (rounded down), for diagnostics
pub fn deviation_bps(pre: u128, post: u128) -> u128 {
    if pre == 0 {
        return u128::MAX;
    }
    mul_div(abs_diff(pre, post), BPS, pre)
}

/// Flash loan premium owed on `amount`
pub fn flash_loan_fee(amount: u128, premium_bps: u128) -> u128 {
    percent_of(amount, premium_bps)
}

/// Cap expressed in smallest units (0 = uncapped -> None)
pub fn cap_in_units(cap: u128, decimals: u8) -> Option<u128> {
    if cap == 0 {
        None
    } else {
        Some(cap.saturating_mul(pow10(decimals)))
    }
}

/// Value of a balance of reserve `r` in base currency
pub fn value_in_base(r: &ReserveSnapshot, amount: u128) -> u128 {
    to_base(amount, r.price, r.decimals)
}
