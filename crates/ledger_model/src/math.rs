//! Safe arithmetic helpers - no unwrap, no panics on any input

use crate::state::{BPS, RAY, WAD};
use alloy_primitives::U256;

/// Add u128 with saturation at MAX
pub fn add_u128(a: u128, b: u128) -> u128 {
    a.saturating_add(b)
}

/// Subtract u128 with saturation at 0
pub fn sub_u128(a: u128, b: u128) -> u128 {
    a.saturating_sub(b)
}

/// Add i128 with saturation
pub fn add_i128(a: i128, b: i128) -> i128 {
    a.saturating_add(b)
}

/// Subtract i128 with saturation
pub fn sub_i128(a: i128, b: i128) -> i128 {
    a.saturating_sub(b)
}

/// Convert u128 to i128 with saturation at i128::MAX
pub fn u128_to_i128(x: u128) -> i128 {
    if x > i128::MAX as u128 {
        i128::MAX
    } else {
        x as i128
    }
}

/// Clamp positive i128 to u128 (negative becomes 0)
pub fn clamp_pos_i128(x: i128) -> u128 {
    if x > 0 {
        x as u128
    } else {
        0
    }
}

/// |a - b|
pub fn abs_diff(a: u128, b: u128) -> u128 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// 10^decimals, saturating
pub fn pow10(decimals: u8) -> u128 {
    10u128.saturating_pow(decimals as u32)
}

fn narrow(x: U256) -> u128 {
    u128::try_from(x).unwrap_or(u128::MAX)
}

/// floor(a * b / c) with a 256-bit intermediate (returns 0 if c is 0)
pub fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    if c == 0 {
        return 0;
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(c))
}

/// Ray multiplication, rounding half up
pub fn ray_mul(a: u128, b: u128) -> u128 {
    let half = U256::from(RAY / 2);
    narrow((U256::from(a) * U256::from(b) + half) / U256::from(RAY))
}

/// Wad division, rounding half up (u128::MAX if b is 0)
pub fn wad_div(a: u128, b: u128) -> u128 {
    if b == 0 {
        return u128::MAX;
    }
    let b256 = U256::from(b);
    narrow((U256::from(a) * U256::from(WAD) + b256 / U256::from(2u8)) / b256)
}

/// floor(amount * bps / 10_000)
pub fn percent_of(amount: u128, bps: u128) -> u128 {
    mul_div(amount, bps, BPS)
}

/// Value of `amount` smallest units in base currency
pub fn to_base(amount: u128, price: u128, decimals: u8) -> u128 {
    mul_div(amount, price, pow10(decimals))
}

/// Signed difference post - pre, saturating at the i128 range
pub fn signed_delta(pre: u128, post: u128) -> i128 {
    if post >= pre {
        u128_to_i128(post - pre)
    } else {
        sub_i128(0, u128_to_i128(pre - post))
    }
}
