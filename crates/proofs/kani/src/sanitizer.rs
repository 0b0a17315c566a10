//! State space sanitizer - bounds reserve values for Kani exploration

use ledger_model::{ReserveSnapshot, BPS, RAY};

/// Balances stay well inside u64 so products with BPS and prices fit u128
pub const MAX_BALANCE: u128 = 1_000_000_000;
pub const MAX_PRICE: u128 = 1_000_000_000_000;
pub const MAX_DECIMALS: u8 = 18;

pub trait Sanitize {
    fn sanitize(self) -> Self;
}

fn clamp(x: u128, max: u128) -> u128 {
    if x > max {
        x % max
    } else {
        x
    }
}

impl Sanitize for ReserveSnapshot {
    fn sanitize(mut self) -> ReserveSnapshot {
        self.collateral_supply = clamp(self.collateral_supply, MAX_BALANCE);
        self.scaled_collateral_supply = clamp(self.scaled_collateral_supply, MAX_BALANCE);
        self.debt_supply = clamp(self.debt_supply, MAX_BALANCE);
        self.deficit = clamp(self.deficit, MAX_BALANCE);
        self.virtual_balance = clamp(self.virtual_balance, MAX_BALANCE);
        self.underlying_balance = clamp(self.underlying_balance, MAX_BALANCE);
        self.accrued_to_treasury = clamp(self.accrued_to_treasury, MAX_BALANCE);
        self.price = clamp(self.price, MAX_PRICE);
        self.decimals %= MAX_DECIMALS + 1;

        // Index never drops below one ray and stays within 2x
        self.liquidity_index = RAY + clamp(self.liquidity_index, RAY);
        self
    }
}

/// Clamp a basis point value into [0, BPS]
pub fn bps(x: u128) -> u128 {
    x % (BPS + 1)
}
