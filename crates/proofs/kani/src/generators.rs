//! Generators for arbitrary reserves (for Kani)

#[cfg(kani)]
use kani::any;
#[cfg(kani)]
use ledger_model::{Address, ReserveFlags, ReserveSnapshot};

// Small raw widths keep the SAT problem tractable
#[cfg(kani)]
pub fn any_balance() -> u128 {
    let raw: u32 = any();
    raw as u128
}

#[cfg(kani)]
pub fn any_reserve() -> ReserveSnapshot {
    let decimals: u8 = any();
    let price: u32 = any();

    ReserveSnapshot {
        asset: Address::repeat_byte(1),
        collateral_token: Address::repeat_byte(2),
        debt_token: Address::repeat_byte(3),
        flags: ReserveFlags::enabled(),
        decimals,
        supply_cap: 0,
        borrow_cap: 0,
        liquidity_index: any_balance(),
        accrued_to_treasury: any_balance(),
        virtual_balance: any_balance(),
        deficit: any_balance(),
        pending_ltv: 0,
        liquidation_grace_period_until: 0,
        collateral_supply: any_balance(),
        scaled_collateral_supply: any_balance(),
        debt_supply: any_balance(),
        underlying_balance: any_balance(),
        price: price as u128,
    }
}
