//! Lending Assertion Integration Tests
//!
//! A simulated pool and transaction recorder that drive the assertion
//! engine end to end: real calldata, real logs, two ledger checkpoints.

pub mod recorder;

pub use pool::{Faults, Listing, MockPool, PoolError, MAGIC_BORROW_AMOUNT};
pub use recorder::{RecordError, Recorder};

use lending_assertions::{CallParams, FlashLoanLeg, InterestRateMode};
use ledger_model::Address;

pub const POOL: Address = Address::repeat_byte(0xaa);
pub const POOL_IMPL: Address = Address::repeat_byte(0xab);

pub const USDC: Address = Address::repeat_byte(0x10);
pub const A_USDC: Address = Address::repeat_byte(0x11);
pub const DEBT_USDC: Address = Address::repeat_byte(0x12);
pub const WETH: Address = Address::repeat_byte(0x20);
pub const A_WETH: Address = Address::repeat_byte(0x21);
pub const DEBT_WETH: Address = Address::repeat_byte(0x22);

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
/// Liquidity provider
pub const CAROL: Address = Address::repeat_byte(0xc0);

pub const USDC_UNIT: u128 = 1_000_000;
pub const WETH_UNIT: u128 = 1_000_000_000_000_000_000;
/// One dollar in base currency
pub const BASE: u128 = 100_000_000;

/// USDC at $1 and WETH at $2,000, both with an 80% liquidation threshold and
/// a 5% bonus; Carol provides 1,000,000 USDC and 1,000 WETH of liquidity
pub fn standard_pool() -> MockPool {
    let mut pool = MockPool::new(POOL);
    pool.list(Listing {
        asset: USDC,
        collateral_token: A_USDC,
        debt_token: DEBT_USDC,
        decimals: 6,
        price: BASE,
        liquidation_threshold_bps: 8_000,
        liquidation_bonus_bps: 10_500,
    });
    pool.list(Listing {
        asset: WETH,
        collateral_token: A_WETH,
        debt_token: DEBT_WETH,
        decimals: 18,
        price: 2_000 * BASE,
        liquidation_threshold_bps: 8_000,
        liquidation_bonus_bps: 10_500,
    });
    let seed = [(USDC, 1_000_000 * USDC_UNIT), (WETH, 1_000 * WETH_UNIT)];
    for (asset, amount) in seed {
        let liquidity = supply(CAROL, asset, amount);
        if let Err(e) = pool.execute(CAROL, &liquidity) {
            panic!("seeding {} failed: {}", asset, e);
        }
    }
    pool
}

pub fn supply(user: Address, asset: Address, amount: u128) -> CallParams {
    CallParams::Supply {
        asset,
        amount,
        on_behalf_of: user,
        referral_code: 0,
    }
}

pub fn borrow(user: Address, asset: Address, amount: u128) -> CallParams {
    CallParams::Borrow {
        asset,
        amount,
        interest_rate_mode: InterestRateMode::Variable,
        referral_code: 0,
        on_behalf_of: user,
    }
}

pub fn repay(user: Address, asset: Address, amount: u128) -> CallParams {
    CallParams::Repay {
        asset,
        amount,
        interest_rate_mode: InterestRateMode::Variable,
        on_behalf_of: user,
    }
}

pub fn withdraw(user: Address, asset: Address, amount: u128) -> CallParams {
    CallParams::Withdraw { asset, amount, to: user }
}

pub fn liquidation(collateral_asset: Address, debt_asset: Address, user: Address, debt_to_cover: u128) -> CallParams {
    CallParams::LiquidationCall {
        collateral_asset,
        debt_asset,
        user,
        debt_to_cover,
        receive_a_token: false,
    }
}

pub fn flash_loan_simple(receiver: Address, asset: Address, amount: u128) -> CallParams {
    CallParams::FlashLoanSimple {
        receiver,
        asset,
        amount,
        referral_code: 0,
    }
}

pub fn flash_loan(receiver: Address, legs: Vec<FlashLoanLeg>) -> CallParams {
    CallParams::FlashLoan {
        receiver,
        legs,
        on_behalf_of: receiver,
        referral_code: 0,
    }
}
