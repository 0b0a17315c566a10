//! Property-based tests over random honest batches
//!
//! Whatever sequence of supplies, borrows, repays and withdrawals an honest
//! pool accepts, the engine must let the transaction through.

use lending_assertions::{CallParams, Orchestrator, AMOUNT_MAX};
use lending_assertions_integration::*;
use ledger_model::Address;
use proptest::prelude::*;

const USERS: [Address; 2] = [ALICE, BOB];
const ASSETS: [Address; 2] = [USDC, WETH];

/// 100 USDC or 0.05 WETH per step
fn step(asset: Address) -> u128 {
    if asset == USDC {
        100 * USDC_UNIT
    } else {
        WETH_UNIT / 20
    }
}

fn funded_pool() -> MockPool {
    let mut pool = standard_pool();
    for user in USERS {
        for (asset, amount) in [(USDC, 20_000 * USDC_UNIT), (WETH, 10 * WETH_UNIT)] {
            if let Err(e) = pool.execute(user, &supply(user, asset, amount)) {
                panic!("funding {} failed: {}", user, e);
            }
        }
    }
    pool
}

fn op(user: Address, kind: u8, asset: Address, steps: u128, entire: bool) -> CallParams {
    let amount = steps * step(asset);
    match kind {
        0 => supply(user, asset, amount),
        1 => borrow(user, asset, amount),
        2 => repay(user, asset, if entire { AMOUNT_MAX } else { amount }),
        _ => withdraw(user, asset, if entire { AMOUNT_MAX } else { amount }),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_honest_batches_pass(
        ops in prop::collection::vec((0usize..2, 0u8..4, 0usize..2, 1u128..=100, any::<bool>()), 1..12),
        packed in any::<bool>(),
    ) {
        let mut recorder = Recorder::new(funded_pool());
        if packed {
            recorder = recorder.packed();
        }

        let mut accepted = 0usize;
        for (u, kind, a, steps, entire) in ops {
            let user = USERS[u];
            // Reverted calls leave no trace, like a failed sub-call
            if recorder.call(user, op(user, kind, ASSETS[a], steps, entire)).is_ok() {
                accepted += 1;
            }
        }

        let (ledger, tx) = recorder.finish();
        let report = Orchestrator::default().evaluate(&tx, &ledger);
        prop_assert!(report.is_ok(), "{:?}", report);
        let report = report.unwrap();
        prop_assert_eq!(report.calls, accepted);
        prop_assert!(report.is_pass(), "{:?}", report.failures());
    }

    #[test]
    fn prop_flash_loans_pass_and_shortfalls_fail(
        amount in 1_000u128..=500_000_000_000u128,
        shortfall in 0u128..=3u128,
    ) {
        let mut pool = standard_pool();
        pool.faults.flash_repay_shortfall = shortfall;

        let mut recorder = Recorder::new(pool);
        prop_assert!(recorder.call(ALICE, flash_loan_simple(ALICE, USDC, amount)).is_ok());
        let (ledger, tx) = recorder.finish();
        let report = Orchestrator::default().evaluate(&tx, &ledger).unwrap();

        prop_assert_eq!(report.is_pass(), shortfall == 0);
    }
}
