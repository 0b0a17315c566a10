//! End-to-end scenarios: pool operations recorded against the simulated pool
//! and judged by the full invariant catalogue.

use lending_assertions::invariants::{deficit, flash_loan, health, liquidation as liq, oracle, reserve, supply as sup};
use lending_assertions::{
    abi, collect, AssertionConfig, AssertionError, CheckpointPair, Encoding, FlashLoanLeg, InterestRateMode,
    LedgerView, Orchestrator, RawCall, Rejection, Report, Transaction, AMOUNT_MAX,
};
use lending_assertions_integration::*;
use ledger_model::{Address, ReserveFlags, WAD};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(recorder: Recorder) -> (Report, CheckpointPair<MockPool>, Transaction) {
    init_logger();
    let (ledger, tx) = recorder.finish();
    let report = Orchestrator::default()
        .evaluate(&tx, &ledger)
        .expect("evaluation should reach a verdict");
    (report, ledger, tx)
}

fn evaluate(recorder: Recorder) -> Report {
    run(recorder).0
}

fn record(recorder: &mut Recorder, caller: Address, params: lending_assertions::CallParams) {
    if let Err(e) = recorder.call(caller, params) {
        panic!("call by {} reverted: {}", caller, e);
    }
}

fn setup(pool: &mut MockPool, caller: Address, params: lending_assertions::CallParams) {
    if let Err(e) = pool.execute(caller, &params) {
        panic!("setup call by {} reverted: {}", caller, e);
    }
}

/// Alice with 10 WETH of collateral and 15,000 USDC of debt, WETH then
/// marked down to $1,800 (health factor 0.96)
fn underwater_pool() -> MockPool {
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, 10 * WETH_UNIT));
    setup(&mut pool, ALICE, borrow(ALICE, USDC, 15_000 * USDC_UNIT));
    pool.set_price(WETH, 1_800 * BASE);
    assert_eq!(pool.health_factor(&ALICE), 96 * WAD / 100);
    pool
}

/// Alice with 1 WETH of collateral and 1,200 USDC of debt after WETH halves
/// to $1,000: the collateral cannot cover the debt plus bonus
fn insolvent_pool() -> MockPool {
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, WETH_UNIT));
    setup(&mut pool, ALICE, borrow(ALICE, USDC, 1_200 * USDC_UNIT));
    pool.set_price(WETH, 1_000 * BASE);
    pool
}

#[test]
fn test_supply_then_borrow_passes() {
    let mut recorder = Recorder::new(standard_pool());
    record(&mut recorder, ALICE, supply(ALICE, USDC, 10_000 * USDC_UNIT));
    record(&mut recorder, ALICE, borrow(ALICE, USDC, 5_000 * USDC_UNIT));

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
    assert_eq!(report.calls, 2);

    let rules: Vec<&str> = report.results.iter().map(|r| r.rule).collect();
    assert!(rules.contains(&sup::DEBT_SUPPLY));
    assert!(rules.contains(&reserve::UNDERLYING));
    assert!(!rules.contains(&flash_loan::REPAYMENT));
}

#[test]
fn test_magic_borrow_double_credit_is_rejected() {
    let mut pool = standard_pool();
    pool.faults.double_credit_borrow = Some(MAGIC_BORROW_AMOUNT);

    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, supply(ALICE, USDC, 10_000 * USDC_UNIT));
    record(&mut recorder, ALICE, borrow(ALICE, USDC, MAGIC_BORROW_AMOUNT));
    assert_eq!(recorder.pool().debt_of(&ALICE, &USDC), 2 * MAGIC_BORROW_AMOUNT);

    let report = evaluate(recorder);
    assert_eq!(report.failed_rules(), vec![sup::DEBT_SUPPLY]);

    let messages: Vec<String> = report.failures().into_iter().map(|v| v.message).collect();
    assert!(messages.contains(&format!(
        "debt of {} in {} changed by 666000000, calls imply 333000000",
        ALICE, USDC
    )));
    assert!(messages.contains(&format!(
        "Debt token supply change does not match individual balance changes: {} supply 333000000, balances 666000000",
        USDC
    )));

    let err = report.into_result().unwrap_err();
    assert_eq!(err.to_string(), "Assertions Reverted: debt-supply-consistency");
}

#[test]
fn test_non_magic_borrow_with_fault_armed_passes() {
    let mut pool = standard_pool();
    pool.faults.double_credit_borrow = Some(MAGIC_BORROW_AMOUNT);

    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, supply(ALICE, USDC, 10_000 * USDC_UNIT));
    record(&mut recorder, ALICE, borrow(ALICE, USDC, MAGIC_BORROW_AMOUNT + 1));
    assert!(evaluate(recorder).is_pass());
}

#[test]
fn test_disabled_rule_is_not_evaluated() {
    init_logger();
    let mut pool = standard_pool();
    pool.faults.double_credit_borrow = Some(MAGIC_BORROW_AMOUNT);
    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, supply(ALICE, USDC, 10_000 * USDC_UNIT));
    record(&mut recorder, ALICE, borrow(ALICE, USDC, MAGIC_BORROW_AMOUNT));
    let (ledger, tx) = recorder.finish();

    let config = AssertionConfig {
        disabled_rules: vec![sup::DEBT_SUPPLY.to_string()],
        ..AssertionConfig::default()
    };
    let report = Orchestrator::new(config).evaluate(&tx, &ledger).unwrap();
    assert!(report.is_pass());
    assert!(report.results.iter().all(|r| r.rule != sup::DEBT_SUPPLY));
}

#[test]
fn test_liquidating_healthy_user_is_rejected() {
    // 7.5 WETH at $2,000 against 8,000 USDC: health factor 1.5
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, 15 * WETH_UNIT / 2));
    setup(&mut pool, ALICE, borrow(ALICE, USDC, 8_000 * USDC_UNIT));
    assert_eq!(pool.health_factor(&ALICE), 3 * WAD / 2);

    // An honest pool refuses outright
    let mut honest = Recorder::new(pool.clone());
    assert!(matches!(
        honest.call(BOB, liquidation(WETH, USDC, ALICE, 1_000 * USDC_UNIT)),
        Err(RecordError::Pool(PoolError::HealthyPosition(user))) if user == ALICE
    ));

    pool.faults.allow_healthy_liquidation = true;
    let mut recorder = Recorder::new(pool);
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, 1_000 * USDC_UNIT));

    let report = evaluate(recorder);
    assert_eq!(report.failed_rules(), vec![health::HEALTH_FACTOR]);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message.starts_with("health factor not below 1"));
}

#[test]
fn test_flash_loan_premium_repaid() {
    let pool = standard_pool();
    let before = pool.vault_balance(&USDC);

    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, flash_loan_simple(ALICE, USDC, 12_000_000));
    assert_eq!(recorder.pool().vault_balance(&USDC), before + 6_000);

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
    assert!(report.results.iter().any(|r| r.rule == flash_loan::REPAYMENT));
}

#[test]
fn test_flash_loan_short_by_one_unit_is_rejected() {
    let mut pool = standard_pool();
    pool.faults.flash_repay_shortfall = 1;
    let before = pool.vault_balance(&USDC);

    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, flash_loan_simple(ALICE, USDC, 12_000_000));
    assert_eq!(recorder.pool().vault_balance(&USDC), before + 5_999);

    let report = evaluate(recorder);
    assert!(report.failed_rules().contains(&flash_loan::REPAYMENT));
}

#[test]
fn test_multi_asset_flash_loan_with_debt_leg() {
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, 10 * WETH_UNIT));

    let mut recorder = Recorder::new(pool);
    let legs = vec![
        FlashLoanLeg {
            asset: USDC,
            amount: 50_000 * USDC_UNIT,
            mode: InterestRateMode::None,
        },
        FlashLoanLeg {
            asset: USDC,
            amount: 2_000 * USDC_UNIT,
            mode: InterestRateMode::Variable,
        },
        FlashLoanLeg {
            asset: WETH,
            amount: 3 * WETH_UNIT,
            mode: InterestRateMode::None,
        },
    ];
    record(&mut recorder, ALICE, flash_loan(ALICE, legs));
    assert_eq!(recorder.pool().debt_of(&ALICE, &USDC), 2_000 * USDC_UNIT);

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
    let rules: Vec<&str> = report.results.iter().map(|r| r.rule).collect();
    assert!(rules.contains(&sup::BORROW_CAP));
    assert!(rules.contains(&sup::DEBT_SUPPLY));
}

#[test]
fn test_partial_liquidation_passes() {
    let mut recorder = Recorder::new(underwater_pool());
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, AMOUNT_MAX));

    // Close factor caps the cover at half the debt; 7,500 USDC buys
    // 7,875 dollars of WETH at $1,800
    assert_eq!(recorder.pool().debt_of(&ALICE, &USDC), 7_500 * USDC_UNIT);
    assert_eq!(recorder.pool().collateral_of(&ALICE, &WETH), 5_625 * WETH_UNIT / 1_000);

    let (report, _, tx) = run(recorder);
    assert_eq!(tx.logs.len(), 1);
    assert!(report.is_pass(), "{:?}", report.failures());
    let rules: Vec<&str> = report.results.iter().map(|r| r.rule).collect();
    for rule in [liq::CLOSE_FACTOR, liq::GRACE_PERIOD, deficit::DEFICIT, health::HEALTH_FACTOR] {
        assert!(rules.contains(&rule), "{} not evaluated", rule);
    }
}

#[test]
fn test_liquidation_receiving_collateral_tokens() {
    let mut recorder = Recorder::new(underwater_pool());
    record(
        &mut recorder,
        BOB,
        lending_assertions::CallParams::LiquidationCall {
            collateral_asset: WETH,
            debt_asset: USDC,
            user: ALICE,
            debt_to_cover: 5_000 * USDC_UNIT,
            receive_a_token: true,
        },
    );
    assert!(recorder.pool().collateral_of(&BOB, &WETH) > 0);

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
}

#[test]
fn test_bad_debt_moves_to_deficit() {
    let mut recorder = Recorder::new(insolvent_pool());
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, AMOUNT_MAX));

    let pool = recorder.pool();
    assert_eq!(pool.collateral_of(&ALICE, &WETH), 0);
    assert_eq!(pool.debt_of(&ALICE, &USDC), 0);
    let usdc = pool.reserve_data(&USDC).unwrap();
    assert_eq!(usdc.deficit, 1_200 * USDC_UNIT - 952_380_952);

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
}

#[test]
fn test_unburned_bad_debt_is_rejected() {
    let mut pool = insolvent_pool();
    pool.faults.skip_deficit_burn = true;
    let mut recorder = Recorder::new(pool);
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, AMOUNT_MAX));

    let report = evaluate(recorder);
    assert!(report.failed_rules().contains(&deficit::DEFICIT));
    assert!(report
        .failures()
        .iter()
        .any(|v| v.message.contains("left unaccounted")));
}

#[test]
fn test_liquidation_in_grace_period_is_rejected() {
    let mut pool = underwater_pool();
    pool.set_grace_period(&WETH, pool.timestamp() + 3_600);

    let mut honest = Recorder::new(pool.clone());
    assert!(honest.call(BOB, liquidation(WETH, USDC, ALICE, AMOUNT_MAX)).is_err());

    pool.faults.ignore_grace_period = true;
    let mut recorder = Recorder::new(pool);
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, AMOUNT_MAX));

    let report = evaluate(recorder);
    assert_eq!(report.failed_rules(), vec![liq::GRACE_PERIOD]);
}

#[test]
fn test_price_deviation_boundary() {
    // Exactly 500 bps passes
    let mut recorder = Recorder::new(standard_pool());
    record(&mut recorder, ALICE, supply(ALICE, WETH, WETH_UNIT));
    recorder.pool_mut().set_price(WETH, 2_100 * BASE);
    assert!(evaluate(recorder).is_pass());

    // 501 bps does not
    let mut recorder = Recorder::new(standard_pool());
    record(&mut recorder, ALICE, supply(ALICE, WETH, WETH_UNIT));
    recorder.pool_mut().set_price(WETH, 2_100 * BASE + 20_000_000);
    let report = evaluate(recorder);
    assert_eq!(report.failed_rules(), vec![oracle::PRICE_DEVIATION]);
}

#[test]
fn test_supply_up_to_cap_passes() {
    let mut pool = standard_pool();
    pool.set_caps(&USDC, 1_010_000, 0);
    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, supply(ALICE, USDC, 10_000 * USDC_UNIT));
    assert!(recorder.call(ALICE, supply(ALICE, USDC, 1)).is_err());

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
}

#[test]
fn test_frozen_reserve_needs_pending_ltv() {
    let frozen = ReserveFlags {
        frozen: true,
        ..ReserveFlags::enabled()
    };
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, 10 * WETH_UNIT));
    setup(&mut pool, ALICE, borrow(ALICE, USDC, 1_000 * USDC_UNIT));

    // Repaying into a frozen reserve is allowed, the freeze itself must be
    // part of an LTV change
    let mut mid_change = pool.clone();
    mid_change.set_flags(&USDC, frozen, 7_500);
    let mut recorder = Recorder::new(mid_change);
    record(&mut recorder, ALICE, repay(ALICE, USDC, AMOUNT_MAX));
    assert!(evaluate(recorder).is_pass());

    pool.set_flags(&USDC, frozen, 0);
    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, repay(ALICE, USDC, AMOUNT_MAX));
    let report = evaluate(recorder);
    assert_eq!(report.failed_rules(), vec![reserve::FROZEN_PENDING_LTV]);
}

#[test]
fn test_proxy_echoes_are_not_double_counted() {
    let calls = |recorder: &mut Recorder| {
        record(recorder, ALICE, supply(ALICE, USDC, 10_000 * USDC_UNIT));
        record(recorder, ALICE, borrow(ALICE, USDC, 5_000 * USDC_UNIT));
    };

    let mut direct = Recorder::new(standard_pool());
    calls(&mut direct);
    let direct = evaluate(direct);

    let mut proxied = Recorder::new(standard_pool()).via_proxy(POOL_IMPL);
    calls(&mut proxied);
    let (report, ledger, tx) = run(proxied);

    assert_eq!(tx.calls.len(), 4);
    assert_eq!(report.duplicates, 2);
    assert_eq!(report.calls, 2);
    assert!(report.is_pass(), "{:?}", report.failures());
    assert_eq!(report.results, direct.results);

    let trace = collect(&tx, &ledger.pre.reserves_list()).unwrap();
    let echoes: Vec<usize> = trace.all().iter().filter(|r| r.is_duplicate).map(|r| r.index).collect();
    assert_eq!(echoes, vec![1, 3]);
}

#[test]
fn test_packed_calls_evaluate_like_verbose_ones() {
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, 10 * WETH_UNIT));

    let mut recorder = Recorder::new(pool).packed();
    record(&mut recorder, ALICE, borrow(ALICE, USDC, 4_000 * USDC_UNIT));
    record(&mut recorder, ALICE, repay(ALICE, USDC, 1_000 * USDC_UNIT));
    record(&mut recorder, ALICE, supply(ALICE, USDC, 500 * USDC_UNIT));
    record(&mut recorder, ALICE, withdraw(ALICE, USDC, AMOUNT_MAX));
    // No packed entry point: recorded verbose
    record(&mut recorder, ALICE, flash_loan_simple(ALICE, WETH, WETH_UNIT));

    let (report, ledger, tx) = run(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());

    let trace = collect(&tx, &ledger.pre.reserves_list()).unwrap();
    let encodings: Vec<Encoding> = trace.all().iter().map(|r| r.encoding).collect();
    assert_eq!(
        encodings,
        vec![Encoding::Packed, Encoding::Packed, Encoding::Packed, Encoding::Packed, Encoding::Verbose]
    );
}

#[test]
fn test_packed_liquidation_passes() {
    let mut recorder = Recorder::new(underwater_pool()).packed();
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, 2_000 * USDC_UNIT));
    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
}

#[test]
fn test_batched_borrows_and_full_repay() {
    let mut pool = standard_pool();
    setup(&mut pool, ALICE, supply(ALICE, WETH, 10 * WETH_UNIT));
    setup(&mut pool, BOB, supply(BOB, USDC, 50_000 * USDC_UNIT));

    let mut recorder = Recorder::new(pool);
    record(&mut recorder, ALICE, borrow(ALICE, USDC, 3_000 * USDC_UNIT));
    record(&mut recorder, BOB, borrow(BOB, WETH, 2 * WETH_UNIT));
    record(&mut recorder, ALICE, borrow(ALICE, USDC, 2_000 * USDC_UNIT));
    record(&mut recorder, ALICE, repay(ALICE, USDC, AMOUNT_MAX));
    record(&mut recorder, BOB, repay(BOB, WETH, WETH_UNIT));
    assert_eq!(recorder.pool().debt_of(&ALICE, &USDC), 0);

    let report = evaluate(recorder);
    assert!(report.is_pass(), "{:?}", report.failures());
    assert_eq!(report.calls, 5);
}

#[test]
fn test_evaluation_is_idempotent() {
    init_logger();
    let mut recorder = Recorder::new(underwater_pool());
    record(&mut recorder, BOB, liquidation(WETH, USDC, ALICE, 1_000 * USDC_UNIT));
    let (ledger, tx) = recorder.finish();

    let orchestrator = Orchestrator::default();
    let first = orchestrator.evaluate(&tx, &ledger).unwrap();
    let second = orchestrator.evaluate(&tx, &ledger).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_transaction_without_pool_calls_passes() {
    let mut recorder = Recorder::new(standard_pool());
    recorder.push_raw(RawCall::new(ALICE, USDC, vec![0xa9, 0x05, 0x9c, 0xbb, 0, 0]));
    recorder.push_raw(RawCall::new(ALICE, POOL, vec![0x01]));

    let report = evaluate(recorder);
    assert!(report.is_pass());
    assert!(report.results.is_empty());
    assert_eq!(report.calls, 0);
}

#[test]
fn test_missing_price_fails_closed() {
    init_logger();
    let mut recorder = Recorder::new(standard_pool());
    record(&mut recorder, ALICE, supply(ALICE, USDC, 1_000 * USDC_UNIT));
    recorder.pool_mut().remove_price(&USDC);
    let (ledger, tx) = recorder.finish();

    let orchestrator = Orchestrator::default();
    assert_eq!(
        orchestrator.evaluate(&tx, &ledger),
        Err(AssertionError::PriceUnavailable(USDC))
    );
    assert!(matches!(
        orchestrator.check(&tx, &ledger),
        Err(Rejection::Engine(AssertionError::PriceUnavailable(_)))
    ));
}

#[test]
fn test_unlisted_asset_fails_closed() {
    init_logger();
    let unlisted = Address::repeat_byte(0x99);
    let input = abi::encode_call(&supply(ALICE, unlisted, 1), Encoding::Verbose, &[]).unwrap();
    let mut recorder = Recorder::new(standard_pool());
    recorder.push_raw(RawCall::new(ALICE, POOL, input));
    let (ledger, tx) = recorder.finish();

    assert_eq!(
        Orchestrator::default().evaluate(&tx, &ledger),
        Err(AssertionError::AssetNotConfigured(unlisted))
    );
}

#[test]
fn test_malformed_calldata_fails_closed() {
    init_logger();
    let mut input = abi::encode_call(&borrow(ALICE, USDC, 1), Encoding::Verbose, &[]).unwrap();
    input.truncate(4 + 64);
    let mut recorder = Recorder::new(standard_pool());
    recorder.push_raw(RawCall::new(ALICE, POOL, input));
    let (ledger, tx) = recorder.finish();

    assert!(matches!(
        Orchestrator::default().evaluate(&tx, &ledger),
        Err(AssertionError::Decode { index: 0, .. })
    ));
}
