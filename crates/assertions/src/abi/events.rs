//! Pool events carrying the realised amounts of an operation

use super::amount_from_word;
use super::pool::IPool;
use crate::calls::LiquidationOutcome;
use crate::error::DecodeError;
use alloy_primitives::{Log, U256};
use alloy_sol_types::SolEvent;
use ledger_model::Address;

/// Decoded `LiquidationCall` event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidationEvent {
    pub emitter: Address,
    pub collateral_asset: Address,
    pub debt_asset: Address,
    pub user: Address,
    pub outcome: LiquidationOutcome,
}

pub fn is_liquidation_call(log: &Log) -> bool {
    log.data.topics().first() == Some(&IPool::LiquidationCall::SIGNATURE_HASH)
}

/// Decode a log whose first topic is the `LiquidationCall` signature
///
/// Returns `Ok(None)` for any other event.
pub fn decode_liquidation_call(log: &Log) -> Result<Option<LiquidationEvent>, DecodeError> {
    if !is_liquidation_call(log) {
        return Ok(None);
    }
    let decoded = IPool::LiquidationCall::decode_log(log).map_err(|e| DecodeError::Abi(e.to_string()))?;
    let event = &decoded.data;

    Ok(Some(LiquidationEvent {
        emitter: log.address,
        collateral_asset: event.collateralAsset,
        debt_asset: event.debtAsset,
        user: event.user,
        outcome: LiquidationOutcome {
            debt_covered: amount_from_word(event.debtToCover, "debtToCover")?,
            collateral_seized: amount_from_word(event.liquidatedCollateralAmount, "liquidatedCollateralAmount")?,
            liquidator: event.liquidator,
            receive_a_token: event.receiveAToken,
        },
    }))
}

/// Build the log a pool emits for a completed liquidation
pub fn encode_liquidation_call(event: &LiquidationEvent) -> Log {
    let data = IPool::LiquidationCall {
        collateralAsset: event.collateral_asset,
        debtAsset: event.debt_asset,
        user: event.user,
        debtToCover: U256::from(event.outcome.debt_covered),
        liquidatedCollateralAmount: U256::from(event.outcome.collateral_seized),
        liquidator: event.outcome.liquidator,
        receiveAToken: event.outcome.receive_a_token,
    }
    .encode_log_data();

    Log {
        address: event.emitter,
        data,
    }
}
