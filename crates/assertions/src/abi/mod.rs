//! Pool calldata and event codecs
//!
//! Two calldata layouts decode into the same [`CallParams`]: the verbose
//! ABI of the main pool and the bit-packed layout of the L2 pool.

pub mod events;
pub mod packed;
pub mod pool;
pub mod verbose;

use crate::calls::{CallParams, Encoding, InterestRateMode, OperationKind, AMOUNT_MAX};
use crate::error::DecodeError;
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use ledger_model::Address;
use pool::{IL2Pool, IPool};

/// selector -> (operation, encoding)
pub const SELECTORS: [([u8; 4], OperationKind, Encoding); 12] = [
    (IPool::supplyCall::SELECTOR, OperationKind::Supply, Encoding::Verbose),
    (IPool::borrowCall::SELECTOR, OperationKind::Borrow, Encoding::Verbose),
    (IPool::repayCall::SELECTOR, OperationKind::Repay, Encoding::Verbose),
    (IPool::withdrawCall::SELECTOR, OperationKind::Withdraw, Encoding::Verbose),
    (IPool::liquidationCallCall::SELECTOR, OperationKind::LiquidationCall, Encoding::Verbose),
    (IPool::flashLoanCall::SELECTOR, OperationKind::FlashLoan, Encoding::Verbose),
    (IPool::flashLoanSimpleCall::SELECTOR, OperationKind::FlashLoanSimple, Encoding::Verbose),
    (IL2Pool::supplyCall::SELECTOR, OperationKind::Supply, Encoding::Packed),
    (IL2Pool::borrowCall::SELECTOR, OperationKind::Borrow, Encoding::Packed),
    (IL2Pool::repayCall::SELECTOR, OperationKind::Repay, Encoding::Packed),
    (IL2Pool::withdrawCall::SELECTOR, OperationKind::Withdraw, Encoding::Packed),
    (IL2Pool::liquidationCallCall::SELECTOR, OperationKind::LiquidationCall, Encoding::Packed),
];

/// Resolve a selector to the operation it invokes
pub fn lookup(selector: &[u8]) -> Option<(OperationKind, Encoding)> {
    SELECTORS
        .iter()
        .find(|(s, _, _)| s.as_slice() == selector)
        .map(|(_, kind, encoding)| (*kind, *encoding))
}

/// Selector used to encode `kind` in the given layout
pub fn selector_for(kind: OperationKind, encoding: Encoding) -> Option<[u8; 4]> {
    SELECTORS
        .iter()
        .find(|(_, k, e)| *k == kind && *e == encoding)
        .map(|(s, _, _)| *s)
}

/// Decode full calldata (selector included) resolved to `(kind, encoding)`
///
/// Packed calls act for `caller` and resolve reserve ids through `reserves`.
pub fn decode_call(
    kind: OperationKind,
    encoding: Encoding,
    caller: Address,
    input: &[u8],
    reserves: &[Address],
) -> Result<CallParams, DecodeError> {
    match encoding {
        Encoding::Verbose => verbose::decode(kind, input),
        Encoding::Packed => packed::decode(kind, caller, input, reserves),
    }
}

/// Full calldata (selector and arguments) for `params`
pub fn encode_call(params: &CallParams, encoding: Encoding, reserves: &[Address]) -> Result<Vec<u8>, DecodeError> {
    match encoding {
        Encoding::Verbose => Ok(verbose::encode(params)),
        Encoding::Packed => packed::encode(params, reserves),
    }
}

pub(crate) fn abi_decode<C: SolCall>(input: &[u8]) -> Result<C, DecodeError> {
    C::abi_decode(input).map_err(|e| DecodeError::Abi(e.to_string()))
}

/// Map a uint256 amount onto u128: `type(uint256).max` becomes [`AMOUNT_MAX`]
pub(crate) fn amount_from_word(value: U256, field: &'static str) -> Result<u128, DecodeError> {
    if value == U256::MAX {
        return Ok(AMOUNT_MAX);
    }
    u128::try_from(value).map_err(|_| DecodeError::AmountOverflow(field))
}

pub(crate) fn amount_to_word(amount: u128) -> U256 {
    if amount == AMOUNT_MAX {
        U256::MAX
    } else {
        U256::from(amount)
    }
}

pub(crate) fn mode_from_word(value: U256) -> Result<InterestRateMode, DecodeError> {
    u128::try_from(value)
        .ok()
        .and_then(InterestRateMode::from_raw)
        .ok_or(DecodeError::InvalidInterestRateMode(value))
}
