//! Error types for the assertion engine

use crate::calls::OperationKind;
use crate::invariants::Violation;
use alloy_primitives::U256;
use ledger_model::{Address, MissingEntry};
use thiserror::Error;

/// Malformed or unsupported calldata / log payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed ABI payload: {0}")]
    Abi(String),
    #[error("{0} does not fit in 128 bits")]
    AmountOverflow(&'static str),
    #[error("unsupported interest rate mode {0}")]
    InvalidInterestRateMode(U256),
    #[error("flash loan arrays differ in length: {assets} assets, {amounts} amounts, {modes} modes")]
    ArrayLengthMismatch {
        assets: usize,
        amounts: usize,
        modes: usize,
    },
    #[error("reserve id {0} is not listed by the pool")]
    UnknownReserveId(u16),
    #[error("asset {0} has no reserve id")]
    UnlistedAsset(Address),
    #[error("{0} has no packed encoding")]
    UnsupportedEncoding(OperationKind),
}

/// Conditions that stop evaluation before a verdict can be trusted.
/// Every variant fails the transaction closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("asset {0} not configured: no reserve with collateral/debt token mapping")]
    AssetNotConfigured(Address),

    #[error("token {token} of asset {asset} is unknown to the ledger")]
    TokenNotFound { asset: Address, token: Address },

    #[error("oracle has no price for asset {0}")]
    PriceUnavailable(Address),

    #[error("failed to decode {kind} call #{index}: {source}")]
    Decode {
        index: usize,
        kind: OperationKind,
        #[source]
        source: DecodeError,
    },

    #[error("failed to decode log #{index}: {source}")]
    EventDecode {
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("ledger has no account data for {0}")]
    AccountUnavailable(Address),

    #[error("snapshot incomplete: {0}")]
    Snapshot(#[from] MissingEntry),
}

/// Aggregated rejection of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Assertions Reverted: {}", .rules.join(", "))]
pub struct AssertionsReverted {
    pub rules: Vec<&'static str>,
    pub violations: Vec<Violation>,
}
