//! Transaction recorder
//!
//! Wraps a [`MockPool`], keeps a copy of it at transaction entry and records
//! every executed call as the raw frames and logs a tracer would report.

use crate::pool::{MockPool, PoolError};
use lending_assertions::abi::{self, events::LiquidationEvent};
use lending_assertions::{CallParams, CheckpointPair, DecodeError, Encoding, LedgerView, RawCall, Transaction};
use ledger_model::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("pool reverted: {0}")]
    Pool(#[from] PoolError),
    #[error("cannot encode call: {0}")]
    Encode(#[from] DecodeError),
}

pub struct Recorder {
    pre: MockPool,
    pool: MockPool,
    encoding: Encoding,
    /// Implementation behind the pool proxy; each call is then traced twice
    implementation: Option<Address>,
    tx: Transaction,
}

impl Recorder {
    pub fn new(pool: MockPool) -> Self {
        Self {
            pre: pool.clone(),
            pool,
            encoding: Encoding::Verbose,
            implementation: None,
            tx: Transaction::default(),
        }
    }

    /// Send calls through the L2 entry points where they exist
    pub fn packed(mut self) -> Self {
        self.encoding = Encoding::Packed;
        self
    }

    pub fn via_proxy(mut self, implementation: Address) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// Mutate the pool mid-transaction (oracle moves, admin actions)
    pub fn pool_mut(&mut self) -> &mut MockPool {
        &mut self.pool
    }

    pub fn pool(&self) -> &MockPool {
        &self.pool
    }

    /// Execute `params` for `caller` and trace it; reverted calls leave no trace
    pub fn call(&mut self, caller: Address, params: CallParams) -> Result<(), RecordError> {
        let encoding = if abi::selector_for(params.kind(), self.encoding).is_some() {
            self.encoding
        } else {
            Encoding::Verbose
        };
        let input = abi::encode_call(&params, encoding, &self.pool.reserves_list())?;
        let outcome = self.pool.execute(caller, &params)?;

        let frame = RawCall::new(caller, self.pool.address, input);
        if let Some(implementation) = self.implementation {
            let echo = frame.delegated_to(implementation);
            self.tx.calls.push(frame);
            self.tx.calls.push(echo);
        } else {
            self.tx.calls.push(frame);
        }

        if let (Some(outcome), CallParams::LiquidationCall {
            collateral_asset,
            debt_asset,
            user,
            ..
        }) = (outcome, &params)
        {
            self.tx.logs.push(abi::events::encode_liquidation_call(&LiquidationEvent {
                emitter: self.pool.address,
                collateral_asset: *collateral_asset,
                debt_asset: *debt_asset,
                user: *user,
                outcome,
            }));
        }
        Ok(())
    }

    /// Trace a frame without executing anything (token transfers, garbage)
    pub fn push_raw(&mut self, frame: RawCall) {
        self.tx.calls.push(frame);
    }

    pub fn finish(self) -> (CheckpointPair<MockPool>, Transaction) {
        (
            CheckpointPair {
                pre: self.pre,
                post: self.pool,
            },
            self.tx,
        )
    }
}
