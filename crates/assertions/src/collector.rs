//! Call Trace Collector
//!
//! Turns a transaction's raw call frames into decoded [`CallRecord`]s. Frames
//! with an unknown selector (token transfers, oracle reads, receiver
//! callbacks) are skipped; a known selector with a malformed payload fails the
//! whole collection.

use crate::abi::{self, events};
use crate::calls::{CallParams, CallRecord, OperationKind, RawCall, Transaction};
use crate::error::AssertionError;
use ledger_model::Address;
use std::collections::BTreeSet;

/// Decoded calls of one transaction, in execution order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallTrace {
    records: Vec<CallRecord>,
}

impl CallTrace {
    /// Every decoded record, proxy echoes included
    pub fn all(&self) -> &[CallRecord] {
        &self.records
    }

    /// Records that represent a user-intended call
    pub fn effective(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.iter().filter(|r| !r.is_duplicate)
    }

    pub fn effective_records(&self) -> Vec<CallRecord> {
        self.effective().cloned().collect()
    }

    pub fn of_kind(&self, kind: OperationKind) -> Vec<CallRecord> {
        self.effective().filter(|r| r.kind() == kind).cloned().collect()
    }

    /// Operation kinds present among effective records
    pub fn kinds(&self) -> BTreeSet<OperationKind> {
        self.effective().map(|r| r.kind()).collect()
    }

    pub fn duplicates(&self) -> usize {
        self.records.iter().filter(|r| r.is_duplicate).count()
    }

    pub fn is_empty(&self) -> bool {
        self.effective().next().is_none()
    }
}

/// Decode every pool call of `tx`
///
/// `reserves` is the pool's reserve list (id -> asset) used by the packed
/// layout.
pub fn collect(tx: &Transaction, reserves: &[Address]) -> Result<CallTrace, AssertionError> {
    let mut records = Vec::new();
    for (index, raw) in tx.calls.iter().enumerate() {
        if let Some(record) = decode_frame(index, raw, reserves)? {
            records.push(record);
        }
    }

    mark_duplicates(&tx.calls, &mut records);
    attach_liquidation_outcomes(tx, &mut records)?;

    log::debug!(
        "collected {} pool calls ({} proxy echoes) from {} frames",
        records.len(),
        records.iter().filter(|r| r.is_duplicate).count(),
        tx.calls.len()
    );
    Ok(CallTrace { records })
}

/// Effective calls of one operation kind
pub fn collect_calls(
    tx: &Transaction,
    kind: OperationKind,
    reserves: &[Address],
) -> Result<Vec<CallRecord>, AssertionError> {
    Ok(collect(tx, reserves)?.of_kind(kind))
}

fn decode_frame(
    index: usize,
    raw: &RawCall,
    reserves: &[Address],
) -> Result<Option<CallRecord>, AssertionError> {
    if raw.input.len() < 4 {
        return Ok(None);
    }
    let Some((kind, encoding)) = abi::lookup(&raw.input[..4]) else {
        return Ok(None);
    };

    let params = abi::decode_call(kind, encoding, raw.caller, &raw.input, reserves)
        .map_err(|source| AssertionError::Decode { index, kind, source })?;

    Ok(Some(CallRecord {
        index,
        caller: raw.caller,
        target: raw.target,
        encoding,
        params,
        is_duplicate: false,
        outcome: None,
    }))
}

/// Flag the delegate-hop echo of each proxied call
///
/// A frame whose executing code differs from its target is the same call seen
/// inside the implementation. It is a duplicate only when a primary frame
/// with the same caller, target and input exists; each primary absorbs at
/// most one echo.
fn mark_duplicates(frames: &[RawCall], records: &mut [CallRecord]) {
    let mut paired = vec![false; records.len()];

    for hop in 0..records.len() {
        let hop_frame = &frames[records[hop].index];
        if !hop_frame.is_delegate_hop() {
            continue;
        }
        let primary = (0..records.len()).find(|&p| {
            let frame = &frames[records[p].index];
            p != hop
                && !paired[p]
                && !frame.is_delegate_hop()
                && frame.caller == hop_frame.caller
                && frame.target == hop_frame.target
                && frame.input == hop_frame.input
        });
        if let Some(p) = primary {
            paired[p] = true;
            records[hop].is_duplicate = true;
        }
    }
}

fn attach_liquidation_outcomes(tx: &Transaction, records: &mut [CallRecord]) -> Result<(), AssertionError> {
    for (index, log) in tx.logs.iter().enumerate() {
        let Some(event) =
            events::decode_liquidation_call(log).map_err(|source| AssertionError::EventDecode { index, source })?
        else {
            continue;
        };

        let slot = records.iter_mut().find(|r| {
            !r.is_duplicate
                && r.outcome.is_none()
                && r.target == event.emitter
                && matches!(
                    r.params,
                    CallParams::LiquidationCall { collateral_asset, debt_asset, user, .. }
                        if collateral_asset == event.collateral_asset
                            && debt_asset == event.debt_asset
                            && user == event.user
                )
        });
        match slot {
            Some(record) => record.outcome = Some(event.outcome),
            None => log::debug!("LiquidationCall log #{} matches no recorded call", index),
        }
    }
    Ok(())
}
