//! Evaluation Orchestrator
//!
//! Entry point per transaction: collect calls, select rules, capture both
//! checkpoints once, run every selected rule and aggregate the verdict.

use crate::accessor::{CheckpointedLedger, Scope, SnapshotAccessor};
use crate::calls::{OperationKind, Transaction};
use crate::collector;
use crate::config::AssertionConfig;
use crate::error::{AssertionError, AssertionsReverted};
use crate::invariants::{EvalContext, InvariantResult, Violation};
use crate::registry::TriggerRegistry;
use ledger_model::Checkpoint;
use std::collections::BTreeSet;

/// Verdict over one transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// One entry per evaluated rule, in registry order
    pub results: Vec<InvariantResult>,
    pub operations: BTreeSet<OperationKind>,
    /// Effective calls evaluated
    pub calls: usize,
    /// Proxy echoes excluded from aggregation
    pub duplicates: usize,
}

impl Report {
    pub fn is_pass(&self) -> bool {
        self.results.iter().all(|r| r.is_pass())
    }

    pub fn failures(&self) -> Vec<Violation> {
        self.results.iter().flat_map(|r| r.violations()).collect()
    }

    pub fn failed_rules(&self) -> Vec<&'static str> {
        self.results.iter().filter(|r| !r.is_pass()).map(|r| r.rule).collect()
    }

    /// Collapse into the single all-or-nothing outcome of the transaction
    pub fn into_result(self) -> Result<(), AssertionsReverted> {
        if self.is_pass() {
            return Ok(());
        }
        Err(AssertionsReverted {
            rules: self.failed_rules(),
            violations: self.failures(),
        })
    }
}

/// Stateless between runs: evaluating the same trace twice gives the same
/// report
#[derive(Debug)]
pub struct Orchestrator {
    config: AssertionConfig,
    registry: TriggerRegistry,
}

impl Orchestrator {
    pub fn new(config: AssertionConfig) -> Self {
        let registry = TriggerRegistry::without(&config.disabled_rules);
        Self { config, registry }
    }

    pub fn config(&self) -> &AssertionConfig {
        &self.config
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Evaluate `tx` against the ledger's pre and post checkpoints
    ///
    /// `Err` means the engine could not establish ground truth (unconfigured
    /// asset, unknown token, missing price, malformed calldata); callers must
    /// treat it as a rejection.
    pub fn evaluate<L>(&self, tx: &Transaction, ledger: &L) -> Result<Report, AssertionError>
    where
        L: CheckpointedLedger + ?Sized,
    {
        let accessor = SnapshotAccessor::new(ledger);
        let reserves = accessor.reserves_list(Checkpoint::Pre);
        let trace = collector::collect(tx, &reserves)?;

        let operations = trace.kinds();
        let calls = trace.effective_records();
        let definitions = self.registry.triggered_by(&operations);
        if definitions.is_empty() {
            log::debug!("no pool operations in transaction, nothing to check");
            return Ok(Report {
                results: Vec::new(),
                operations,
                calls: calls.len(),
                duplicates: trace.duplicates(),
            });
        }

        let scope = Scope::of_calls(&calls, &reserves);
        let pre = accessor.capture(Checkpoint::Pre, &scope)?;
        let post = accessor.capture(Checkpoint::Post, &scope)?;

        let ctx = EvalContext {
            pre: &pre,
            post: &post,
            calls: &calls,
            config: &self.config,
        };

        let mut results = Vec::with_capacity(definitions.len());
        for def in definitions {
            let result = (def.evaluate)(&ctx)?;
            if result.is_pass() {
                log::debug!("{}: pass", def.name);
            } else {
                for message in &result.messages {
                    log::warn!("{}: {}", def.name, message);
                }
            }
            results.push(result);
        }

        let report = Report {
            results,
            operations,
            calls: calls.len(),
            duplicates: trace.duplicates(),
        };
        log::info!(
            "evaluated {} rules over {} calls ({} duplicates): {}",
            report.results.len(),
            report.calls,
            report.duplicates,
            if report.is_pass() { "pass" } else { "REJECTED" }
        );
        Ok(report)
    }

    /// Evaluate and collapse to the transaction's verdict
    pub fn check<L>(&self, tx: &Transaction, ledger: &L) -> Result<(), Rejection>
    where
        L: CheckpointedLedger + ?Sized,
    {
        self.evaluate(tx, ledger)?.into_result()?;
        Ok(())
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(AssertionConfig::default())
    }
}

/// Why a transaction was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error(transparent)]
    Reverted(#[from] AssertionsReverted),
    #[error("evaluation failed closed: {0}")]
    Engine(#[from] AssertionError),
}
