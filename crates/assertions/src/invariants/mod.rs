//! Invariant Catalogue
//!
//! Every rule is a pure function over the pre snapshot, the post snapshot and
//! the effective call records of one transaction. Rules aggregate over the
//! whole call list; a single call is just a batch of one.

pub mod deficit;
pub mod flash_loan;
pub mod flows;
pub mod health;
pub mod liquidation;
pub mod oracle;
pub mod reserve;
pub mod supply;

use crate::calls::{CallRecord, OperationKind};
use crate::config::AssertionConfig;
use ledger_model::{Address, MissingEntry, Snapshot};
use std::collections::BTreeSet;

use OperationKind::*;

/// One failed check of a named rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub rule: &'static str,
    pub message: String,
}

/// Outcome of one evaluator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantResult {
    pub rule: &'static str,
    /// Diagnostics, empty on pass
    pub messages: Vec<String>,
}

impl InvariantResult {
    pub fn pass(rule: &'static str) -> Self {
        Self {
            rule,
            messages: Vec::new(),
        }
    }

    pub fn fail(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            messages: vec![message.into()],
        }
    }

    pub fn is_pass(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.messages
            .iter()
            .map(|message| Violation {
                rule: self.rule,
                message: message.clone(),
            })
            .collect()
    }
}

/// Collects the diagnostics of one rule
pub struct Findings {
    rule: &'static str,
    messages: Vec<String>,
}

impl Findings {
    pub fn new(rule: &'static str) -> Self {
        Self {
            rule,
            messages: Vec::new(),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Record `message` unless `ok` holds
    pub fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.messages.push(message());
        }
    }

    pub fn finish(self) -> InvariantResult {
        InvariantResult {
            rule: self.rule,
            messages: self.messages,
        }
    }
}

/// Inputs shared by every evaluator of one transaction
pub struct EvalContext<'a> {
    pub pre: &'a Snapshot,
    pub post: &'a Snapshot,
    /// Effective records only (proxy echoes removed)
    pub calls: &'a [CallRecord],
    pub config: &'a AssertionConfig,
}

impl<'a> EvalContext<'a> {
    pub fn calls_of(&self, kind: OperationKind) -> impl Iterator<Item = &'a CallRecord> + '_ {
        self.calls.iter().filter(move |c| c.kind() == kind)
    }

    pub fn has(&self, kind: OperationKind) -> bool {
        self.calls_of(kind).next().is_some()
    }

    /// Assets acted on by any call, in address order
    pub fn touched_assets(&self) -> BTreeSet<Address> {
        self.calls.iter().flat_map(|c| c.params.assets()).collect()
    }

    /// Accounts whose positions any call changes
    pub fn touched_users(&self) -> BTreeSet<Address> {
        self.calls.iter().flat_map(|c| c.users()).collect()
    }
}

pub type Evaluator = fn(&EvalContext<'_>) -> Result<InvariantResult, MissingEntry>;

/// A named rule and the operations that trigger it
pub struct InvariantDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub triggers: &'static [OperationKind],
    pub evaluate: Evaluator,
}

impl InvariantDefinition {
    pub fn is_triggered_by(&self, kind: OperationKind) -> bool {
        self.triggers.contains(&kind)
    }
}

impl std::fmt::Debug for InvariantDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvariantDefinition")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .finish()
    }
}

const ALL_KINDS: &[OperationKind] = &[
    Supply,
    Borrow,
    Repay,
    Withdraw,
    LiquidationCall,
    FlashLoan,
    FlashLoanSimple,
];

/// Every rule, in evaluation order
pub static CATALOGUE: &[InvariantDefinition] = &[
    InvariantDefinition {
        name: supply::DEBT_SUPPLY,
        description: "debt token supply moves exactly by borrowed, repaid, liquidated and written-off debt",
        triggers: &[Borrow, Repay, LiquidationCall, FlashLoan],
        evaluate: supply::debt_supply_consistency,
    },
    InvariantDefinition {
        name: supply::COLLATERAL_SUPPLY,
        description: "collateral token supply moves exactly by supplied, withdrawn and seized amounts",
        triggers: &[Supply, Withdraw, LiquidationCall],
        evaluate: supply::collateral_supply_consistency,
    },
    InvariantDefinition {
        name: reserve::UNDERLYING,
        description: "the vault holds enough underlying to cover net liabilities",
        triggers: ALL_KINDS,
        evaluate: reserve::underlying_reserve_sufficiency,
    },
    InvariantDefinition {
        name: reserve::VIRTUAL_BALANCE,
        description: "virtual accounting never outruns real underlying",
        triggers: ALL_KINDS,
        evaluate: reserve::virtual_balance_sufficiency,
    },
    InvariantDefinition {
        name: reserve::LIQUIDITY_INDEX,
        description: "virtual + debt + deficit equals scaled claims times the liquidity index",
        triggers: ALL_KINDS,
        evaluate: reserve::liquidity_index_identity,
    },
    InvariantDefinition {
        name: reserve::FROZEN_PENDING_LTV,
        description: "a frozen reserve always has a pending LTV change",
        triggers: ALL_KINDS,
        evaluate: reserve::frozen_reserve_pending_ltv,
    },
    InvariantDefinition {
        name: reserve::RESERVE_STATUS,
        description: "operations only touch reserves whose flags allow them",
        triggers: ALL_KINDS,
        evaluate: reserve::reserve_status,
    },
    InvariantDefinition {
        name: oracle::PRICE_DEVIATION,
        description: "oracle prices of acted-on assets stay non-zero and within the deviation bound",
        triggers: &[Supply, Borrow, LiquidationCall],
        evaluate: oracle::oracle_price_deviation,
    },
    InvariantDefinition {
        name: flash_loan::REPAYMENT,
        description: "flash-loaned assets come back with the premium",
        triggers: &[FlashLoan, FlashLoanSimple],
        evaluate: flash_loan::flash_loan_repayment,
    },
    InvariantDefinition {
        name: health::HEALTH_FACTOR,
        description: "operations move health factors only in their allowed direction",
        triggers: &[Supply, Borrow, Repay, Withdraw, LiquidationCall],
        evaluate: health::health_factor_monotonicity,
    },
    InvariantDefinition {
        name: liquidation::CLOSE_FACTOR,
        description: "liquidation size respects the close factor and leaves no dust",
        triggers: &[LiquidationCall],
        evaluate: liquidation::liquidation_close_factor,
    },
    InvariantDefinition {
        name: liquidation::GRACE_PERIOD,
        description: "no liquidation while a reserve is in its grace period",
        triggers: &[LiquidationCall],
        evaluate: liquidation::liquidation_grace_period,
    },
    InvariantDefinition {
        name: deficit::DEFICIT,
        description: "deficit only records debt burned from fully liquidated users",
        triggers: ALL_KINDS,
        evaluate: deficit::deficit_accounting,
    },
    InvariantDefinition {
        name: supply::SUPPLY_CAP,
        description: "supply growth stays under the supply cap",
        triggers: &[Supply],
        evaluate: supply::supply_cap,
    },
    InvariantDefinition {
        name: supply::BORROW_CAP,
        description: "debt growth stays under the borrow cap",
        triggers: &[Borrow, FlashLoan],
        evaluate: supply::borrow_cap,
    },
];
