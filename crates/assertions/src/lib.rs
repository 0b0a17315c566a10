//! Lending protocol assertion engine
//!
//! Verifies, at the boundary of every state-changing pool operation, that the
//! ledger's pre- and post-transaction states are internally consistent.
//!
//! Data flow: [`collector`] decodes the transaction's sub-calls into
//! [`CallRecord`]s, the [`registry`] selects the invariants those operations
//! trigger, [`accessor`] captures one immutable snapshot per checkpoint, and the
//! [`orchestrator`] runs the [`invariants`] and aggregates their verdicts.

pub mod abi;
pub mod accessor;
pub mod calls;
pub mod collector;
pub mod config;
pub mod error;
pub mod invariants;
pub mod orchestrator;
pub mod registry;

pub use accessor::*;
pub use calls::*;
pub use collector::*;
pub use config::*;
pub use error::*;
pub use invariants::{EvalContext, InvariantDefinition, InvariantResult, Violation};
pub use orchestrator::*;
pub use registry::*;

pub use ledger_model;
