//! Raw transaction input and decoded call records

use alloy_primitives::{Bytes, Log};
use ledger_model::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pool entry points the engine understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
    Supply,
    Borrow,
    Repay,
    Withdraw,
    LiquidationCall,
    FlashLoan,
    FlashLoanSimple,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Supply,
        OperationKind::Borrow,
        OperationKind::Repay,
        OperationKind::Withdraw,
        OperationKind::LiquidationCall,
        OperationKind::FlashLoan,
        OperationKind::FlashLoanSimple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Supply => "supply",
            OperationKind::Borrow => "borrow",
            OperationKind::Repay => "repay",
            OperationKind::Withdraw => "withdraw",
            OperationKind::LiquidationCall => "liquidationCall",
            OperationKind::FlashLoan => "flashLoan",
            OperationKind::FlashLoanSimple => "flashLoanSimple",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calldata layout a record was decoded from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// One ABI word per argument
    Verbose,
    /// Arguments bit-packed into bytes32 words (L2 pool)
    Packed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestRateMode {
    None,
    Stable,
    Variable,
}

impl InterestRateMode {
    pub fn from_raw(raw: u128) -> Option<Self> {
        match raw {
            0 => Some(InterestRateMode::None),
            1 => Some(InterestRateMode::Stable),
            2 => Some(InterestRateMode::Variable),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u8 {
        match self {
            InterestRateMode::None => 0,
            InterestRateMode::Stable => 1,
            InterestRateMode::Variable => 2,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, InterestRateMode::Variable)
    }
}

/// `type(uint256).max` request: act on the entire balance
pub const AMOUNT_MAX: u128 = u128::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashLoanLeg {
    pub asset: Address,
    pub amount: u128,
    /// None = repay within the transaction, otherwise opens debt
    pub mode: InterestRateMode,
}

/// Decoded arguments, identical for both encodings
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallParams {
    Supply {
        asset: Address,
        amount: u128,
        on_behalf_of: Address,
        referral_code: u16,
    },
    Borrow {
        asset: Address,
        amount: u128,
        interest_rate_mode: InterestRateMode,
        referral_code: u16,
        on_behalf_of: Address,
    },
    Repay {
        asset: Address,
        amount: u128,
        interest_rate_mode: InterestRateMode,
        on_behalf_of: Address,
    },
    Withdraw {
        asset: Address,
        amount: u128,
        to: Address,
    },
    LiquidationCall {
        collateral_asset: Address,
        debt_asset: Address,
        user: Address,
        debt_to_cover: u128,
        receive_a_token: bool,
    },
    FlashLoan {
        receiver: Address,
        legs: Vec<FlashLoanLeg>,
        on_behalf_of: Address,
        referral_code: u16,
    },
    FlashLoanSimple {
        receiver: Address,
        asset: Address,
        amount: u128,
        referral_code: u16,
    },
}

impl CallParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            CallParams::Supply { .. } => OperationKind::Supply,
            CallParams::Borrow { .. } => OperationKind::Borrow,
            CallParams::Repay { .. } => OperationKind::Repay,
            CallParams::Withdraw { .. } => OperationKind::Withdraw,
            CallParams::LiquidationCall { .. } => OperationKind::LiquidationCall,
            CallParams::FlashLoan { .. } => OperationKind::FlashLoan,
            CallParams::FlashLoanSimple { .. } => OperationKind::FlashLoanSimple,
        }
    }

    /// Every asset the call acts on
    pub fn assets(&self) -> Vec<Address> {
        match self {
            CallParams::Supply { asset, .. }
            | CallParams::Borrow { asset, .. }
            | CallParams::Repay { asset, .. }
            | CallParams::Withdraw { asset, .. }
            | CallParams::FlashLoanSimple { asset, .. } => vec![*asset],
            CallParams::LiquidationCall {
                collateral_asset,
                debt_asset,
                ..
            } => vec![*collateral_asset, *debt_asset],
            CallParams::FlashLoan { legs, .. } => legs.iter().map(|l| l.asset).collect(),
        }
    }
}

/// Actual amounts reported by the pool's `LiquidationCall` event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub debt_covered: u128,
    pub collateral_seized: u128,
    pub liquidator: Address,
    pub receive_a_token: bool,
}

/// One decoded sub-call of the transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRecord {
    /// Position in the transaction's call list
    pub index: usize,
    pub caller: Address,
    pub target: Address,
    pub encoding: Encoding,
    pub params: CallParams,
    /// Set for the delegate-hop echo of a call already recorded at the proxy
    pub is_duplicate: bool,
    pub outcome: Option<LiquidationOutcome>,
}

impl CallRecord {
    pub fn kind(&self) -> OperationKind {
        self.params.kind()
    }

    /// Accounts whose positions the call changes
    pub fn users(&self) -> Vec<Address> {
        match &self.params {
            CallParams::Supply { on_behalf_of, .. }
            | CallParams::Borrow { on_behalf_of, .. }
            | CallParams::Repay { on_behalf_of, .. } => vec![*on_behalf_of],
            CallParams::Withdraw { .. } => vec![self.caller],
            CallParams::LiquidationCall { user, .. } => vec![*user, self.caller],
            CallParams::FlashLoan { on_behalf_of, legs, .. } => {
                if legs.iter().any(|l| l.mode != InterestRateMode::None) {
                    vec![*on_behalf_of]
                } else {
                    Vec::new()
                }
            }
            CallParams::FlashLoanSimple { .. } => Vec::new(),
        }
    }
}

/// One frame of the transaction's call trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCall {
    pub caller: Address,
    /// Nominal callee (storage context)
    pub target: Address,
    /// Address whose code executed; differs from `target` on a delegate hop
    #[serde(default)]
    pub bytecode_address: Option<Address>,
    pub input: Bytes,
}

impl RawCall {
    pub fn new(caller: Address, target: Address, input: impl Into<Bytes>) -> Self {
        Self {
            caller,
            target,
            bytecode_address: None,
            input: input.into(),
        }
    }

    /// The same call as seen inside the implementation behind a proxy
    pub fn delegated_to(&self, implementation: Address) -> Self {
        Self {
            bytecode_address: Some(implementation),
            ..self.clone()
        }
    }

    pub fn code_address(&self) -> Address {
        self.bytecode_address.unwrap_or(self.target)
    }

    pub fn is_delegate_hop(&self) -> bool {
        self.code_address() != self.target
    }
}

/// A recorded transaction: its sub-calls and emitted logs
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub calls: Vec<RawCall>,
    #[serde(default)]
    pub logs: Vec<Log>,
}
