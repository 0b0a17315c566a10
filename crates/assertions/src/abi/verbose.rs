//! Main pool layout: one ABI word per argument

use super::pool::IPool;
use super::{abi_decode, amount_from_word, amount_to_word, mode_from_word};
use crate::calls::{CallParams, FlashLoanLeg, OperationKind};
use crate::error::DecodeError;
use alloy_primitives::{Bytes, U256};
use alloy_sol_types::SolCall;

/// Decode the full calldata of a verbose pool call
pub fn decode(kind: OperationKind, input: &[u8]) -> Result<CallParams, DecodeError> {
    let params = match kind {
        OperationKind::Supply => {
            let c: IPool::supplyCall = abi_decode(input)?;
            CallParams::Supply {
                asset: c.asset,
                amount: amount_from_word(c.amount, "amount")?,
                on_behalf_of: c.onBehalfOf,
                referral_code: c.referralCode,
            }
        }
        OperationKind::Borrow => {
            let c: IPool::borrowCall = abi_decode(input)?;
            CallParams::Borrow {
                asset: c.asset,
                amount: amount_from_word(c.amount, "amount")?,
                interest_rate_mode: mode_from_word(c.interestRateMode)?,
                referral_code: c.referralCode,
                on_behalf_of: c.onBehalfOf,
            }
        }
        OperationKind::Repay => {
            let c: IPool::repayCall = abi_decode(input)?;
            CallParams::Repay {
                asset: c.asset,
                amount: amount_from_word(c.amount, "amount")?,
                interest_rate_mode: mode_from_word(c.interestRateMode)?,
                on_behalf_of: c.onBehalfOf,
            }
        }
        OperationKind::Withdraw => {
            let c: IPool::withdrawCall = abi_decode(input)?;
            CallParams::Withdraw {
                asset: c.asset,
                amount: amount_from_word(c.amount, "amount")?,
                to: c.to,
            }
        }
        OperationKind::LiquidationCall => {
            let c: IPool::liquidationCallCall = abi_decode(input)?;
            CallParams::LiquidationCall {
                collateral_asset: c.collateralAsset,
                debt_asset: c.debtAsset,
                user: c.user,
                debt_to_cover: amount_from_word(c.debtToCover, "debtToCover")?,
                receive_a_token: c.receiveAToken,
            }
        }
        OperationKind::FlashLoan => decode_flash_loan(abi_decode(input)?)?,
        OperationKind::FlashLoanSimple => {
            // Receiver params are opaque to the engine
            let c: IPool::flashLoanSimpleCall = abi_decode(input)?;
            CallParams::FlashLoanSimple {
                receiver: c.receiverAddress,
                asset: c.asset,
                amount: amount_from_word(c.amount, "amount")?,
                referral_code: c.referralCode,
            }
        }
    };
    Ok(params)
}

fn decode_flash_loan(c: IPool::flashLoanCall) -> Result<CallParams, DecodeError> {
    if c.assets.len() != c.amounts.len() || c.assets.len() != c.interestRateModes.len() {
        return Err(DecodeError::ArrayLengthMismatch {
            assets: c.assets.len(),
            amounts: c.amounts.len(),
            modes: c.interestRateModes.len(),
        });
    }

    let legs = c
        .assets
        .iter()
        .zip(&c.amounts)
        .zip(&c.interestRateModes)
        .map(|((asset, amount), mode)| {
            Ok(FlashLoanLeg {
                asset: *asset,
                amount: amount_from_word(*amount, "amounts")?,
                mode: mode_from_word(*mode)?,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(CallParams::FlashLoan {
        receiver: c.receiverAddress,
        legs,
        on_behalf_of: c.onBehalfOf,
        referral_code: c.referralCode,
    })
}

fn mode_word(mode: crate::calls::InterestRateMode) -> U256 {
    U256::from(mode.as_raw())
}

/// ABI-encode `params` against the main pool, selector included
pub fn encode(params: &CallParams) -> Vec<u8> {
    match params {
        CallParams::Supply {
            asset,
            amount,
            on_behalf_of,
            referral_code,
        } => IPool::supplyCall {
            asset: *asset,
            amount: amount_to_word(*amount),
            onBehalfOf: *on_behalf_of,
            referralCode: *referral_code,
        }
        .abi_encode(),
        CallParams::Borrow {
            asset,
            amount,
            interest_rate_mode,
            referral_code,
            on_behalf_of,
        } => IPool::borrowCall {
            asset: *asset,
            amount: amount_to_word(*amount),
            interestRateMode: mode_word(*interest_rate_mode),
            referralCode: *referral_code,
            onBehalfOf: *on_behalf_of,
        }
        .abi_encode(),
        CallParams::Repay {
            asset,
            amount,
            interest_rate_mode,
            on_behalf_of,
        } => IPool::repayCall {
            asset: *asset,
            amount: amount_to_word(*amount),
            interestRateMode: mode_word(*interest_rate_mode),
            onBehalfOf: *on_behalf_of,
        }
        .abi_encode(),
        CallParams::Withdraw { asset, amount, to } => IPool::withdrawCall {
            asset: *asset,
            amount: amount_to_word(*amount),
            to: *to,
        }
        .abi_encode(),
        CallParams::LiquidationCall {
            collateral_asset,
            debt_asset,
            user,
            debt_to_cover,
            receive_a_token,
        } => IPool::liquidationCallCall {
            collateralAsset: *collateral_asset,
            debtAsset: *debt_asset,
            user: *user,
            debtToCover: amount_to_word(*debt_to_cover),
            receiveAToken: *receive_a_token,
        }
        .abi_encode(),
        CallParams::FlashLoan {
            receiver,
            legs,
            on_behalf_of,
            referral_code,
        } => IPool::flashLoanCall {
            receiverAddress: *receiver,
            assets: legs.iter().map(|l| l.asset).collect(),
            amounts: legs.iter().map(|l| amount_to_word(l.amount)).collect(),
            interestRateModes: legs.iter().map(|l| mode_word(l.mode)).collect(),
            onBehalfOf: *on_behalf_of,
            params: Bytes::new(),
            referralCode: *referral_code,
        }
        .abi_encode(),
        CallParams::FlashLoanSimple {
            receiver,
            asset,
            amount,
            referral_code,
        } => IPool::flashLoanSimpleCall {
            receiverAddress: *receiver,
            asset: *asset,
            amount: amount_to_word(*amount),
            params: Bytes::new(),
            referralCode: *referral_code,
        }
        .abi_encode(),
    }
}
