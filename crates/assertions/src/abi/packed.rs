//! Compact L2 layout: arguments bit-packed into bytes32 words
//!
//! Bit positions are counted from the least significant bit of the big-endian
//! word. The acting account is always the caller.
//!
//! | call | word | bits |
//! |---|---|---|
//! | supply | args | asset id 0..16, amount 16..144, referral 144..160 |
//! | borrow | args | asset id 0..16, amount 16..144, rate mode 144..152, referral 152..168 |
//! | repay | args | asset id 0..16, amount 16..144, rate mode 144..152 |
//! | withdraw | args | asset id 0..16, amount 16..144 |
//! | liquidationCall | args1 | collateral id 0..16, debt id 16..32, user 32..192 |
//! | liquidationCall | args2 | debt to cover 0..128, receive aToken bit 128 |

use super::pool::IL2Pool;
use super::{abi_decode, mode_from_word};
use crate::calls::{CallParams, OperationKind};
use crate::error::DecodeError;
use alloy_primitives::{B256, U256};
use alloy_sol_types::SolCall;
use ledger_model::Address;

fn word(raw: B256) -> U256 {
    U256::from_be_bytes(raw.0)
}

fn raw(word: U256) -> B256 {
    B256::from(word.to_be_bytes::<32>())
}

fn field(word: U256, shift: usize, bits: usize) -> U256 {
    let mask = (U256::from(1u8) << bits) - U256::from(1u8);
    (word >> shift) & mask
}

fn small(word: U256, shift: usize, bits: usize) -> u128 {
    u128::try_from(field(word, shift, bits)).unwrap_or(u128::MAX)
}

fn asset_at(reserves: &[Address], id: u16) -> Result<Address, DecodeError> {
    match reserves.get(id as usize) {
        Some(asset) if !asset.is_zero() => Ok(*asset),
        _ => Err(DecodeError::UnknownReserveId(id)),
    }
}

fn address(word: U256, shift: usize) -> Address {
    Address::from_slice(&field(word, shift, 160).to_be_bytes::<32>()[12..])
}

/// Decode the full calldata of an L2 pool call
pub fn decode(
    kind: OperationKind,
    caller: Address,
    input: &[u8],
    reserves: &[Address],
) -> Result<CallParams, DecodeError> {
    let params = match kind {
        OperationKind::Supply => {
            let w = word(abi_decode::<IL2Pool::supplyCall>(input)?.args);
            CallParams::Supply {
                asset: asset_at(reserves, small(w, 0, 16) as u16)?,
                amount: small(w, 16, 128),
                on_behalf_of: caller,
                referral_code: small(w, 144, 16) as u16,
            }
        }
        OperationKind::Borrow => {
            let w = word(abi_decode::<IL2Pool::borrowCall>(input)?.args);
            CallParams::Borrow {
                asset: asset_at(reserves, small(w, 0, 16) as u16)?,
                amount: small(w, 16, 128),
                interest_rate_mode: mode_from_word(field(w, 144, 8))?,
                referral_code: small(w, 152, 16) as u16,
                on_behalf_of: caller,
            }
        }
        OperationKind::Repay => {
            let w = word(abi_decode::<IL2Pool::repayCall>(input)?.args);
            CallParams::Repay {
                asset: asset_at(reserves, small(w, 0, 16) as u16)?,
                amount: small(w, 16, 128),
                interest_rate_mode: mode_from_word(field(w, 144, 8))?,
                on_behalf_of: caller,
            }
        }
        OperationKind::Withdraw => {
            let w = word(abi_decode::<IL2Pool::withdrawCall>(input)?.args);
            CallParams::Withdraw {
                asset: asset_at(reserves, small(w, 0, 16) as u16)?,
                amount: small(w, 16, 128),
                to: caller,
            }
        }
        OperationKind::LiquidationCall => {
            let c: IL2Pool::liquidationCallCall = abi_decode(input)?;
            let (w, w2) = (word(c.args1), word(c.args2));
            CallParams::LiquidationCall {
                collateral_asset: asset_at(reserves, small(w, 0, 16) as u16)?,
                debt_asset: asset_at(reserves, small(w, 16, 16) as u16)?,
                user: address(w, 32),
                debt_to_cover: small(w2, 0, 128),
                // Only bit 128 counts; the rest of that byte is ignored
                receive_a_token: small(w2, 128, 1) == 1,
            }
        }
        OperationKind::FlashLoan | OperationKind::FlashLoanSimple => {
            return Err(DecodeError::UnsupportedEncoding(kind));
        }
    };
    Ok(params)
}

/// Pack `params` into L2 calldata; assets are mapped to ids via `reserves`
pub fn encode(params: &CallParams, reserves: &[Address]) -> Result<Vec<u8>, DecodeError> {
    let id_of = |asset: &Address| -> Result<U256, DecodeError> {
        reserves
            .iter()
            .position(|a| a == asset)
            .map(U256::from)
            .ok_or(DecodeError::UnlistedAsset(*asset))
    };

    let input = match params {
        CallParams::Supply {
            asset,
            amount,
            referral_code,
            ..
        } => IL2Pool::supplyCall {
            args: raw(id_of(asset)? | (U256::from(*amount) << 16) | (U256::from(*referral_code) << 144)),
        }
        .abi_encode(),
        CallParams::Borrow {
            asset,
            amount,
            interest_rate_mode,
            referral_code,
            ..
        } => IL2Pool::borrowCall {
            args: raw(id_of(asset)?
                | (U256::from(*amount) << 16)
                | (U256::from(interest_rate_mode.as_raw()) << 144)
                | (U256::from(*referral_code) << 152)),
        }
        .abi_encode(),
        CallParams::Repay {
            asset,
            amount,
            interest_rate_mode,
            ..
        } => IL2Pool::repayCall {
            args: raw(id_of(asset)? | (U256::from(*amount) << 16) | (U256::from(interest_rate_mode.as_raw()) << 144)),
        }
        .abi_encode(),
        CallParams::Withdraw { asset, amount, .. } => IL2Pool::withdrawCall {
            args: raw(id_of(asset)? | (U256::from(*amount) << 16)),
        }
        .abi_encode(),
        CallParams::LiquidationCall {
            collateral_asset,
            debt_asset,
            user,
            debt_to_cover,
            receive_a_token,
        } => IL2Pool::liquidationCallCall {
            args1: raw(id_of(collateral_asset)?
                | (id_of(debt_asset)? << 16)
                | (U256::from_be_slice(user.as_slice()) << 32)),
            args2: raw(U256::from(*debt_to_cover) | (U256::from(*receive_a_token as u8) << 128)),
        }
        .abi_encode(),
        CallParams::FlashLoan { .. } | CallParams::FlashLoanSimple { .. } => {
            return Err(DecodeError::UnsupportedEncoding(params.kind()))
        }
    };
    Ok(input)
}
