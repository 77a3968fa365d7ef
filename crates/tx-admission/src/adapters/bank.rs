//! Balances and fee allowances.

use crate::domain::{AdmissionError, StateOverlay};
use crate::ports::{BankKeeper, FeeGrantKeeper};
use serde::{Deserialize, Serialize};
use shared_types::{address_hex, amount_of, Address, Coin, Msg, U256};

const BALANCE_PREFIX: &[u8] = b"bank/balance/";
const ALLOWANCE_PREFIX: &[u8] = b"feegrant/allowance/";

fn balance_key(address: &Address, denom: &str) -> Vec<u8> {
    [BALANCE_PREFIX, address.as_slice(), b"/", denom.as_bytes()].concat()
}

/// Bank keeper storing one `U256` per (address, denom).
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBankKeeper;

impl MemoryBankKeeper {
    pub fn set_balance(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
        coin: &Coin,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(&balance_key(address, &coin.denom), &coin.amount)?)
    }
}

impl BankKeeper for MemoryBankKeeper {
    fn balance(
        &self,
        state: &StateOverlay<'_>,
        address: &Address,
        denom: &str,
    ) -> Result<U256, AdmissionError> {
        Ok(state
            .get_typed(&balance_key(address, denom))?
            .unwrap_or_default())
    }

    fn send_coins(
        &self,
        state: &mut StateOverlay<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> Result<(), AdmissionError> {
        for coin in coins {
            let available = self.balance(state, from, &coin.denom)?;
            let remaining = available.checked_sub(coin.amount).ok_or_else(|| {
                AdmissionError::InsufficientFunds(format!(
                    "{} has {}{}, needs {}{}",
                    address_hex(from),
                    available,
                    coin.denom,
                    coin.amount,
                    coin.denom
                ))
            })?;
            state.set_typed(&balance_key(from, &coin.denom), &remaining)?;

            let credited = self
                .balance(state, to, &coin.denom)?
                .saturating_add(coin.amount);
            state.set_typed(&balance_key(to, &coin.denom), &credited)?;
        }
        Ok(())
    }
}

/// A fee allowance from a granter to a grantee.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeAllowance {
    /// Remaining spendable fees; empty means unlimited.
    pub spend_limit: Vec<Coin>,
    /// Message types the allowance covers; empty means all.
    pub allowed_msgs: Vec<String>,
}

fn allowance_key(granter: &Address, grantee: &Address) -> Vec<u8> {
    [ALLOWANCE_PREFIX, granter.as_slice(), grantee.as_slice()].concat()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFeeGrantKeeper;

impl MemoryFeeGrantKeeper {
    pub fn grant(
        &self,
        state: &mut StateOverlay<'_>,
        granter: &Address,
        grantee: &Address,
        allowance: &FeeAllowance,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(&allowance_key(granter, grantee), allowance)?)
    }

    pub fn allowance(
        &self,
        state: &StateOverlay<'_>,
        granter: &Address,
        grantee: &Address,
    ) -> Result<Option<FeeAllowance>, AdmissionError> {
        Ok(state.get_typed(&allowance_key(granter, grantee))?)
    }
}

impl FeeGrantKeeper for MemoryFeeGrantKeeper {
    fn use_granted_fees(
        &self,
        state: &mut StateOverlay<'_>,
        granter: &Address,
        grantee: &Address,
        fee: &[Coin],
        msgs: &[Msg],
    ) -> Result<(), AdmissionError> {
        let mut allowance = self.allowance(state, granter, grantee)?.ok_or_else(|| {
            AdmissionError::InsufficientFunds(format!(
                "no fee allowance from {} to {}",
                address_hex(granter),
                address_hex(grantee)
            ))
        })?;

        if !allowance.allowed_msgs.is_empty() {
            if let Some(msg) = msgs
                .iter()
                .find(|m| !allowance.allowed_msgs.iter().any(|t| t == m.type_url()))
            {
                return Err(AdmissionError::DisallowedMessageType {
                    type_url: msg.type_url().to_string(),
                    reason: "not covered by fee allowance".into(),
                });
            }
        }

        if !allowance.spend_limit.is_empty() {
            for coin in fee {
                let limit = amount_of(&allowance.spend_limit, &coin.denom);
                let left = limit.checked_sub(coin.amount).ok_or_else(|| {
                    AdmissionError::InsufficientFunds(format!(
                        "fee allowance exceeded: {}{} left, {}{} needed",
                        limit, coin.denom, coin.amount, coin.denom
                    ))
                })?;
                if let Some(entry) = allowance
                    .spend_limit
                    .iter_mut()
                    .find(|c| c.denom == coin.denom)
                {
                    entry.amount = left;
                }
            }
            allowance.spend_limit.retain(|c| !c.amount.is_zero());
            if allowance.spend_limit.is_empty() {
                // Spent out: drop the grant instead of turning it unlimited.
                state.delete(&allowance_key(granter, grantee));
                return Ok(());
            }
        }

        self.grant(state, granter, grantee, &allowance)
    }
}
