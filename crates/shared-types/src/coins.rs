//! Coin amounts and the stateless rules every fee or transfer must satisfy.

use crate::errors::ValidationError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<U256>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

/// Returns the amount of `denom` in `coins`, zero when absent.
pub fn amount_of(coins: &[Coin], denom: &str) -> U256 {
    coins
        .iter()
        .find(|c| c.denom == denom)
        .map(|c| c.amount)
        .unwrap_or_default()
}

/// True when no coin carries a non-zero amount.
pub fn coins_are_zero(coins: &[Coin]) -> bool {
    coins.iter().all(|c| c.amount.is_zero())
}

/// Validates a coin set: every denom well formed, every amount positive,
/// denoms strictly ascending (which also rules out duplicates).
///
/// An empty set is valid.
pub fn validate_coins(coins: &[Coin]) -> Result<(), ValidationError> {
    for (i, coin) in coins.iter().enumerate() {
        validate_denom(&coin.denom)?;
        if coin.amount.is_zero() {
            return Err(ValidationError::InvalidCoins(format!(
                "zero amount for {}",
                coin.denom
            )));
        }
        if i > 0 && coins[i - 1].denom >= coin.denom {
            return Err(ValidationError::InvalidCoins(format!(
                "denoms not sorted or duplicated at {}",
                coin.denom
            )));
        }
    }
    Ok(())
}

/// Denoms are 3 to 128 characters, start with a letter and continue with
/// alphanumerics or one of `/:._-`.
pub fn validate_denom(denom: &str) -> Result<(), ValidationError> {
    let bytes = denom.as_bytes();
    let well_formed = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || b"/:._-".contains(b));

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoins(format!("invalid denom: {denom:?}")))
    }
}
