//! # Ethereum Payloads
//!
//! An Ethereum-style transaction embedded in a `Msg::EthereumTx`. The
//! transaction wrapper around it carries no signer infos; authentication
//! comes entirely from the recoverable `(v, r, s)` signature here.

use crate::entities::{Address, Hash, U256, ZERO_ADDRESS};
use crate::errors::{EncodingError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};

/// Base cost of any transaction.
pub const TX_GAS: u64 = 21_000;
/// Base cost of a contract-creating transaction.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
pub const TX_DATA_ZERO_GAS: u64 = 4;
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Dynamic-fee transaction fields plus signature.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthTxData {
    /// `None` for unprotected (pre-EIP-155) transactions.
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_fee_cap: U256,
    pub gas_tip_cap: U256,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    #[serde_as(as = "Bytes")]
    pub input: Vec<u8>,
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    chain_id: Option<u64>,
    nonce: u64,
    gas_limit: u64,
    gas_fee_cap: &'a U256,
    gas_tip_cap: &'a U256,
    to: &'a Option<Address>,
    value: &'a U256,
    input: &'a [u8],
}

impl EthTxData {
    /// Digest the sender signs: everything except the signature itself.
    pub fn signing_hash(&self) -> Result<Hash, EncodingError> {
        let payload = SigningPayload {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            gas_fee_cap: &self.gas_fee_cap,
            gas_tip_cap: &self.gas_tip_cap,
            to: &self.to,
            value: &self.value,
            input: &self.input,
        };
        Ok(keccak256(&bincode::serialize(&payload)?))
    }

    /// Content-derived identifier of the signed transaction.
    pub fn tx_hash(&self) -> Result<Hash, EncodingError> {
        Ok(keccak256(&bincode::serialize(self)?))
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Upper bound on the fee: `gas_fee_cap * gas_limit`.
    pub fn max_fee(&self) -> Option<U256> {
        self.gas_fee_cap.checked_mul(U256::from(self.gas_limit))
    }

    /// `value + max_fee`, the amount the sender must hold.
    pub fn max_cost(&self) -> Option<U256> {
        self.max_fee()?.checked_add(self.value)
    }

    /// Price per gas actually paid under `base_fee`.
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match base_fee {
            Some(base) => base
                .saturating_add(self.gas_tip_cap)
                .min(self.gas_fee_cap),
            None => self.gas_fee_cap,
        }
    }

    /// Portion of the price above the base fee, used as priority.
    pub fn effective_tip(&self, base_fee: Option<U256>) -> U256 {
        match base_fee {
            Some(base) => self
                .gas_tip_cap
                .min(self.gas_fee_cap.saturating_sub(base)),
            None => self.gas_fee_cap,
        }
    }

    /// Gas charged before any execution: base cost plus calldata.
    pub fn intrinsic_gas(&self) -> Option<u64> {
        let base = if self.is_contract_creation() {
            TX_GAS_CONTRACT_CREATION
        } else {
            TX_GAS
        };
        let zeros = self.input.iter().filter(|b| **b == 0).count() as u64;
        let non_zeros = self.input.len() as u64 - zeros;
        base.checked_add(zeros.checked_mul(TX_DATA_ZERO_GAS)?)?
            .checked_add(non_zeros.checked_mul(TX_DATA_NON_ZERO_GAS)?)
    }
}

/// The Ethereum message: claimed sender plus signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEthereumTx {
    pub from: Address,
    pub data: EthTxData,
}

impl MsgEthereumTx {
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.from == ZERO_ADDRESS {
            return Err(ValidationError::EmptyAddress("from"));
        }
        if self.data.gas_limit == 0 {
            return Err(ValidationError::InvalidField {
                field: "gas_limit",
                reason: "must be positive".into(),
            });
        }
        if self.data.gas_tip_cap > self.data.gas_fee_cap {
            return Err(ValidationError::InvalidField {
                field: "gas_tip_cap",
                reason: "exceeds gas_fee_cap".into(),
            });
        }
        if self.data.max_cost().is_none() {
            return Err(ValidationError::InvalidField {
                field: "gas_fee_cap",
                reason: "cost overflows 256 bits".into(),
            });
        }
        if self.data.r == [0u8; 32] || self.data.s == [0u8; 32] {
            return Err(ValidationError::InvalidField {
                field: "signature",
                reason: "missing r or s".into(),
            });
        }
        Ok(())
    }
}
