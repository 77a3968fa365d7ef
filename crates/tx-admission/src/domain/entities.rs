//! # Collaborator Records
//!
//! Plain records exchanged with the external modules behind the outbound
//! ports. They are stored bincode-encoded in the branched state view.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, PublicKey, U256};

/// An account registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    pub address: Address,
    pub account_number: u64,
    pub sequence: u64,
    pub pub_key: Option<PublicKey>,
}

/// Authentication parameters owned by the account registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    pub max_memo_characters: u64,
    pub tx_sig_limit: u64,
    pub tx_size_cost_per_byte: u64,
    pub sig_verify_cost_secp256k1: u64,
    pub sig_verify_cost_eth_secp256k1: u64,
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            max_memo_characters: 256,
            tx_sig_limit: 7,
            tx_size_cost_per_byte: 10,
            sig_verify_cost_secp256k1: 1_000,
            sig_verify_cost_eth_secp256k1: 21_000,
        }
    }
}

/// Everything a sign-mode handler needs besides the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub address: Address,
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Last stored value of the per-block transaction counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCounterRecord {
    pub height: u64,
    pub counter: u32,
}

/// Ethereum view of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmAccount {
    pub nonce: u64,
    pub balance: U256,
    /// `None` for externally owned accounts.
    pub code_hash: Option<Hash>,
}

impl EvmAccount {
    pub fn is_contract(&self) -> bool {
        self.code_hash.is_some()
    }
}

/// Static parameters of the embedded Ethereum engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmParams {
    pub chain_id: u64,
    pub evm_denom: String,
    pub allow_unprotected_txs: bool,
}
