//! # Core Transaction Entities
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `U256`
//! - **Keys & Signers**: `PublicKey`, `SignMode`, `SignerInfo`
//! - **Transaction**: `TxBody`, `AuthInfo`, `Fee`, `ExtensionOption`, `Transaction`
//! - **Signing payloads**: `SignDoc` (direct mode), `StdSignDoc` (legacy JSON mode)

use crate::coins::Coin;
use crate::errors::EncodingError;
use crate::msgs::Msg;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: PRIMITIVES
// =============================================================================

/// A 32-byte hash (SHA-256 or Keccak-256).
pub type Hash = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// The all-zero address, treated as "unset" wherever an address is optional.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Lower-case hex rendering used in logs, events and error messages.
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

// =============================================================================
// CLUSTER B: KEYS & SIGNERS
// =============================================================================

/// Curve flavour of a public key; selects the digest the signature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// secp256k1 over SHA-256 of the sign bytes.
    Secp256k1,
    /// secp256k1 over Keccak-256 of the sign bytes (Ethereum-compatible keys).
    EthSecp256k1,
}

/// A compressed (33-byte) secp256k1 public key.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    pub algorithm: KeyAlgorithm,
    #[serde_as(as = "Bytes")]
    pub bytes: Vec<u8>,
}

impl PublicKey {
    pub fn secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            algorithm: KeyAlgorithm::Secp256k1,
            bytes,
        }
    }

    pub fn eth_secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            algorithm: KeyAlgorithm::EthSecp256k1,
            bytes,
        }
    }
}

/// How the bytes a signer signed are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SignMode {
    /// Canonical binary `SignDoc`.
    #[default]
    Direct,
    /// JSON `StdSignDoc`, used by wallets that sign human-readable payloads.
    LegacyAminoJson,
}

/// Per-signer authentication metadata, positionally matched with
/// `Transaction::signers()` and `Transaction::signatures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// May be omitted when the account already has a key on chain.
    pub public_key: Option<PublicKey>,
    pub mode: SignMode,
    pub sequence: u64,
}

// =============================================================================
// CLUSTER C: TRANSACTION
// =============================================================================

/// Type identifier of the Ethereum transaction extension option.
pub const EXT_ETHEREUM_TX: &str = "/cosmos.evm.vm.v1.ExtensionOptionsEthereumTx";

/// Type identifier of the dynamic-fee extension option.
pub const EXT_DYNAMIC_FEE: &str = "/cosmos.evm.types.v1.ExtensionOptionDynamicFeeTx";

/// Type identifier of the legacy EIP-712 (web3) extension option.
pub const EXT_WEB3_TX: &str = "/cosmos.evm.types.v1.ExtensionOptionsWeb3Tx";

/// A tagged, opaque payload that signals a non-default processing variant.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionOption {
    pub type_url: String,
    #[serde_as(as = "Bytes")]
    pub value: Vec<u8>,
}

impl ExtensionOption {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }

    /// Decodes the payload as `T`.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, EncodingError> {
        Ok(bincode::deserialize(&self.value)?)
    }

    /// Encodes `payload` into an option of the given type.
    pub fn encode<T: Serialize>(type_url: &str, payload: &T) -> Result<Self, EncodingError> {
        Ok(Self::new(type_url, bincode::serialize(payload)?))
    }
}

/// Payload of the dynamic-fee extension option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DynamicFeeExtension {
    /// Maximum tip per gas the sender pays on top of the base fee.
    pub max_priority_price: U256,
}

/// Payload of the legacy EIP-712 extension option.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Web3Extension {
    /// EVM chain id the typed data was signed for.
    pub typed_data_chain_id: u64,
    pub fee_payer: Address,
    /// 65-byte `r || s || v` signature by the fee payer.
    #[serde_as(as = "Bytes")]
    pub fee_payer_sig: Vec<u8>,
}

/// Fee declaration: what is paid, how much gas is bought, and by whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
    /// Pays the fee instead of the first signer when set.
    pub payer: Option<Address>,
    /// Covers the fee through a fee grant when set.
    pub granter: Option<Address>,
}

/// The signed-over body of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxBody {
    pub msgs: Vec<Msg>,
    pub memo: String,
    /// Zero means no timeout.
    pub timeout_height: u64,
    pub extension_options: Vec<ExtensionOption>,
}

/// Authentication data: signer metadata and the fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

/// A transaction as received by the node. Immutable once received.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Transaction {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    #[serde_as(as = "Vec<Bytes>")]
    pub signatures: Vec<Vec<u8>>,
}

impl Transaction {
    pub fn msgs(&self) -> &[Msg] {
        &self.body.msgs
    }

    pub fn fee(&self) -> &Fee {
        &self.auth_info.fee
    }

    pub fn gas_limit(&self) -> u64 {
        self.auth_info.fee.gas_limit
    }

    pub fn extension_options(&self) -> &[ExtensionOption] {
        &self.body.extension_options
    }

    /// Ordered, de-duplicated signers of all messages, followed by the
    /// explicit fee payer when it is not already one of them.
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = Vec::new();
        let payer = self.auth_info.fee.payer;
        for signer in self.body.msgs.iter().flat_map(Msg::signers).chain(payer) {
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        signers
    }

    /// The explicit payer, else the first signer.
    pub fn fee_payer(&self) -> Option<Address> {
        self.auth_info
            .fee
            .payer
            .or_else(|| self.signers().first().copied())
    }

    /// Canonical binary encoding of the whole transaction.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn body_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(bincode::serialize(&self.body)?)
    }

    pub fn auth_info_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(bincode::serialize(&self.auth_info)?)
    }

    /// SHA-256 of the canonical encoding.
    pub fn hash(&self) -> Result<Hash, EncodingError> {
        Ok(sha256(&self.to_bytes()?))
    }
}

// =============================================================================
// CLUSTER D: SIGNING PAYLOADS
// =============================================================================

/// Direct-mode signing payload.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDoc {
    #[serde_as(as = "Bytes")]
    pub body_bytes: Vec<u8>,
    #[serde_as(as = "Bytes")]
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

impl SignDoc {
    pub fn new(tx: &Transaction, chain_id: &str, account_number: u64) -> Result<Self, EncodingError> {
        Ok(Self {
            body_bytes: tx.body_bytes()?,
            auth_info_bytes: tx.auth_info_bytes()?,
            chain_id: chain_id.to_string(),
            account_number,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(bincode::serialize(self)?)
    }
}

/// Legacy JSON signing payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub account_number: u64,
    pub chain_id: String,
    pub fee: Fee,
    pub memo: String,
    pub msgs: Vec<Msg>,
    pub sequence: u64,
    pub timeout_height: u64,
}

impl StdSignDoc {
    pub fn new(tx: &Transaction, chain_id: &str, account_number: u64, sequence: u64) -> Self {
        Self {
            account_number,
            chain_id: chain_id.to_string(),
            fee: tx.auth_info.fee.clone(),
            memo: tx.body.memo.clone(),
            msgs: tx.body.msgs.clone(),
            sequence,
            timeout_height: tx.body.timeout_height,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(serde_json::to_vec(self)?)
    }
}
