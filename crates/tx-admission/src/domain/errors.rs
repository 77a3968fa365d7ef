//! # Admission Errors
//!
//! Every per-transaction rejection is an `AdmissionError`. All kinds except
//! `ConfigurationError` are ordinary results reported back to the mempool or
//! block applier; none of them may crash the node.

use shared_types::{address_hex, Address, EncodingError, ValidationError, U256};
use thiserror::Error;

/// Failure of the branched state view or of a value stored in it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("State backend error: {0}")]
    Backend(String),

    #[error("Corrupted state value under key {key}: {reason}")]
    Codec { key: String, reason: String },
}

/// Terminal rejection of a transaction by the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// Extension option type identifier not in the routing table, or a
    /// non-first option rejected by the extension-option predicate.
    #[error("Unsupported extension option: {0}")]
    UnsupportedExtension(String),

    /// Message type blocked by the firewall or the circuit breaker.
    #[error("Message type {type_url} is not allowed: {reason}")]
    DisallowedMessageType { type_url: String, reason: String },

    /// Malformed fee, memo, size, timeout or message content.
    #[error("Invalid transaction: {0}")]
    StructuralValidation(String),

    #[error("Insufficient fee: got {provided}, required {required}")]
    InsufficientFee { provided: String, required: String },

    /// The fee payer (or fee grant) cannot cover the fee.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("Account sequence mismatch for {}: expected {expected}, got {got}", address_hex(.address))]
    SequenceMismatch {
        address: Address,
        expected: u64,
        got: u64,
    },

    #[error("Account verification failed: {0}")]
    AccountVerificationFailed(String),

    /// Ethereum sender cannot afford value plus fee.
    #[error("Insufficient balance for transfer: balance {balance}, cost {cost}")]
    TransferNotEligible { balance: U256, cost: U256 },

    /// Gas meter over its limit, or gas wanted over a declared ceiling.
    #[error("Out of gas in {descriptor}: requested {requested}, limit {limit}")]
    GasExceeded {
        descriptor: String,
        requested: u64,
        limit: u64,
    },

    #[error("Redundant relay: all packet messages were already processed")]
    RedundantRelay,

    #[error(transparent)]
    State(#[from] StateError),

    /// An unexpected fault recovered at the pipeline boundary.
    #[error("Internal fault during admission: {0}")]
    InternalFault(String),
}

/// Stable, label-friendly classification of an `AdmissionError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedExtension,
    DisallowedMessageType,
    StructuralValidation,
    InsufficientFee,
    InsufficientFunds,
    SignatureInvalid,
    SequenceMismatch,
    AccountVerificationFailed,
    TransferNotEligible,
    GasExceeded,
    RedundantRelay,
    State,
    InternalFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedExtension => "unsupported_extension",
            ErrorKind::DisallowedMessageType => "disallowed_message_type",
            ErrorKind::StructuralValidation => "structural_validation",
            ErrorKind::InsufficientFee => "insufficient_fee",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::SignatureInvalid => "signature_invalid",
            ErrorKind::SequenceMismatch => "sequence_mismatch",
            ErrorKind::AccountVerificationFailed => "account_verification_failed",
            ErrorKind::TransferNotEligible => "transfer_not_eligible",
            ErrorKind::GasExceeded => "gas_exceeded",
            ErrorKind::RedundantRelay => "redundant_relay",
            ErrorKind::State => "state",
            ErrorKind::InternalFault => "internal_fault",
        }
    }
}

impl AdmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdmissionError::UnsupportedExtension(_) => ErrorKind::UnsupportedExtension,
            AdmissionError::DisallowedMessageType { .. } => ErrorKind::DisallowedMessageType,
            AdmissionError::StructuralValidation(_) => ErrorKind::StructuralValidation,
            AdmissionError::InsufficientFee { .. } => ErrorKind::InsufficientFee,
            AdmissionError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            AdmissionError::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
            AdmissionError::SequenceMismatch { .. } => ErrorKind::SequenceMismatch,
            AdmissionError::AccountVerificationFailed(_) => ErrorKind::AccountVerificationFailed,
            AdmissionError::TransferNotEligible { .. } => ErrorKind::TransferNotEligible,
            AdmissionError::GasExceeded { .. } => ErrorKind::GasExceeded,
            AdmissionError::RedundantRelay => ErrorKind::RedundantRelay,
            AdmissionError::State(_) => ErrorKind::State,
            AdmissionError::InternalFault(_) => ErrorKind::InternalFault,
        }
    }

    pub(crate) fn disallowed(type_url: &str, reason: impl Into<String>) -> Self {
        AdmissionError::DisallowedMessageType {
            type_url: type_url.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ValidationError> for AdmissionError {
    fn from(err: ValidationError) -> Self {
        AdmissionError::StructuralValidation(err.to_string())
    }
}

impl From<EncodingError> for AdmissionError {
    fn from(err: EncodingError) -> Self {
        AdmissionError::StructuralValidation(err.to_string())
    }
}

/// Fatal startup error: the pipeline cannot be built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Invalid admission parameter: {0}")]
    InvalidParameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_stable() {
        let err = AdmissionError::InsufficientFee {
            provided: "1utoken".into(),
            required: "2utoken".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientFee);
        assert_eq!(err.kind().as_str(), "insufficient_fee");
    }

    #[test]
    fn test_state_error_converts() {
        let err: AdmissionError = StateError::Backend("closed".into()).into();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_sequence_mismatch_renders_hex_address() {
        let err = AdmissionError::SequenceMismatch {
            address: [0xaa; 20],
            expected: 3,
            got: 1,
        };
        assert!(err.to_string().contains("0xaaaa"));
    }

    #[test]
    fn test_validation_error_is_structural() {
        let err: AdmissionError = ValidationError::EmptyAddress("from").into();
        assert_eq!(err.kind(), ErrorKind::StructuralValidation);
    }
}
