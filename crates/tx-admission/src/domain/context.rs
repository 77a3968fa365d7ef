//! # Execution Context
//!
//! Per-invocation state threaded through every stage. A stage takes the
//! context by value and hands back the updated one, so a rejected
//! transaction's context (and its branched state) is simply dropped.

use super::gas::{GasMeter, GasRegisterTable};
use super::state::{ChangeSet, StateOverlay};
use shared_types::{Address, PublicKey};
use std::collections::BTreeMap;

/// Which kind of invocation is running. Only ceilings and idempotence checks
/// depend on the mode; stage order never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionMode {
    /// First tentative check on mempool entry.
    Check,
    /// Re-check of a pooled transaction after a new block.
    ReCheck,
    /// Dry run for gas estimation; signatures are not verified.
    Simulate,
    /// Authoritative block application.
    Deliver,
}

impl AdmissionMode {
    /// Tentative mempool admission (check or re-check).
    pub fn is_check(&self) -> bool {
        matches!(self, AdmissionMode::Check | AdmissionMode::ReCheck)
    }

    pub fn is_recheck(&self) -> bool {
        matches!(self, AdmissionMode::ReCheck)
    }

    pub fn is_simulate(&self) -> bool {
        matches!(self, AdmissionMode::Simulate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionMode::Check => "check",
            AdmissionMode::ReCheck => "recheck",
            AdmissionMode::Simulate => "simulate",
            AdmissionMode::Deliver => "deliver",
        }
    }
}

/// Block-level facts supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub height: u64,
    pub chain_id: String,
    /// Position of the transaction within its block.
    pub tx_index: u64,
}

impl BlockInfo {
    pub fn new(height: u64, chain_id: impl Into<String>) -> Self {
        Self {
            height,
            chain_id: chain_id.into(),
            tx_index: 0,
        }
    }

    pub fn with_tx_index(mut self, tx_index: u64) -> Self {
        self.tx_index = tx_index;
        self
    }
}

/// A typed event emitted during admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Mutable state of one pipeline invocation.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    pub block: BlockInfo,
    pub mode: AdmissionMode,
    pub gas_meter: GasMeter,
    pub events: Vec<Event>,
    /// Public keys resolved for signers in this invocation.
    pub pubkeys: BTreeMap<Address, PublicKey>,
    pub state: StateOverlay<'a>,
    /// Mempool priority; higher is better.
    pub priority: i64,
    /// Gas requested by the transaction.
    pub gas_wanted: u64,
    /// Index of this transaction among those seen at the current height.
    pub tx_counter: Option<u32>,
    pub gas_register: Option<GasRegisterTable>,
    /// Contracts the transaction's messages target.
    pub tx_contracts: Vec<Address>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(block: BlockInfo, mode: AdmissionMode, state: StateOverlay<'a>) -> Self {
        Self {
            block,
            mode,
            gas_meter: GasMeter::infinite(),
            events: Vec::new(),
            pubkeys: BTreeMap::new(),
            state,
            priority: 0,
            gas_wanted: 0,
            tx_counter: None,
            gas_register: None,
            tx_contracts: Vec::new(),
        }
    }

    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub fn is_genesis(&self) -> bool {
        self.block.height == 0
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Consumes the context, returning the writes to commit.
    pub fn into_changeset(self) -> ChangeSet {
        self.state.into_changeset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::StateError;
    use crate::domain::state::StateStore;

    struct Empty;

    impl StateStore for Empty {
        fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
            Ok(None)
        }
    }

    #[test]
    fn test_mode_flags() {
        assert!(AdmissionMode::Check.is_check());
        assert!(AdmissionMode::ReCheck.is_check());
        assert!(!AdmissionMode::Deliver.is_check());
        assert!(!AdmissionMode::Simulate.is_check());
        assert!(AdmissionMode::Simulate.is_simulate());
    }

    #[test]
    fn test_new_context_starts_clean() {
        let base = Empty;
        let ctx = ExecutionContext::new(
            BlockInfo::new(5, "ante_9000-1"),
            AdmissionMode::Deliver,
            StateOverlay::new(&base),
        );
        assert_eq!(ctx.height(), 5);
        assert!(ctx.gas_meter.is_infinite());
        assert!(ctx.events.is_empty());
        assert!(ctx.into_changeset().is_empty());
    }

    #[test]
    fn test_event_attributes() {
        let event = Event::new("tx").attr("fee", "10utoken");
        assert_eq!(event.get("fee"), Some("10utoken"));
        assert_eq!(event.get("payer"), None);
    }
}
