//! # Transaction Admission Pipeline
//!
//! Decides, for each incoming transaction, whether it may enter the mempool
//! or a block, charges its fee and bumps its signers' sequences. The decision
//! is made by an ordered, fail-fast chain of stages selected by the
//! transaction's first extension option.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): context, gas meter, branched state,
//!   classifier and the pipeline runner; no knowledge of concrete modules
//! - **Ports Layer** (`ports/`): the inbound `AdmissionApi` and the outbound
//!   keeper traits
//! - **Stages** (`stages/`, `evm/`): one type per admission check
//! - **Adapters Layer** (`adapters/`): in-memory keepers and state store
//! - **Service Layer** (`service.rs`): classification, dispatch and fault
//!   recovery
//!
//! ## Variants
//!
//! | Variant | Pipeline |
//! |---------|----------|
//! | `Default` | Cosmos chain, validator's static minimum gas price |
//! | `DynamicFee` | Cosmos chain, fee-market priced |
//! | `Ethereum` | single `EvmMonoStage` |
//! | `LegacyEip712` | deprecated typed-data signatures, off unless enabled |
//!
//! ## Guarantees
//!
//! - A rejected transaction leaves committed state untouched.
//! - A fault inside any stage or collaborator becomes `InternalFault`.
//! - The same transaction, state and mode always give the same outcome.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod evm;
pub mod pipelines;
pub mod ports;
pub mod service;
pub mod stages;

// Re-export public API
pub use config::{
    default_disallowed_msg_types, AdmissionConfig, PipelineConfig, PipelineConfigBuilder,
};
pub use domain::{
    AdmissionError, AdmissionMode, AnteStage, AnteVariant, BlockInfo, ChangeSet, Classifier,
    CommitStore, ConfigurationError, ErrorKind, Event, ExecutionContext, GasMeter, Pipeline,
    StateError, StateOverlay, StateStore,
};
pub use pipelines::PipelineSet;
pub use ports::{
    AccountKeeper, AdmissionApi, BankKeeper, CircuitBreaker, ContractGasHooks, EvmKeeper,
    FeeGrantKeeper, FeeMarketKeeper, RelayKeeper, SignModeHandler, TxCounterStore,
};
pub use service::{AdmissionService, TxReceipt};
