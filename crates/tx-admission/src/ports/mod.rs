//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: `AdmissionApi`, used by the mempool and block applier
//! - **Outbound (Driven)**: capabilities of the external state-machine modules

pub mod inbound;
pub mod outbound;

pub use inbound::AdmissionApi;
pub use outbound::{
    AccountKeeper, BankKeeper, CircuitBreaker, ContractGasHooks, EvmKeeper, FeeGrantKeeper,
    FeeMarketKeeper, RelayKeeper, SignModeHandler, TxCounterStore,
};
