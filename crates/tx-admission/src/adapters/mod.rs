//! # Adapters Layer
//!
//! In-memory implementations of the outbound ports, all storing their data
//! in the branched state view so rejected transactions leave no trace.
//! Used by the node in single-process mode and by the test suites.

pub mod auth;
pub mod bank;
pub mod chain;
pub mod evm;
pub mod store;

pub use auth::{module_address, DefaultSignModeHandler, MemoryAccountKeeper};
pub use bank::{FeeAllowance, MemoryBankKeeper, MemoryFeeGrantKeeper};
pub use chain::{MemoryCircuitBreaker, MemoryRelayKeeper, MemoryTxCounterStore, StaticContractGasHooks};
pub use evm::{MemoryEvmKeeper, MemoryFeeMarketKeeper};
pub use store::MemoryStateStore;
