//! Ethereum-style transaction admission.

pub mod mono;

pub use mono::{EvmLimits, EvmMonoStage};
