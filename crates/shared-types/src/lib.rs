//! # Shared Types Crate
//!
//! This crate contains the transaction model consumed by the admission
//! pipeline and by every state-machine collaborator behind it.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Transaction`, `Msg`, `Fee` and signer
//!   material are defined once, here.
//! - **Closed Message Set**: messages are a tagged enum. Filtering by message
//!   kind is a pattern match, never runtime type inspection.
//! - **Immutable Input**: a `Transaction` is never mutated once received;
//!   all derived data (hashes, sign bytes, signers) is computed on demand.

pub mod coins;
pub mod entities;
pub mod errors;
pub mod ethereum;
pub mod msgs;

pub use coins::*;
pub use entities::*;
pub use errors::*;
pub use ethereum::*;
pub use msgs::*;
