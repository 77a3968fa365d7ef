//! # Domain Layer
//!
//! Pipeline mechanics with no knowledge of concrete collaborators.
//! This is the inner layer of the hexagonal architecture.

pub mod classifier;
pub mod context;
pub mod crypto;
pub mod entities;
pub mod errors;
pub mod gas;
pub mod pipeline;
pub mod stage;
pub mod state;

pub use classifier::{AnteVariant, Classifier};
pub use context::{AdmissionMode, BlockInfo, Event, ExecutionContext};
pub use entities::{AuthParams, BaseAccount, EvmAccount, EvmParams, SignerData, TxCounterRecord};
pub use errors::{AdmissionError, ConfigurationError, ErrorKind, StateError};
pub use gas::{GasMeter, GasRegisterTable};
pub use pipeline::Pipeline;
pub use stage::AnteStage;
pub use state::{ChangeSet, CommitStore, StateOverlay, StateStore};
