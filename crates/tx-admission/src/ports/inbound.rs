//! Inbound (Driving) port: the one operation the pipeline exposes.

use crate::domain::{AdmissionError, AdmissionMode, BlockInfo, ExecutionContext, StateStore};
use shared_types::Transaction;

/// Transaction admission API.
///
/// Implementations must be safe to call concurrently for unrelated
/// transactions; each call branches its own view of `state`.
pub trait AdmissionApi: Send + Sync {
    /// Classify `tx`, run the selected pipeline and return the updated
    /// context. Nothing is written to `state`; committing the context's
    /// change set is the caller's decision.
    fn admit<'a>(
        &self,
        state: &'a dyn StateStore,
        block: &BlockInfo,
        tx: &Transaction,
        mode: AdmissionMode,
    ) -> Result<ExecutionContext<'a>, AdmissionError>;
}
