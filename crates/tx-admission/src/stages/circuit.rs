//! On-chain circuit breaker check.

use super::walk_msgs;
use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use crate::ports::CircuitBreaker;
use shared_types::Transaction;
use std::sync::Arc;

/// Rejects a transaction if any message type, nested ones included, is
/// currently tripped in the circuit breaker.
pub struct CircuitBreakerStage {
    circuit: Arc<dyn CircuitBreaker>,
}

impl CircuitBreakerStage {
    pub fn new(circuit: Arc<dyn CircuitBreaker>) -> Self {
        Self { circuit }
    }
}

impl AnteStage for CircuitBreakerStage {
    fn name(&self) -> &'static str {
        "CircuitBreaker"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        walk_msgs(tx.msgs(), &mut |msg| {
            if self.circuit.is_allowed(&ctx.state, msg.type_url())? {
                Ok(())
            } else {
                Err(AdmissionError::disallowed(msg.type_url(), "tx type not allowed"))
            }
        })?;
        Ok(ctx)
    }
}
