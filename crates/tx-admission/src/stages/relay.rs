//! Redundant relay filter.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use crate::ports::RelayKeeper;
use shared_types::Transaction;
use std::sync::Arc;
use tracing::debug;

/// Rejects, during tentative admission, a transaction whose packet messages
/// have all been processed already. Block execution is not filtered: a
/// redundant relay there is harmless and must not fail the block.
pub struct RedundantRelay {
    relay: Arc<dyn RelayKeeper>,
}

impl RedundantRelay {
    pub fn new(relay: Arc<dyn RelayKeeper>) -> Self {
        Self { relay }
    }
}

impl AnteStage for RedundantRelay {
    fn name(&self) -> &'static str {
        "RedundantRelay"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        if !ctx.mode.is_check() {
            return Ok(ctx);
        }

        let mut packets = 0usize;
        let mut redundant = 0usize;
        for msg in tx.msgs().iter().filter(|m| m.relay_packet().is_some()) {
            packets += 1;
            if self.relay.is_processed(&ctx.state, msg)? {
                redundant += 1;
            }
        }

        if packets > 0 && redundant == packets {
            debug!(packets, "all packet messages already relayed");
            return Err(AdmissionError::RedundantRelay);
        }
        Ok(ctx)
    }
}
