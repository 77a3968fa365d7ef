//! Simulation gas ceiling.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use shared_types::Transaction;

/// Bounds the otherwise infinite simulation meter by the simulation limit,
/// falling back to the block gas limit. Other modes pass through.
pub struct LimitSimulationGas {
    limit: Option<u64>,
}

impl LimitSimulationGas {
    pub fn new(simulation_gas_limit: Option<u64>, max_block_gas: Option<u64>) -> Self {
        Self {
            limit: simulation_gas_limit.or(max_block_gas),
        }
    }
}

impl AnteStage for LimitSimulationGas {
    fn name(&self) -> &'static str {
        "LimitSimulationGas"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        _tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        if !ctx.mode.is_simulate() {
            return Ok(ctx);
        }
        if let Some(limit) = self.limit {
            ctx.gas_meter.set_limit(limit, "simulation gas limit")?;
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use crate::domain::AdmissionMode;
    use crate::stages::testing::{ctx, send, tx_with};

    #[test]
    fn test_simulation_limited() {
        let store = MemoryStateStore::new();
        let out = LimitSimulationGas::new(Some(500), Some(1_000))
            .run(ctx(&store, 1, AdmissionMode::Simulate), &tx_with(vec![send(1)]))
            .unwrap();
        assert_eq!(out.gas_meter.limit(), 500);
    }

    #[test]
    fn test_falls_back_to_block_gas() {
        let store = MemoryStateStore::new();
        let out = LimitSimulationGas::new(None, Some(1_000))
            .run(ctx(&store, 1, AdmissionMode::Simulate), &tx_with(vec![send(1)]))
            .unwrap();
        assert_eq!(out.gas_meter.limit(), 1_000);
    }

    #[test]
    fn test_other_modes_untouched() {
        let store = MemoryStateStore::new();
        let out = LimitSimulationGas::new(Some(500), None)
            .run(ctx(&store, 1, AdmissionMode::Check), &tx_with(vec![send(1)]))
            .unwrap();
        assert!(out.gas_meter.is_infinite());
    }
}
