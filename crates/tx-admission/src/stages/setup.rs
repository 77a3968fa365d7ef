//! Context setup: installs the transaction's gas meter.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext, GasMeter};
use shared_types::Transaction;

/// Installs a meter limited to the declared gas. Simulations and genesis
/// transactions get an infinite meter.
pub struct SetUpContext {
    max_block_gas: Option<u64>,
}

impl SetUpContext {
    pub fn new(max_block_gas: Option<u64>) -> Self {
        Self { max_block_gas }
    }
}

impl AnteStage for SetUpContext {
    fn name(&self) -> &'static str {
        "SetUpContext"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let gas_limit = tx.gas_limit();

        if ctx.mode.is_simulate() || ctx.is_genesis() {
            ctx.gas_meter = GasMeter::infinite();
        } else {
            if gas_limit == 0 {
                return Err(AdmissionError::StructuralValidation(
                    "gas limit must be positive".into(),
                ));
            }
            ctx.gas_meter = GasMeter::new(gas_limit);
        }

        if let Some(max) = self.max_block_gas {
            if gas_limit > max {
                return Err(AdmissionError::GasExceeded {
                    descriptor: "block gas limit".into(),
                    requested: gas_limit,
                    limit: max,
                });
            }
        }

        ctx.gas_wanted = gas_limit;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use crate::domain::AdmissionMode;
    use crate::stages::testing::{ctx, send, tx_with};

    fn tx(gas: u64) -> Transaction {
        let mut tx = tx_with(vec![send(1)]);
        tx.auth_info.fee.gas_limit = gas;
        tx
    }

    #[test]
    fn test_meter_limited_to_declared_gas() {
        let store = MemoryStateStore::new();
        let out = SetUpContext::new(None)
            .run(ctx(&store, 5, AdmissionMode::Deliver), &tx(100_000))
            .unwrap();
        assert_eq!(out.gas_meter.limit(), 100_000);
        assert_eq!(out.gas_wanted, 100_000);
    }

    #[test]
    fn test_simulation_and_genesis_are_infinite() {
        let store = MemoryStateStore::new();
        let stage = SetUpContext::new(None);
        let sim = stage
            .run(ctx(&store, 5, AdmissionMode::Simulate), &tx(0))
            .unwrap();
        assert!(sim.gas_meter.is_infinite());

        let genesis = stage
            .run(ctx(&store, 0, AdmissionMode::Deliver), &tx(0))
            .unwrap();
        assert!(genesis.gas_meter.is_infinite());
    }

    #[test]
    fn test_zero_gas_rejected() {
        let store = MemoryStateStore::new();
        let err = SetUpContext::new(None)
            .run(ctx(&store, 5, AdmissionMode::Check), &tx(0))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::StructuralValidation(_)));
    }

    #[test]
    fn test_over_block_gas_rejected() {
        let store = MemoryStateStore::new();
        let err = SetUpContext::new(Some(1_000))
            .run(ctx(&store, 5, AdmissionMode::Check), &tx(1_001))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::GasExceeded { limit: 1_000, .. }));
    }
}
