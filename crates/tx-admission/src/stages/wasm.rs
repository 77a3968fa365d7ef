//! Smart-contract support stages: transaction counter, gas register table
//! and the set of contracts a transaction touches.

use super::walk_msgs;
use crate::domain::{AdmissionError, AnteStage, ExecutionContext, TxCounterRecord};
use crate::ports::{ContractGasHooks, TxCounterStore};
use shared_types::Transaction;
use std::sync::Arc;

/// Numbers transactions within a block. The counter restarts at zero on the
/// first transaction seen at a new height.
pub struct CountTx {
    store: Arc<dyn TxCounterStore>,
}

impl CountTx {
    pub fn new(store: Arc<dyn TxCounterStore>) -> Self {
        Self { store }
    }
}

impl AnteStage for CountTx {
    fn name(&self) -> &'static str {
        "CountTx"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        _tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        if ctx.mode.is_simulate() {
            return Ok(ctx);
        }

        let height = ctx.height();
        let counter = match self.store.load(&ctx.state)? {
            Some(record) if record.height == height => record.counter.saturating_add(1),
            _ => 0,
        };
        self.store
            .store(&mut ctx.state, TxCounterRecord { height, counter })?;
        ctx.tx_counter = Some(counter);
        Ok(ctx)
    }
}

/// Installs the contract gas register table.
pub struct GasRegister {
    hooks: Arc<dyn ContractGasHooks>,
}

impl GasRegister {
    pub fn new(hooks: Arc<dyn ContractGasHooks>) -> Self {
        Self { hooks }
    }
}

impl AnteStage for GasRegister {
    fn name(&self) -> &'static str {
        "GasRegister"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        _tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        ctx.gas_register = Some(self.hooks.gas_register());
        Ok(ctx)
    }
}

/// Records every contract targeted by the transaction, nested ones included.
#[derive(Default)]
pub struct TxContracts;

impl AnteStage for TxContracts {
    fn name(&self) -> &'static str {
        "TxContracts"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let mut contracts = Vec::new();
        walk_msgs(tx.msgs(), &mut |msg| {
            if let Some(contract) = msg.contract_address() {
                if !contracts.contains(&contract) {
                    contracts.push(contract);
                }
            }
            Ok(())
        })?;
        ctx.tx_contracts = contracts;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStateStore, MemoryTxCounterStore, StaticContractGasHooks};
    use crate::domain::{AdmissionMode, CommitStore, GasRegisterTable};
    use crate::stages::testing::{ctx, send, tx_with};
    use shared_types::Msg;

    fn run_count(store: &MemoryStateStore, height: u64) -> Option<u32> {
        let out = CountTx::new(Arc::new(MemoryTxCounterStore))
            .run(ctx(store, height, AdmissionMode::Deliver), &tx_with(vec![send(1)]))
            .unwrap();
        let counter = out.tx_counter;
        store.apply(out.into_changeset()).unwrap();
        counter
    }

    #[test]
    fn test_counter_increments_within_block_and_resets() {
        let store = MemoryStateStore::new();
        assert_eq!(run_count(&store, 3), Some(0));
        assert_eq!(run_count(&store, 3), Some(1));
        assert_eq!(run_count(&store, 3), Some(2));
        assert_eq!(run_count(&store, 4), Some(0));
    }

    #[test]
    fn test_counter_skipped_in_simulation() {
        let store = MemoryStateStore::new();
        let out = CountTx::new(Arc::new(MemoryTxCounterStore))
            .run(ctx(&store, 3, AdmissionMode::Simulate), &tx_with(vec![send(1)]))
            .unwrap();
        assert_eq!(out.tx_counter, None);
        assert_eq!(out.state.pending_writes(), 0);
    }

    #[test]
    fn test_gas_register_installed() {
        let store = MemoryStateStore::new();
        let table = GasRegisterTable {
            instance_cost: 1,
            ..Default::default()
        };
        let out = GasRegister::new(Arc::new(StaticContractGasHooks(table)))
            .run(ctx(&store, 1, AdmissionMode::Check), &tx_with(vec![send(1)]))
            .unwrap();
        assert_eq!(out.gas_register, Some(table));
    }

    #[test]
    fn test_contracts_collected_through_authz() {
        let store = MemoryStateStore::new();
        let exec = |contract: u8| Msg::ExecuteContract {
            sender: [1; 20],
            contract: [contract; 20],
            msg: b"{}".to_vec(),
            funds: vec![],
        };
        let wrapped = Msg::AuthzExec {
            grantee: [2; 20],
            msgs: vec![exec(8), exec(7)],
        };
        let out = TxContracts
            .run(
                ctx(&store, 1, AdmissionMode::Check),
                &tx_with(vec![exec(7), wrapped]),
            )
            .unwrap();
        assert_eq!(out.tx_contracts, vec![[7; 20], [8; 20]]);
    }
}
