//! # Cosmos-style Stages
//!
//! One module per concern, one struct per stage. Stages hold only the
//! collaborator handles and parameters they need, cloned out of the
//! `PipelineConfig` when pipelines are assembled.

pub mod circuit;
pub mod extension;
pub mod fee;
pub mod firewall;
pub mod gas_wanted;
pub mod relay;
pub mod sequence;
pub mod setup;
pub mod sigs;
pub mod simulation;
pub mod validate;
pub mod wasm;

pub use circuit::CircuitBreakerStage;
pub use extension::ExtensionOptionsStage;
pub use fee::{ConsumeTxSizeGas, DeductFee, FeeMode, MinGasPrice};
pub use firewall::MessageFirewall;
pub use gas_wanted::GasWanted;
pub use relay::RedundantRelay;
pub use sequence::IncrementSequence;
pub use setup::SetUpContext;
pub use sigs::{LegacyEip712SigVerification, SetPubKey, SigGasConsume, SigVerification, ValidateSigCount};
pub use simulation::LimitSimulationGas;
pub use validate::{TxTimeoutHeight, ValidateBasic, ValidateMemo};
pub use wasm::{CountTx, GasRegister, TxContracts};

use crate::domain::AdmissionError;
use shared_types::{Msg, MAX_MSG_NESTING};

/// Visit every message, descending into authorization executions.
pub(crate) fn walk_msgs<F>(msgs: &[Msg], visit: &mut F) -> Result<(), AdmissionError>
where
    F: FnMut(&Msg) -> Result<(), AdmissionError>,
{
    walk_at_depth(msgs, 0, visit)
}

fn walk_at_depth<F>(msgs: &[Msg], depth: usize, visit: &mut F) -> Result<(), AdmissionError>
where
    F: FnMut(&Msg) -> Result<(), AdmissionError>,
{
    if depth > MAX_MSG_NESTING {
        return Err(AdmissionError::StructuralValidation(format!(
            "messages nested deeper than {MAX_MSG_NESTING}"
        )));
    }
    for msg in msgs {
        visit(msg)?;
        walk_at_depth(msg.nested(), depth + 1, visit)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the stage unit tests.

    use crate::adapters::MemoryStateStore;
    use crate::domain::{AdmissionMode, BlockInfo, ExecutionContext, StateOverlay};
    use shared_types::{Coin, Msg, Transaction, TxBody};

    pub fn send(from: u8) -> Msg {
        Msg::Send {
            from: [from; 20],
            to: [0xEE; 20],
            amount: vec![Coin::new("aante", 1u64)],
        }
    }

    pub fn tx_with(msgs: Vec<Msg>) -> Transaction {
        Transaction {
            body: TxBody {
                msgs,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn ctx(store: &MemoryStateStore, height: u64, mode: AdmissionMode) -> ExecutionContext<'_> {
        ExecutionContext::new(
            BlockInfo::new(height, "ante_9000-1"),
            mode,
            StateOverlay::new(store),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::send;

    #[test]
    fn test_walk_visits_nested_messages() {
        let msgs = vec![Msg::AuthzExec {
            grantee: [9; 20],
            msgs: vec![send(1), send(2)],
        }];
        let mut seen = 0;
        walk_msgs(&msgs, &mut |_| {
            seen += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_walk_bounds_depth() {
        let mut msg = send(1);
        for _ in 0..=MAX_MSG_NESTING {
            msg = Msg::AuthzExec {
                grantee: [9; 20],
                msgs: vec![msg],
            };
        }
        assert!(walk_msgs(&[msg], &mut |_| Ok(())).is_err());
    }
}
