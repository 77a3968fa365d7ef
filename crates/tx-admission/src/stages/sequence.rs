//! Replay protection.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use crate::ports::AccountKeeper;
use shared_types::{address_hex, Transaction};
use std::sync::Arc;

/// Bumps every signer's sequence by one.
pub struct IncrementSequence {
    accounts: Arc<dyn AccountKeeper>,
}

impl IncrementSequence {
    pub fn new(accounts: Arc<dyn AccountKeeper>) -> Self {
        Self { accounts }
    }
}

impl AnteStage for IncrementSequence {
    fn name(&self) -> &'static str {
        "IncrementSequence"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        for signer in tx.signers() {
            let mut account = self
                .accounts
                .get_account(&ctx.state, &signer)?
                .ok_or_else(|| {
                    AdmissionError::AccountVerificationFailed(format!(
                        "account {} does not exist",
                        address_hex(&signer)
                    ))
                })?;
            account.sequence = account.sequence.checked_add(1).ok_or_else(|| {
                AdmissionError::AccountVerificationFailed("sequence overflow".into())
            })?;
            self.accounts.set_account(&mut ctx.state, &account)?;
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryAccountKeeper, MemoryStateStore};
    use crate::domain::AdmissionMode;
    use crate::stages::testing::{ctx, send, tx_with};

    #[test]
    fn test_each_signer_incremented_once() {
        let store = MemoryStateStore::new();
        let keeper = MemoryAccountKeeper::new();
        store
            .seed(|s| {
                keeper.new_account(s, &[1; 20])?;
                keeper.new_account(s, &[2; 20])?;
                Ok(())
            })
            .unwrap();

        // Signer 1 appears twice but is de-duplicated.
        let tx = tx_with(vec![send(1), send(2), send(1)]);
        let out = IncrementSequence::new(Arc::new(keeper.clone()))
            .run(ctx(&store, 1, AdmissionMode::Deliver), &tx)
            .unwrap();
        for address in [[1; 20], [2; 20]] {
            let account = keeper.get_account(&out.state, &address).unwrap().unwrap();
            assert_eq!(account.sequence, 1);
        }
    }
}
