//! Stateless structural checks: shape, timeout height and memo.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use crate::ports::AccountKeeper;
use shared_types::{validate_coins, Transaction};
use std::sync::Arc;

/// Message validity, signature/signer arity, fee coin shape and encoded size.
/// Skipped on re-check: a pooled transaction's shape cannot change.
pub struct ValidateBasic {
    max_tx_bytes: usize,
}

impl ValidateBasic {
    pub fn new(max_tx_bytes: usize) -> Self {
        Self { max_tx_bytes }
    }
}

impl AnteStage for ValidateBasic {
    fn name(&self) -> &'static str {
        "ValidateBasic"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        if ctx.mode.is_recheck() {
            return Ok(ctx);
        }

        if tx.msgs().is_empty() {
            return Err(AdmissionError::StructuralValidation(
                "transaction has no messages".into(),
            ));
        }
        for msg in tx.msgs() {
            msg.validate_basic()?;
        }

        if tx.signatures.is_empty() {
            return Err(AdmissionError::StructuralValidation("no signatures".into()));
        }
        let signers = tx.signers();
        if tx.signatures.len() != signers.len() {
            return Err(AdmissionError::StructuralValidation(format!(
                "wrong number of signatures: expected {}, got {}",
                signers.len(),
                tx.signatures.len()
            )));
        }
        if tx.auth_info.signer_infos.len() != signers.len() {
            return Err(AdmissionError::StructuralValidation(format!(
                "wrong number of signer infos: expected {}, got {}",
                signers.len(),
                tx.auth_info.signer_infos.len()
            )));
        }

        validate_coins(&tx.fee().amount)?;

        let size = tx.to_bytes()?.len();
        if size > self.max_tx_bytes {
            return Err(AdmissionError::StructuralValidation(format!(
                "transaction is {size} bytes, limit {}",
                self.max_tx_bytes
            )));
        }
        Ok(ctx)
    }
}

/// Rejects transactions whose timeout height has passed.
#[derive(Default)]
pub struct TxTimeoutHeight;

impl AnteStage for TxTimeoutHeight {
    fn name(&self) -> &'static str {
        "TxTimeoutHeight"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let timeout = tx.body.timeout_height;
        if timeout > 0 && ctx.height() > timeout {
            return Err(AdmissionError::StructuralValidation(format!(
                "transaction timed out at height {timeout}, current height {}",
                ctx.height()
            )));
        }
        Ok(ctx)
    }
}

/// Enforces the account registry's memo length limit.
pub struct ValidateMemo {
    accounts: Arc<dyn AccountKeeper>,
}

impl ValidateMemo {
    pub fn new(accounts: Arc<dyn AccountKeeper>) -> Self {
        Self { accounts }
    }
}

impl AnteStage for ValidateMemo {
    fn name(&self) -> &'static str {
        "ValidateMemo"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let max = self.accounts.params(&ctx.state)?.max_memo_characters;
        let len = tx.body.memo.chars().count() as u64;
        if len > max {
            return Err(AdmissionError::StructuralValidation(format!(
                "memo has {len} characters, limit {max}"
            )));
        }
        Ok(ctx)
    }
}
