//! Extension-option screening for the Cosmos-style pipelines.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use shared_types::{ExtensionOption, Transaction, EXT_DYNAMIC_FEE, EXT_WEB3_TX};

/// Predicate deciding whether an extension option may ride along.
pub type ExtensionOptionChecker = fn(&ExtensionOption) -> bool;

/// Accepts only the dynamic-fee option.
pub fn has_dynamic_fee_extension(option: &ExtensionOption) -> bool {
    option.type_url == EXT_DYNAMIC_FEE
}

/// Accepts only the legacy EIP-712 option.
pub fn has_web3_extension(option: &ExtensionOption) -> bool {
    option.type_url == EXT_WEB3_TX
}

/// Rejects a transaction carrying any option the checker refuses.
pub struct ExtensionOptionsStage {
    checker: ExtensionOptionChecker,
}

impl ExtensionOptionsStage {
    pub fn new(checker: ExtensionOptionChecker) -> Self {
        Self { checker }
    }
}

impl AnteStage for ExtensionOptionsStage {
    fn name(&self) -> &'static str {
        "ExtensionOptions"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        if let Some(option) = tx.extension_options().iter().find(|o| !(self.checker)(o)) {
            return Err(AdmissionError::UnsupportedExtension(option.type_url.clone()));
        }
        Ok(ctx)
    }
}
