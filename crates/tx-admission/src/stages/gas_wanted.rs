//! Block gas-wanted accounting for the legacy pipeline.

use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use crate::ports::FeeMarketKeeper;
use shared_types::Transaction;
use std::sync::Arc;

/// Checks the declared gas against the block limit and adds it to the
/// fee market's running total while the market is enabled.
pub struct GasWanted {
    max_block_gas: Option<u64>,
    fee_market: Arc<dyn FeeMarketKeeper>,
}

impl GasWanted {
    pub fn new(max_block_gas: Option<u64>, fee_market: Arc<dyn FeeMarketKeeper>) -> Self {
        Self {
            max_block_gas,
            fee_market,
        }
    }
}

impl AnteStage for GasWanted {
    fn name(&self) -> &'static str {
        "GasWanted"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let gas_wanted = tx.gas_limit();
        if let Some(max) = self.max_block_gas {
            if gas_wanted > max {
                return Err(AdmissionError::GasExceeded {
                    descriptor: "block gas limit".into(),
                    requested: gas_wanted,
                    limit: max,
                });
            }
        }

        if self.fee_market.base_fee(&ctx.state)?.is_some() {
            self.fee_market
                .add_transient_gas_wanted(&mut ctx.state, gas_wanted)?;
        }
        ctx.gas_wanted = gas_wanted;
        Ok(ctx)
    }
}
