//! # Ethereum Mono-Stage
//!
//! Every check the Cosmos-style pipeline spreads over twenty stages, done
//! in one pass per Ethereum payload. The sub-steps share the sender account,
//! the base fee and the running gas-wanted total, so they run as one stage.
//!
//! ## Sub-step order (per payload)
//!
//! 1. Local minimum effective gas price (check modes)
//! 2. Global minimum gas price (all modes except simulate)
//! 3. Payload validation and chain id
//! 4. Sender recovery
//! 5. Sender account: must not be a contract
//! 6. Transfer eligibility: balance covers value plus maximum fee
//! 7. Intrinsic gas, fee deduction, gas wanted
//! 8. Nonce check and increment (last)
//!
//! After all payloads: block gas ceiling, fee-market gas total, events.

use crate::domain::crypto::recover_address;
use crate::domain::{
    AdmissionError, AdmissionMode, AnteStage, EvmAccount, EvmParams, Event, ExecutionContext,
    GasMeter,
};
use crate::ports::{EvmKeeper, FeeMarketKeeper};
use crate::stages::fee::to_priority;
use shared_types::{address_hex, Coin, Msg, MsgEthereumTx, Transaction, U256};
use std::sync::Arc;
use tracing::trace;

/// Parameters of the mono-stage taken from the admission configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvmLimits {
    /// This validator's minimum effective gas price in check modes.
    pub local_min_gas_price: U256,
    /// Per-payload gas-wanted cap in check mode (0 = none).
    pub max_tx_gas_wanted: u64,
    pub max_block_gas: Option<u64>,
}

pub struct EvmMonoStage {
    evm: Arc<dyn EvmKeeper>,
    fee_market: Arc<dyn FeeMarketKeeper>,
    limits: EvmLimits,
}

impl EvmMonoStage {
    pub fn new(
        evm: Arc<dyn EvmKeeper>,
        fee_market: Arc<dyn FeeMarketKeeper>,
        limits: EvmLimits,
    ) -> Self {
        Self {
            evm,
            fee_market,
            limits,
        }
    }
}

/// Collects the Ethereum payloads and checks the wrapper carries nothing
/// else: no memo, timeout, Cosmos signatures or fee overrides, and a fee
/// equal to the summed payload maximums.
fn unwrap_payloads<'t>(
    tx: &'t Transaction,
    params: &EvmParams,
) -> Result<Vec<&'t MsgEthereumTx>, AdmissionError> {
    let structural = |reason: &str| Err(AdmissionError::StructuralValidation(reason.to_string()));

    if tx.msgs().is_empty() {
        return structural("ethereum transaction has no payloads");
    }
    let mut payloads = Vec::with_capacity(tx.msgs().len());
    for msg in tx.msgs() {
        match msg {
            Msg::EthereumTx(payload) => payloads.push(payload),
            other => {
                return Err(AdmissionError::disallowed(
                    other.type_url(),
                    "only ethereum payloads may use the ethereum extension option",
                ))
            }
        }
    }

    if !tx.body.memo.is_empty() {
        return structural("ethereum transactions cannot carry a memo");
    }
    if tx.body.timeout_height != 0 {
        return structural("ethereum transactions cannot set a timeout height");
    }
    if !tx.auth_info.signer_infos.is_empty() || !tx.signatures.is_empty() {
        return structural("ethereum transactions carry signatures in their payloads");
    }
    if tx.fee().payer.is_some() || tx.fee().granter.is_some() {
        return structural("ethereum transactions cannot set a fee payer or granter");
    }

    let mut total_fee = U256::zero();
    let mut total_gas = 0u64;
    for payload in &payloads {
        let fee = payload.data.max_fee().ok_or_else(|| {
            AdmissionError::StructuralValidation("payload fee overflows 256 bits".into())
        })?;
        total_fee = total_fee.checked_add(fee).ok_or_else(|| {
            AdmissionError::StructuralValidation("total fee overflows 256 bits".into())
        })?;
        total_gas = total_gas.checked_add(payload.data.gas_limit).ok_or_else(|| {
            AdmissionError::StructuralValidation("total gas overflows 64 bits".into())
        })?;
    }

    let expected_fee = if total_fee.is_zero() {
        vec![]
    } else {
        vec![Coin::new(params.evm_denom.clone(), total_fee)]
    };
    if tx.fee().amount != expected_fee {
        return structural("wrapper fee does not match the payloads");
    }
    if tx.gas_limit() != total_gas {
        return structural("wrapper gas limit does not match the payloads");
    }
    Ok(payloads)
}

impl AnteStage for EvmMonoStage {
    fn name(&self) -> &'static str {
        "EvmMonoStage"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        ctx.gas_meter = GasMeter::infinite();

        let params = self.evm.params();
        let payloads = unwrap_payloads(tx, &params)?;
        let base_fee = self.fee_market.base_fee(&ctx.state)?;
        let global_min = self.fee_market.min_gas_price(&ctx.state)?;

        let mut gas_wanted = 0u64;
        let mut priority = i64::MAX;
        let mut tx_hashes = Vec::with_capacity(payloads.len());

        for payload in payloads {
            let data = &payload.data;
            let effective_price = data.effective_gas_price(base_fee);

            if ctx.mode.is_check() && effective_price < self.limits.local_min_gas_price {
                return Err(AdmissionError::InsufficientFee {
                    provided: format!("{}{} per gas", effective_price, params.evm_denom),
                    required: format!(
                        "{}{} per gas",
                        self.limits.local_min_gas_price, params.evm_denom
                    ),
                });
            }
            if !ctx.mode.is_simulate() && effective_price < global_min {
                return Err(AdmissionError::InsufficientFee {
                    provided: format!("{}{} per gas", effective_price, params.evm_denom),
                    required: format!("{}{} per gas", global_min, params.evm_denom),
                });
            }

            payload.validate_basic()?;
            match data.chain_id {
                Some(chain_id) if chain_id != params.chain_id => {
                    return Err(AdmissionError::StructuralValidation(format!(
                        "chain id {chain_id} does not match {}",
                        params.chain_id
                    )))
                }
                None if !params.allow_unprotected_txs => {
                    return Err(AdmissionError::StructuralValidation(
                        "unprotected transactions are not allowed".into(),
                    ))
                }
                _ => {}
            }

            let sender = recover_address(&data.signing_hash()?, &data.r, &data.s, data.v)?;
            if sender != payload.from {
                return Err(AdmissionError::SignatureInvalid(format!(
                    "recovered sender {} does not match {}",
                    address_hex(&sender),
                    address_hex(&payload.from)
                )));
            }

            let account = self
                .evm
                .get_account(&ctx.state, &sender)?
                .unwrap_or(EvmAccount {
                    nonce: 0,
                    balance: U256::zero(),
                    code_hash: None,
                });
            if account.is_contract() {
                return Err(AdmissionError::AccountVerificationFailed(format!(
                    "sender {} is a contract",
                    address_hex(&sender)
                )));
            }

            if let Some(base) = base_fee {
                if data.gas_fee_cap < base {
                    return Err(AdmissionError::InsufficientFee {
                        provided: format!("{}{} per gas", data.gas_fee_cap, params.evm_denom),
                        required: format!("{}{} per gas", base, params.evm_denom),
                    });
                }
            }
            let cost = data.max_cost().ok_or_else(|| {
                AdmissionError::StructuralValidation("cost overflows 256 bits".into())
            })?;
            if account.balance < cost {
                return Err(AdmissionError::TransferNotEligible {
                    balance: account.balance,
                    cost,
                });
            }

            let intrinsic = data.intrinsic_gas().ok_or_else(|| {
                AdmissionError::StructuralValidation("intrinsic gas overflows 64 bits".into())
            })?;
            if data.gas_limit < intrinsic {
                return Err(AdmissionError::GasExceeded {
                    descriptor: "intrinsic gas".into(),
                    requested: intrinsic,
                    limit: data.gas_limit,
                });
            }
            let fee = effective_price
                .checked_mul(U256::from(data.gas_limit))
                .ok_or_else(|| {
                    AdmissionError::StructuralValidation("fee overflows 256 bits".into())
                })?;
            self.evm.deduct_fee(&mut ctx.state, &sender, fee)?;

            let contribution = if ctx.mode == AdmissionMode::Check
                && self.limits.max_tx_gas_wanted > 0
            {
                data.gas_limit.min(self.limits.max_tx_gas_wanted)
            } else {
                data.gas_limit
            };
            gas_wanted = gas_wanted.saturating_add(contribution);
            priority = priority.min(to_priority(data.effective_tip(base_fee)));

            if data.nonce != account.nonce {
                return Err(AdmissionError::SequenceMismatch {
                    address: sender,
                    expected: account.nonce,
                    got: data.nonce,
                });
            }
            let next = account.nonce.checked_add(1).ok_or_else(|| {
                AdmissionError::AccountVerificationFailed("nonce overflow".into())
            })?;
            self.evm.set_nonce(&mut ctx.state, &sender, next)?;

            tx_hashes.push(data.tx_hash()?);
        }

        if let Some(max) = self.limits.max_block_gas {
            if gas_wanted > max {
                return Err(AdmissionError::GasExceeded {
                    descriptor: "block gas limit".into(),
                    requested: gas_wanted,
                    limit: max,
                });
            }
        }
        if base_fee.is_some() {
            self.fee_market
                .add_transient_gas_wanted(&mut ctx.state, gas_wanted)?;
        }

        ctx.gas_meter.set_limit(gas_wanted, "ethereum gas wanted")?;
        ctx.gas_wanted = gas_wanted;
        ctx.priority = priority;

        let first_index = ctx.block.tx_index;
        for (offset, hash) in tx_hashes.iter().enumerate() {
            ctx.emit(
                Event::new("ethereum_tx")
                    .attr("ethereumTxHash", format!("0x{}", hex::encode(hash)))
                    .attr("txIndex", (first_index + offset as u64).to_string()),
            );
        }

        trace!(gas_wanted, priority, payloads = tx_hashes.len(), "ethereum transaction admitted");
        Ok(ctx)
    }
}
