//! Fee stages: price floor and priority, size gas, and fee deduction.

use crate::domain::crypto::SIGNATURE_LEN;
use crate::domain::{AdmissionError, AnteStage, Event, ExecutionContext};
use crate::ports::{AccountKeeper, BankKeeper, FeeGrantKeeper, FeeMarketKeeper};
use shared_types::{
    address_hex, amount_of, coins_are_zero, Coin, DynamicFeeExtension, Transaction,
    EXT_DYNAMIC_FEE, U256,
};
use std::sync::Arc;
use tracing::trace;

/// Compressed secp256k1 key length, used for simulated signer overhead.
const SIMULATED_PUBKEY_LEN: usize = 33;

/// How `MinGasPrice` derives its floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// Local minimum gas price, enforced only for tentative admission.
    Static,
    /// Base fee and global minimum from the fee market, with the local
    /// minimum as fallback while the market is disabled.
    Dynamic,
    /// Chain-wide minimum from the fee market only.
    GlobalMinimum,
}

/// Renders a coin list as `10aante,5uatom`, or `0` when empty.
pub(crate) fn format_coins(coins: &[Coin]) -> String {
    if coins.is_empty() {
        return "0".to_string();
    }
    coins
        .iter()
        .map(|c| format!("{}{}", c.amount, c.denom))
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn to_priority(value: U256) -> i64 {
    if value > U256::from(i64::MAX as u64) {
        i64::MAX
    } else {
        value.low_u64() as i64
    }
}

/// Lowest price per gas across the fee coins; zero for an empty fee.
fn fee_priority(fee: &[Coin], gas: u64) -> i64 {
    fee.iter()
        .map(|c| to_priority(c.amount / U256::from(gas.max(1))))
        .min()
        .unwrap_or(0)
}

/// Checks the offered fee against a price floor and assigns priority.
pub struct MinGasPrice {
    mode: FeeMode,
    fee_denom: String,
    local_min_gas_price: U256,
    fee_market: Arc<dyn FeeMarketKeeper>,
}

impl MinGasPrice {
    pub fn new(
        mode: FeeMode,
        fee_denom: impl Into<String>,
        local_min_gas_price: U256,
        fee_market: Arc<dyn FeeMarketKeeper>,
    ) -> Self {
        Self {
            mode,
            fee_denom: fee_denom.into(),
            local_min_gas_price,
            fee_market,
        }
    }

    fn require_total(
        &self,
        tx: &Transaction,
        price: U256,
        gas: u64,
    ) -> Result<(), AdmissionError> {
        if price.is_zero() {
            return Ok(());
        }
        let required = price.checked_mul(U256::from(gas)).ok_or_else(|| {
            AdmissionError::StructuralValidation("required fee overflows 256 bits".into())
        })?;
        if amount_of(&tx.fee().amount, &self.fee_denom) < required {
            return Err(AdmissionError::InsufficientFee {
                provided: format_coins(&tx.fee().amount),
                required: format!("{}{}", required, self.fee_denom),
            });
        }
        Ok(())
    }

    fn check_dynamic(
        &self,
        ctx: &ExecutionContext<'_>,
        tx: &Transaction,
        base_fee: U256,
        gas: u64,
    ) -> Result<i64, AdmissionError> {
        let fee_cap = amount_of(&tx.fee().amount, &self.fee_denom) / U256::from(gas.max(1));
        let global_min = self.fee_market.min_gas_price(&ctx.state)?;
        let mut floor = base_fee.max(global_min);
        if ctx.mode.is_check() {
            floor = floor.max(self.local_min_gas_price);
        }
        if fee_cap < floor {
            return Err(AdmissionError::InsufficientFee {
                provided: format!("{}{} per gas", fee_cap, self.fee_denom),
                required: format!("{}{} per gas", floor, self.fee_denom),
            });
        }

        let headroom = fee_cap - base_fee.min(fee_cap);
        let tip = match tx
            .extension_options()
            .iter()
            .find(|o| o.type_url == EXT_DYNAMIC_FEE)
        {
            Some(option) => option
                .decode::<DynamicFeeExtension>()?
                .max_priority_price
                .min(headroom),
            None => headroom,
        };
        Ok(to_priority(tip))
    }
}

impl AnteStage for MinGasPrice {
    fn name(&self) -> &'static str {
        "MinGasPrice"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let gas = tx.gas_limit();
        let static_priority = fee_priority(&tx.fee().amount, gas);

        ctx.priority = match self.mode {
            FeeMode::Static => {
                if ctx.mode.is_check() {
                    self.require_total(tx, self.local_min_gas_price, gas)?;
                }
                static_priority
            }
            FeeMode::Dynamic => {
                if ctx.mode.is_simulate() {
                    static_priority
                } else {
                    match self.fee_market.base_fee(&ctx.state)? {
                        Some(base_fee) => self.check_dynamic(&ctx, tx, base_fee, gas)?,
                        None => {
                            if ctx.mode.is_check() {
                                self.require_total(tx, self.local_min_gas_price, gas)?;
                            }
                            static_priority
                        }
                    }
                }
            }
            FeeMode::GlobalMinimum => {
                if !ctx.mode.is_simulate() {
                    let global_min = self.fee_market.min_gas_price(&ctx.state)?;
                    self.require_total(tx, global_min, gas)?;
                }
                static_priority
            }
        };

        trace!(priority = ctx.priority, mode = ?self.mode, "fee floor satisfied");
        Ok(ctx)
    }
}

/// Charges gas proportional to the encoded transaction size.
pub struct ConsumeTxSizeGas {
    accounts: Arc<dyn AccountKeeper>,
}

impl ConsumeTxSizeGas {
    pub fn new(accounts: Arc<dyn AccountKeeper>) -> Self {
        Self { accounts }
    }
}

impl AnteStage for ConsumeTxSizeGas {
    fn name(&self) -> &'static str {
        "ConsumeTxSizeGas"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let per_byte = self.accounts.params(&ctx.state)?.tx_size_cost_per_byte;
        let mut size = tx.to_bytes()?.len() as u64;

        if ctx.mode.is_simulate() {
            // Simulations may omit signatures; charge for what they will add.
            let present = tx.signatures.iter().filter(|s| !s.is_empty()).count();
            let missing = tx.signers().len().saturating_sub(present) as u64;
            size = size.saturating_add(missing * (SIGNATURE_LEN + SIMULATED_PUBKEY_LEN) as u64);
        }

        ctx.gas_meter
            .consume(size.saturating_mul(per_byte), "txSize")?;
        Ok(ctx)
    }
}

/// Moves the fee from the payer (or fee granter) to the fee collector.
pub struct DeductFee {
    accounts: Arc<dyn AccountKeeper>,
    bank: Arc<dyn BankKeeper>,
    fee_grants: Option<Arc<dyn FeeGrantKeeper>>,
}

impl DeductFee {
    pub fn new(
        accounts: Arc<dyn AccountKeeper>,
        bank: Arc<dyn BankKeeper>,
        fee_grants: Option<Arc<dyn FeeGrantKeeper>>,
    ) -> Self {
        Self {
            accounts,
            bank,
            fee_grants,
        }
    }
}

impl AnteStage for DeductFee {
    fn name(&self) -> &'static str {
        "DeductFee"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let fee = tx.fee();
        let payer = tx
            .fee_payer()
            .ok_or_else(|| AdmissionError::StructuralValidation("no fee payer".into()))?;

        let mut deduct_from = payer;
        if let Some(granter) = fee.granter.filter(|g| *g != payer) {
            let grants = self.fee_grants.as_ref().ok_or_else(|| {
                AdmissionError::StructuralValidation("fee grants are not enabled".into())
            })?;
            grants.use_granted_fees(&mut ctx.state, &granter, &payer, &fee.amount, tx.msgs())?;
            deduct_from = granter;
        }

        if self.accounts.get_account(&ctx.state, &deduct_from)?.is_none() {
            return Err(AdmissionError::AccountVerificationFailed(format!(
                "fee payer {} does not exist",
                address_hex(&deduct_from)
            )));
        }

        if !coins_are_zero(&fee.amount) {
            let collector = self.accounts.fee_collector();
            self.bank
                .send_coins(&mut ctx.state, &deduct_from, &collector, &fee.amount)?;
        }

        ctx.emit(
            Event::new("tx")
                .attr("fee", format_coins(&fee.amount))
                .attr("fee_payer", address_hex(&deduct_from)),
        );
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        FeeAllowance, MemoryAccountKeeper, MemoryBankKeeper, MemoryFeeGrantKeeper,
        MemoryFeeMarketKeeper, MemoryStateStore,
    };
    use crate::domain::{AdmissionMode, GasMeter};
    use crate::stages::testing::{ctx, send, tx_with};
    use shared_types::ExtensionOption;

    fn paying(fee: u64, gas: u64) -> Transaction {
        let mut tx = tx_with(vec![send(1)]);
        tx.auth_info.fee.amount = vec![Coin::new("aante", fee)];
        tx.auth_info.fee.gas_limit = gas;
        tx
    }

    fn min_gas(mode: FeeMode, local: u64) -> MinGasPrice {
        MinGasPrice::new(mode, "aante", U256::from(local), Arc::new(MemoryFeeMarketKeeper))
    }

    #[test]
    fn test_static_floor_only_in_check() {
        let store = MemoryStateStore::new();
        let stage = min_gas(FeeMode::Static, 10);
        let tx = paying(999, 100);

        let err = stage
            .run(ctx(&store, 1, AdmissionMode::Check), &tx)
            .unwrap_err();
        assert!(matches!(err, AdmissionError::InsufficientFee { .. }));
        assert!(stage.run(ctx(&store, 1, AdmissionMode::Deliver), &tx).is_ok());
    }

    #[test]
    fn test_static_priority_is_price() {
        let store = MemoryStateStore::new();
        let out = min_gas(FeeMode::Static, 0)
            .run(ctx(&store, 1, AdmissionMode::Check), &paying(5_000, 100))
            .unwrap();
        assert_eq!(out.priority, 50);
    }

    #[test]
    fn test_dynamic_floor_is_base_fee() {
        let store = MemoryStateStore::new();
        store
            .seed(|s| {
                MemoryFeeMarketKeeper
                    .set_base_fee(s, Some(U256::from(20u64)))
            })
            .unwrap();
        let stage = min_gas(FeeMode::Dynamic, 0);

        let err = stage
            .run(ctx(&store, 1, AdmissionMode::Deliver), &paying(1_900, 100))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::InsufficientFee { .. }));

        let out = stage
            .run(ctx(&store, 1, AdmissionMode::Deliver), &paying(3_000, 100))
            .unwrap();
        assert_eq!(out.priority, 10);
    }

    #[test]
    fn test_dynamic_tip_capped_by_extension() {
        let store = MemoryStateStore::new();
        store
            .seed(|s| {
                MemoryFeeMarketKeeper
                    .set_base_fee(s, Some(U256::from(20u64)))
            })
            .unwrap();
        let mut tx = paying(3_000, 100);
        tx.body.extension_options = vec![ExtensionOption::encode(
            EXT_DYNAMIC_FEE,
            &DynamicFeeExtension {
                max_priority_price: U256::from(3u64),
            },
        )
        .unwrap()];

        let out = min_gas(FeeMode::Dynamic, 0)
            .run(ctx(&store, 1, AdmissionMode::Check), &tx)
            .unwrap();
        assert_eq!(out.priority, 3);
    }

    #[test]
    fn test_size_gas_charged() {
        let store = MemoryStateStore::new();
        let tx = paying(0, 1_000_000);
        let mut context = ctx(&store, 1, AdmissionMode::Deliver);
        context.gas_meter = GasMeter::new(1_000_000);

        let out = ConsumeTxSizeGas::new(Arc::new(MemoryAccountKeeper::new()))
            .run(context, &tx)
            .unwrap();
        assert_eq!(out.gas_meter.consumed(), tx.to_bytes().unwrap().len() as u64 * 10);
    }

    #[test]
    fn test_size_gas_out_of_gas() {
        let store = MemoryStateStore::new();
        let mut context = ctx(&store, 1, AdmissionMode::Deliver);
        context.gas_meter = GasMeter::new(10);
        let err = ConsumeTxSizeGas::new(Arc::new(MemoryAccountKeeper::new()))
            .run(context, &paying(0, 10))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::GasExceeded { .. }));
    }

    fn deduct_fee(grants: bool) -> DeductFee {
        DeductFee::new(
            Arc::new(MemoryAccountKeeper::new()),
            Arc::new(MemoryBankKeeper),
            grants.then(|| Arc::new(MemoryFeeGrantKeeper) as Arc<dyn FeeGrantKeeper>),
        )
    }

    fn fund(store: &MemoryStateStore, address: [u8; 20], amount: u64) {
        store
            .seed(|s| {
                MemoryAccountKeeper::new().new_account(s, &address)?;
                MemoryBankKeeper.set_balance(s, &address, &Coin::new("aante", amount))
            })
            .unwrap();
    }

    #[test]
    fn test_fee_moves_to_collector() {
        let store = MemoryStateStore::new();
        fund(&store, [1; 20], 1_000);

        let out = deduct_fee(false)
            .run(ctx(&store, 1, AdmissionMode::Deliver), &paying(300, 100))
            .unwrap();
        let collector = MemoryAccountKeeper::new().fee_collector();
        assert_eq!(
            MemoryBankKeeper.balance(&out.state, &[1; 20], "aante").unwrap(),
            U256::from(700u64)
        );
        assert_eq!(
            MemoryBankKeeper.balance(&out.state, &collector, "aante").unwrap(),
            U256::from(300u64)
        );
        assert_eq!(out.events[0].get("fee"), Some("300aante"));
    }

    #[test]
    fn test_missing_payer_account_rejected() {
        let store = MemoryStateStore::new();
        let err = deduct_fee(false)
            .run(ctx(&store, 1, AdmissionMode::Deliver), &paying(300, 100))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::AccountVerificationFailed(_)));
    }

    #[test]
    fn test_insufficient_balance_rejected() {
        let store = MemoryStateStore::new();
        fund(&store, [1; 20], 10);
        let err = deduct_fee(false)
            .run(ctx(&store, 1, AdmissionMode::Deliver), &paying(300, 100))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::InsufficientFunds(_)));
    }

    #[test]
    fn test_granter_pays_when_grants_enabled() {
        let store = MemoryStateStore::new();
        fund(&store, [1; 20], 0);
        fund(&store, [9; 20], 1_000);
        store
            .seed(|s| {
                MemoryFeeGrantKeeper
                    .grant(s, &[9; 20], &[1; 20], &FeeAllowance::default())
            })
            .unwrap();
        let mut tx = paying(300, 100);
        tx.auth_info.fee.granter = Some([9; 20]);

        let err = deduct_fee(false)
            .run(ctx(&store, 1, AdmissionMode::Deliver), &tx)
            .unwrap_err();
        assert!(matches!(err, AdmissionError::StructuralValidation(_)));

        let out = deduct_fee(true)
            .run(ctx(&store, 1, AdmissionMode::Deliver), &tx)
            .unwrap();
        assert_eq!(
            MemoryBankKeeper.balance(&out.state, &[9; 20], "aante").unwrap(),
            U256::from(700u64)
        );
    }
}
