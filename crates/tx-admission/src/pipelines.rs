//! # Pipeline Assembly
//!
//! Builds one immutable `Pipeline` per variant from a `PipelineConfig`.
//! Stage order is fixed here and nowhere else.

use crate::config::PipelineConfig;
use crate::domain::{AnteStage, AnteVariant, Pipeline};
use crate::evm::{EvmLimits, EvmMonoStage};
use crate::stages::extension::has_web3_extension;
use crate::stages::{
    CircuitBreakerStage, ConsumeTxSizeGas, CountTx, DeductFee, ExtensionOptionsStage, FeeMode,
    GasRegister, GasWanted, IncrementSequence, LegacyEip712SigVerification, LimitSimulationGas,
    MessageFirewall, MinGasPrice, RedundantRelay, SetPubKey, SetUpContext, SigGasConsume,
    SigVerification, TxContracts, TxTimeoutHeight, ValidateBasic, ValidateMemo, ValidateSigCount,
};

/// The pipelines a service dispatches to.
#[derive(Debug)]
pub struct PipelineSet {
    default: Pipeline,
    dynamic_fee: Pipeline,
    ethereum: Pipeline,
    legacy_eip712: Option<Pipeline>,
}

impl PipelineSet {
    pub fn build(config: &PipelineConfig) -> Self {
        Self {
            default: Pipeline::new(AnteVariant::Default, cosmos_stages(config, FeeMode::Static)),
            dynamic_fee: Pipeline::new(
                AnteVariant::DynamicFee,
                cosmos_stages(config, FeeMode::Dynamic),
            ),
            ethereum: Pipeline::new(AnteVariant::Ethereum, ethereum_stages(config)),
            legacy_eip712: config
                .params
                .enable_legacy_eip712
                .then(|| Pipeline::new(AnteVariant::LegacyEip712, legacy_stages(config))),
        }
    }

    /// Pipeline for `variant`; `None` only for a disabled legacy variant.
    pub fn get(&self, variant: AnteVariant) -> Option<&Pipeline> {
        match variant {
            AnteVariant::Default => Some(&self.default),
            AnteVariant::DynamicFee => Some(&self.dynamic_fee),
            AnteVariant::Ethereum => Some(&self.ethereum),
            AnteVariant::LegacyEip712 => self.legacy_eip712.as_ref(),
        }
    }
}

/// The twenty-stage Cosmos-style chain. The two Cosmos variants differ only
/// in how `MinGasPrice` derives its floor.
fn cosmos_stages(config: &PipelineConfig, fee_mode: FeeMode) -> Vec<Box<dyn AnteStage>> {
    let params = &config.params;

    let mut stages: Vec<Box<dyn AnteStage>> = vec![
        Box::new(SetUpContext::new(params.max_block_gas)),
        Box::new(MessageFirewall::new(params.disallowed_msg_types.clone(), true)),
        Box::new(LimitSimulationGas::new(
            params.simulation_gas_limit,
            params.max_block_gas,
        )),
        Box::new(CountTx::new(config.tx_counter.clone())),
        Box::new(GasRegister::new(config.contract_gas.clone())),
        Box::new(TxContracts),
        Box::new(CircuitBreakerStage::new(config.circuit.clone())),
        Box::new(ExtensionOptionsStage::new(config.extension_checker)),
        Box::new(ValidateBasic::new(params.max_tx_bytes)),
        Box::new(TxTimeoutHeight),
        Box::new(ValidateMemo::new(config.accounts.clone())),
        Box::new(MinGasPrice::new(
            fee_mode,
            params.fee_denom.clone(),
            params.min_gas_price,
            config.fee_market.clone(),
        )),
        Box::new(ConsumeTxSizeGas::new(config.accounts.clone())),
        Box::new(DeductFee::new(
            config.accounts.clone(),
            config.bank.clone(),
            config.fee_grants.clone(),
        )),
        Box::new(SetPubKey::new(config.accounts.clone())),
        Box::new(ValidateSigCount::new(config.accounts.clone())),
        Box::new(SigGasConsume::new(config.accounts.clone())),
        Box::new(SigVerification::new(
            config.accounts.clone(),
            config.sign_mode.clone(),
            params.chain_id.clone(),
        )),
        Box::new(IncrementSequence::new(config.accounts.clone())),
    ];

    if let Some(relay) = &config.relay {
        stages.push(Box::new(RedundantRelay::new(relay.clone())));
    }
    stages
}

fn ethereum_stages(config: &PipelineConfig) -> Vec<Box<dyn AnteStage>> {
    let limits = EvmLimits {
        local_min_gas_price: config.params.min_gas_price,
        max_tx_gas_wanted: config.params.max_tx_gas_wanted,
        max_block_gas: config.params.max_block_gas,
    };
    vec![Box::new(EvmMonoStage::new(
        config.evm.clone(),
        config.fee_market.clone(),
        limits,
    ))]
}

fn legacy_stages(config: &PipelineConfig) -> Vec<Box<dyn AnteStage>> {
    let params = &config.params;

    let mut stages: Vec<Box<dyn AnteStage>> = vec![
        Box::new(MessageFirewall::new(params.disallowed_msg_types.clone(), true)),
        Box::new(SetUpContext::new(params.max_block_gas)),
        Box::new(CircuitBreakerStage::new(config.circuit.clone())),
        Box::new(ExtensionOptionsStage::new(has_web3_extension)),
        Box::new(ValidateBasic::new(params.max_tx_bytes)),
        Box::new(TxTimeoutHeight),
        Box::new(MinGasPrice::new(
            FeeMode::GlobalMinimum,
            params.fee_denom.clone(),
            params.min_gas_price,
            config.fee_market.clone(),
        )),
        Box::new(ValidateMemo::new(config.accounts.clone())),
        Box::new(ConsumeTxSizeGas::new(config.accounts.clone())),
        Box::new(DeductFee::new(
            config.accounts.clone(),
            config.bank.clone(),
            config.fee_grants.clone(),
        )),
        Box::new(SetPubKey::new(config.accounts.clone())),
        Box::new(ValidateSigCount::new(config.accounts.clone())),
        Box::new(SigGasConsume::new(config.accounts.clone())),
        Box::new(LegacyEip712SigVerification::new(
            config.accounts.clone(),
            config.sign_mode.clone(),
            config.evm.clone(),
            params.chain_id.clone(),
        )),
        Box::new(IncrementSequence::new(config.accounts.clone())),
    ];

    if let Some(relay) = &config.relay {
        stages.push(Box::new(RedundantRelay::new(relay.clone())));
    }
    stages.push(Box::new(GasWanted::new(
        params.max_block_gas,
        config.fee_market.clone(),
    )));
    stages
}
