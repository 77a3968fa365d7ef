//! # Pipeline Configuration
//!
//! Two halves, both immutable once the service is built:
//!
//! - `AdmissionConfig`: numeric and behavioural parameters, loadable from the
//!   environment or any serde source.
//! - `PipelineConfig`: those parameters plus every collaborator handle.
//!   Built through `PipelineConfigBuilder`, which refuses to produce a
//!   configuration with a required handle missing.

use crate::domain::ConfigurationError;
use crate::ports::{
    AccountKeeper, BankKeeper, CircuitBreaker, ContractGasHooks, EvmKeeper, FeeGrantKeeper,
    FeeMarketKeeper, RelayKeeper, SignModeHandler, TxCounterStore,
};
use crate::stages::extension::{has_dynamic_fee_extension, ExtensionOptionChecker};
use serde::{Deserialize, Serialize};
use shared_types::{type_urls, validate_denom, U256};
use std::env;
use std::sync::Arc;

/// Numeric and behavioural admission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Cosmos chain id every signature must commit to. Signature stages
    /// use this value, never the chain id a caller reports in `BlockInfo`.
    pub chain_id: String,
    /// Denomination fees are paid in.
    pub fee_denom: String,
    /// This validator's minimum gas price for tentative admission.
    pub min_gas_price: U256,
    /// Per-transaction gas-wanted ceiling in check mode (0 = unlimited).
    pub max_tx_gas_wanted: u64,
    /// Gas ceiling for simulations; falls back to `max_block_gas`.
    pub simulation_gas_limit: Option<u64>,
    /// Consensus block gas limit, when one is set.
    pub max_block_gas: Option<u64>,
    /// Maximum encoded transaction size.
    pub max_tx_bytes: usize,
    /// Route the legacy EIP-712 extension option instead of rejecting it.
    pub enable_legacy_eip712: bool,
    /// Message type identifiers rejected outright by the firewall.
    pub disallowed_msg_types: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            chain_id: "ante_9000-1".to_string(),
            fee_denom: "aante".to_string(),
            min_gas_price: U256::zero(),
            max_tx_gas_wanted: 0,
            simulation_gas_limit: None,
            max_block_gas: None,
            max_tx_bytes: 1024 * 1024,
            enable_legacy_eip712: false,
            disallowed_msg_types: default_disallowed_msg_types(),
        }
    }
}

/// The canonical disallow-list: account-vesting creation messages.
pub fn default_disallowed_msg_types() -> Vec<String> {
    vec![
        type_urls::MSG_CREATE_VESTING_ACCOUNT.to_string(),
        type_urls::MSG_CREATE_PERIODIC_VESTING_ACCOUNT.to_string(),
        type_urls::MSG_CREATE_PERMANENT_LOCKED_ACCOUNT.to_string(),
    ]
}

impl AdmissionConfig {
    /// Configuration for tests: small block gas, everything else default.
    pub fn for_testing() -> Self {
        Self {
            chain_id: "ante_9000-1".to_string(),
            max_block_gas: Some(30_000_000),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ADMISSION_CHAIN_ID` (default: ante_9000-1)
    /// - `ADMISSION_FEE_DENOM` (default: aante)
    /// - `ADMISSION_MIN_GAS_PRICE`: decimal integer (default: 0)
    /// - `ADMISSION_MAX_TX_GAS_WANTED` (default: 0, unlimited)
    /// - `ADMISSION_SIMULATION_GAS_LIMIT` (default: unset)
    /// - `ADMISSION_MAX_BLOCK_GAS` (default: unset)
    /// - `ADMISSION_MAX_TX_BYTES` (default: 1048576)
    /// - `ADMISSION_ENABLE_LEGACY_EIP712` (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            chain_id: env::var("ADMISSION_CHAIN_ID").unwrap_or(defaults.chain_id),

            fee_denom: env::var("ADMISSION_FEE_DENOM").unwrap_or(defaults.fee_denom),

            min_gas_price: env::var("ADMISSION_MIN_GAS_PRICE")
                .ok()
                .and_then(|v| U256::from_dec_str(&v).ok())
                .unwrap_or(defaults.min_gas_price),

            max_tx_gas_wanted: env::var("ADMISSION_MAX_TX_GAS_WANTED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tx_gas_wanted),

            simulation_gas_limit: env::var("ADMISSION_SIMULATION_GAS_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok()),

            max_block_gas: env::var("ADMISSION_MAX_BLOCK_GAS")
                .ok()
                .and_then(|v| v.parse().ok()),

            max_tx_bytes: env::var("ADMISSION_MAX_TX_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tx_bytes),

            enable_legacy_eip712: env::var("ADMISSION_ENABLE_LEGACY_EIP712")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            disallowed_msg_types: defaults.disallowed_msg_types,
        }
    }

    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.chain_id.is_empty() {
            return Err(ConfigurationError::InvalidParameter("chain_id is empty".into()));
        }
        validate_denom(&self.fee_denom)
            .map_err(|e| ConfigurationError::InvalidParameter(e.to_string()))?;
        if self.max_tx_bytes == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "max_tx_bytes must be positive".into(),
            ));
        }
        if self.max_block_gas == Some(0) {
            return Err(ConfigurationError::InvalidParameter(
                "max_block_gas must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

/// Immutable bundle of parameters and collaborator handles.
#[derive(Clone)]
pub struct PipelineConfig {
    pub params: AdmissionConfig,
    pub accounts: Arc<dyn AccountKeeper>,
    pub bank: Arc<dyn BankKeeper>,
    pub sign_mode: Arc<dyn SignModeHandler>,
    pub contract_gas: Arc<dyn ContractGasHooks>,
    pub tx_counter: Arc<dyn TxCounterStore>,
    pub circuit: Arc<dyn CircuitBreaker>,
    pub fee_market: Arc<dyn FeeMarketKeeper>,
    pub evm: Arc<dyn EvmKeeper>,
    pub fee_grants: Option<Arc<dyn FeeGrantKeeper>>,
    pub relay: Option<Arc<dyn RelayKeeper>>,
    pub extension_checker: ExtensionOptionChecker,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("params", &self.params)
            .field("fee_grants", &self.fee_grants.is_some())
            .field("relay", &self.relay.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineConfig {
    pub fn builder(params: AdmissionConfig) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(params)
    }
}

/// Collects collaborator handles; `build` fails on the first missing one.
pub struct PipelineConfigBuilder {
    params: AdmissionConfig,
    accounts: Option<Arc<dyn AccountKeeper>>,
    bank: Option<Arc<dyn BankKeeper>>,
    sign_mode: Option<Arc<dyn SignModeHandler>>,
    contract_gas: Option<Arc<dyn ContractGasHooks>>,
    tx_counter: Option<Arc<dyn TxCounterStore>>,
    circuit: Option<Arc<dyn CircuitBreaker>>,
    fee_market: Option<Arc<dyn FeeMarketKeeper>>,
    evm: Option<Arc<dyn EvmKeeper>>,
    fee_grants: Option<Arc<dyn FeeGrantKeeper>>,
    relay: Option<Arc<dyn RelayKeeper>>,
    extension_checker: ExtensionOptionChecker,
}

impl PipelineConfigBuilder {
    pub fn new(params: AdmissionConfig) -> Self {
        Self {
            params,
            accounts: None,
            bank: None,
            sign_mode: None,
            contract_gas: None,
            tx_counter: None,
            circuit: None,
            fee_market: None,
            evm: None,
            fee_grants: None,
            relay: None,
            extension_checker: has_dynamic_fee_extension,
        }
    }

    pub fn account_keeper(mut self, keeper: Arc<dyn AccountKeeper>) -> Self {
        self.accounts = Some(keeper);
        self
    }

    pub fn bank_keeper(mut self, keeper: Arc<dyn BankKeeper>) -> Self {
        self.bank = Some(keeper);
        self
    }

    pub fn sign_mode_handler(mut self, handler: Arc<dyn SignModeHandler>) -> Self {
        self.sign_mode = Some(handler);
        self
    }

    pub fn contract_gas_hooks(mut self, hooks: Arc<dyn ContractGasHooks>) -> Self {
        self.contract_gas = Some(hooks);
        self
    }

    pub fn tx_counter_store(mut self, store: Arc<dyn TxCounterStore>) -> Self {
        self.tx_counter = Some(store);
        self
    }

    pub fn circuit_breaker(mut self, circuit: Arc<dyn CircuitBreaker>) -> Self {
        self.circuit = Some(circuit);
        self
    }

    pub fn fee_market_keeper(mut self, keeper: Arc<dyn FeeMarketKeeper>) -> Self {
        self.fee_market = Some(keeper);
        self
    }

    pub fn evm_keeper(mut self, keeper: Arc<dyn EvmKeeper>) -> Self {
        self.evm = Some(keeper);
        self
    }

    pub fn fee_grant_keeper(mut self, keeper: Arc<dyn FeeGrantKeeper>) -> Self {
        self.fee_grants = Some(keeper);
        self
    }

    pub fn relay_keeper(mut self, keeper: Arc<dyn RelayKeeper>) -> Self {
        self.relay = Some(keeper);
        self
    }

    pub fn extension_checker(mut self, checker: ExtensionOptionChecker) -> Self {
        self.extension_checker = checker;
        self
    }

    /// Checks parameters, then required handles in a fixed order.
    pub fn build(self) -> Result<PipelineConfig, ConfigurationError> {
        self.params.validate()?;

        Ok(PipelineConfig {
            accounts: require(self.accounts, "account keeper")?,
            bank: require(self.bank, "bank keeper")?,
            sign_mode: require(self.sign_mode, "sign mode handler")?,
            contract_gas: require(self.contract_gas, "contract gas hooks")?,
            tx_counter: require(self.tx_counter, "tx counter store")?,
            circuit: require(self.circuit, "circuit breaker")?,
            fee_market: require(self.fee_market, "fee market keeper")?,
            evm: require(self.evm, "evm keeper")?,
            fee_grants: self.fee_grants,
            relay: self.relay,
            extension_checker: self.extension_checker,
            params: self.params,
        })
    }
}

fn require<T: ?Sized>(
    handle: Option<Arc<T>>,
    name: &'static str,
) -> Result<Arc<T>, ConfigurationError> {
    handle.ok_or(ConfigurationError::MissingCollaborator(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_disallow_list_is_vesting() {
        let config = AdmissionConfig::default();
        assert_eq!(config.disallowed_msg_types.len(), 3);
        assert!(config
            .disallowed_msg_types
            .iter()
            .all(|t| t.starts_with("/cosmos.vesting.")));
        assert!(!config.enable_legacy_eip712);
    }

    #[test]
    fn test_validate_rejects_bad_denom() {
        let config = AdmissionConfig {
            fee_denom: "x".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_builder_reports_first_missing_collaborator() {
        let err = PipelineConfig::builder(AdmissionConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::MissingCollaborator("account keeper"));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AdmissionConfig::for_testing();
        let json = serde_json::to_string(&config).unwrap();
        let back: AdmissionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
