//! Outbound (Driven) ports for the admission pipeline.
//!
//! Each trait is one capability of an external module. Implementations are
//! stateless handles: every read and write goes through the branched state
//! view passed in, so nothing they do survives a rejected transaction.

use crate::domain::{
    AdmissionError, AuthParams, BaseAccount, EvmAccount, EvmParams, GasRegisterTable, SignerData,
    StateOverlay, TxCounterRecord,
};
use shared_types::{Address, Coin, Msg, SignMode, Transaction, U256};

/// Account registry: address -> account number, sequence, public key.
pub trait AccountKeeper: Send + Sync {
    fn params(&self, state: &StateOverlay<'_>) -> Result<AuthParams, AdmissionError>;

    fn get_account(
        &self,
        state: &StateOverlay<'_>,
        address: &Address,
    ) -> Result<Option<BaseAccount>, AdmissionError>;

    fn set_account(
        &self,
        state: &mut StateOverlay<'_>,
        account: &BaseAccount,
    ) -> Result<(), AdmissionError>;

    /// Creates and stores a fresh account with the next account number.
    fn new_account(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
    ) -> Result<BaseAccount, AdmissionError>;

    /// Module account that receives deducted fees.
    fn fee_collector(&self) -> Address;
}

/// Balance ledger.
pub trait BankKeeper: Send + Sync {
    fn balance(
        &self,
        state: &StateOverlay<'_>,
        address: &Address,
        denom: &str,
    ) -> Result<U256, AdmissionError>;

    /// Moves `coins` from `from` to `to`; `InsufficientFunds` on shortfall.
    fn send_coins(
        &self,
        state: &mut StateOverlay<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> Result<(), AdmissionError>;
}

/// Fee-grant registry: third parties paying fees for a grantee.
pub trait FeeGrantKeeper: Send + Sync {
    /// Consumes `fee` from the allowance `granter` gave `grantee`.
    fn use_granted_fees(
        &self,
        state: &mut StateOverlay<'_>,
        granter: &Address,
        grantee: &Address,
        fee: &[Coin],
        msgs: &[Msg],
    ) -> Result<(), AdmissionError>;
}

/// Produces the bytes a signer signed under a given mode.
pub trait SignModeHandler: Send + Sync {
    fn sign_bytes(
        &self,
        mode: SignMode,
        signer: &SignerData,
        tx: &Transaction,
    ) -> Result<Vec<u8>, AdmissionError>;
}

/// On-chain message allow/deny registry.
pub trait CircuitBreaker: Send + Sync {
    fn is_allowed(&self, state: &StateOverlay<'_>, type_url: &str) -> Result<bool, AdmissionError>;
}

/// Storage for the per-block transaction counter.
pub trait TxCounterStore: Send + Sync {
    fn load(&self, state: &StateOverlay<'_>) -> Result<Option<TxCounterRecord>, AdmissionError>;

    fn store(
        &self,
        state: &mut StateOverlay<'_>,
        record: TxCounterRecord,
    ) -> Result<(), AdmissionError>;
}

/// Smart-contract gas accounting hooks.
pub trait ContractGasHooks: Send + Sync {
    fn gas_register(&self) -> GasRegisterTable;
}

/// Fee-market oracle.
pub trait FeeMarketKeeper: Send + Sync {
    /// Current base fee; `None` when the fee market is disabled.
    fn base_fee(&self, state: &StateOverlay<'_>) -> Result<Option<U256>, AdmissionError>;

    /// Chain-wide minimum gas price.
    fn min_gas_price(&self, state: &StateOverlay<'_>) -> Result<U256, AdmissionError>;

    /// Adds to the block's running gas-wanted total and returns the new total.
    fn add_transient_gas_wanted(
        &self,
        state: &mut StateOverlay<'_>,
        gas: u64,
    ) -> Result<u64, AdmissionError>;
}

/// Ethereum-compatible account, balance and nonce operations.
pub trait EvmKeeper: Send + Sync {
    fn params(&self) -> EvmParams;

    fn get_account(
        &self,
        state: &StateOverlay<'_>,
        address: &Address,
    ) -> Result<Option<EvmAccount>, AdmissionError>;

    /// Sets the nonce, creating the account when missing.
    fn set_nonce(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
        nonce: u64,
    ) -> Result<(), AdmissionError>;

    /// Moves `amount` of the EVM denom from `address` to the fee collector.
    fn deduct_fee(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
        amount: U256,
    ) -> Result<(), AdmissionError>;
}

/// Cross-chain relay de-duplication.
pub trait RelayKeeper: Send + Sync {
    /// True when `msg` is a relay message whose packet was already handled.
    fn is_processed(&self, state: &StateOverlay<'_>, msg: &Msg) -> Result<bool, AdmissionError>;
}
