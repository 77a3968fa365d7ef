//! Fee market and Ethereum account view.

use crate::domain::{AdmissionError, EvmAccount, EvmParams, StateOverlay};
use crate::ports::{AccountKeeper, BankKeeper, EvmKeeper, FeeMarketKeeper};
use shared_types::{Address, Coin, Hash, U256};
use std::sync::Arc;

const BASE_FEE_KEY: &[u8] = b"feemarket/base_fee";
const MIN_GAS_PRICE_KEY: &[u8] = b"feemarket/min_gas_price";
const BLOCK_GAS_WANTED_KEY: &[u8] = b"feemarket/block_gas_wanted";
const CODE_HASH_PREFIX: &[u8] = b"evm/code_hash/";

/// Fee market with an optional base fee. No base fee stored means the
/// market is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFeeMarketKeeper;

impl MemoryFeeMarketKeeper {
    pub fn set_base_fee(
        &self,
        state: &mut StateOverlay<'_>,
        base_fee: Option<U256>,
    ) -> Result<(), AdmissionError> {
        match base_fee {
            Some(fee) => state.set_typed(BASE_FEE_KEY, &fee)?,
            None => state.delete(BASE_FEE_KEY),
        }
        Ok(())
    }

    pub fn set_min_gas_price(
        &self,
        state: &mut StateOverlay<'_>,
        price: U256,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(MIN_GAS_PRICE_KEY, &price)?)
    }

    pub fn block_gas_wanted(&self, state: &StateOverlay<'_>) -> Result<u64, AdmissionError> {
        Ok(state.get_typed(BLOCK_GAS_WANTED_KEY)?.unwrap_or(0))
    }

    /// Clears the running total; called by the block applier per block.
    pub fn reset_block_gas_wanted(&self, state: &mut StateOverlay<'_>) {
        state.delete(BLOCK_GAS_WANTED_KEY);
    }
}

impl FeeMarketKeeper for MemoryFeeMarketKeeper {
    fn base_fee(&self, state: &StateOverlay<'_>) -> Result<Option<U256>, AdmissionError> {
        Ok(state.get_typed(BASE_FEE_KEY)?)
    }

    fn min_gas_price(&self, state: &StateOverlay<'_>) -> Result<U256, AdmissionError> {
        Ok(state.get_typed(MIN_GAS_PRICE_KEY)?.unwrap_or_default())
    }

    fn add_transient_gas_wanted(
        &self,
        state: &mut StateOverlay<'_>,
        gas: u64,
    ) -> Result<u64, AdmissionError> {
        let total = self.block_gas_wanted(state)?.saturating_add(gas);
        state.set_typed(BLOCK_GAS_WANTED_KEY, &total)?;
        Ok(total)
    }
}

/// Ethereum view over the account registry and the bank: nonce is the
/// account sequence, balance is the EVM denom balance.
#[derive(Clone)]
pub struct MemoryEvmKeeper {
    params: EvmParams,
    accounts: Arc<dyn AccountKeeper>,
    bank: Arc<dyn BankKeeper>,
}

impl std::fmt::Debug for MemoryEvmKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEvmKeeper")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl MemoryEvmKeeper {
    pub fn new(
        params: EvmParams,
        accounts: Arc<dyn AccountKeeper>,
        bank: Arc<dyn BankKeeper>,
    ) -> Self {
        Self {
            params,
            accounts,
            bank,
        }
    }

    /// Marks `address` as a contract account.
    pub fn set_code_hash(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
        code_hash: Hash,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(&[CODE_HASH_PREFIX, address.as_slice()].concat(), &code_hash)?)
    }
}

impl EvmKeeper for MemoryEvmKeeper {
    fn params(&self) -> EvmParams {
        self.params.clone()
    }

    fn get_account(
        &self,
        state: &StateOverlay<'_>,
        address: &Address,
    ) -> Result<Option<EvmAccount>, AdmissionError> {
        let account = self.accounts.get_account(state, address)?;
        let balance = self.bank.balance(state, address, &self.params.evm_denom)?;
        if account.is_none() && balance.is_zero() {
            return Ok(None);
        }

        Ok(Some(EvmAccount {
            nonce: account.map(|a| a.sequence).unwrap_or(0),
            balance,
            code_hash: state.get_typed(&[CODE_HASH_PREFIX, address.as_slice()].concat())?,
        }))
    }

    fn set_nonce(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
        nonce: u64,
    ) -> Result<(), AdmissionError> {
        let mut account = match self.accounts.get_account(state, address)? {
            Some(account) => account,
            None => self.accounts.new_account(state, address)?,
        };
        account.sequence = nonce;
        self.accounts.set_account(state, &account)
    }

    fn deduct_fee(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
        amount: U256,
    ) -> Result<(), AdmissionError> {
        if amount.is_zero() {
            return Ok(());
        }
        let collector = self.accounts.fee_collector();
        self.bank.send_coins(
            state,
            address,
            &collector,
            &[Coin::new(self.params.evm_denom.clone(), amount)],
        )
    }
}
