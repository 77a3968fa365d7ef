//! Account registry and sign-mode handling over the branched state view.

use crate::domain::{AdmissionError, AuthParams, BaseAccount, SignerData, StateOverlay};
use crate::ports::{AccountKeeper, SignModeHandler};
use shared_types::{sha256, Address, SignDoc, SignMode, StdSignDoc, Transaction};

const ACCOUNT_PREFIX: &[u8] = b"auth/account/";
const NEXT_ACCOUNT_NUMBER_KEY: &[u8] = b"auth/next_account_number";
const PARAMS_KEY: &[u8] = b"auth/params";

/// Derives a module account address from its name.
pub fn module_address(name: &str) -> Address {
    let hash = sha256(name.as_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[..20]);
    address
}

fn account_key(address: &Address) -> Vec<u8> {
    [ACCOUNT_PREFIX, address.as_slice()].concat()
}

/// Account keeper storing bincode-encoded `BaseAccount`s.
#[derive(Debug, Clone)]
pub struct MemoryAccountKeeper {
    fee_collector: Address,
}

impl Default for MemoryAccountKeeper {
    fn default() -> Self {
        Self {
            fee_collector: module_address("fee_collector"),
        }
    }
}

impl MemoryAccountKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the stored parameters (defaults apply while unset).
    pub fn set_params(
        &self,
        state: &mut StateOverlay<'_>,
        params: &AuthParams,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(PARAMS_KEY, params)?)
    }
}

impl AccountKeeper for MemoryAccountKeeper {
    fn params(&self, state: &StateOverlay<'_>) -> Result<AuthParams, AdmissionError> {
        Ok(state.get_typed(PARAMS_KEY)?.unwrap_or_default())
    }

    fn get_account(
        &self,
        state: &StateOverlay<'_>,
        address: &Address,
    ) -> Result<Option<BaseAccount>, AdmissionError> {
        Ok(state.get_typed(&account_key(address))?)
    }

    fn set_account(
        &self,
        state: &mut StateOverlay<'_>,
        account: &BaseAccount,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(&account_key(&account.address), account)?)
    }

    fn new_account(
        &self,
        state: &mut StateOverlay<'_>,
        address: &Address,
    ) -> Result<BaseAccount, AdmissionError> {
        let account_number: u64 = state.get_typed(NEXT_ACCOUNT_NUMBER_KEY)?.unwrap_or(0);
        state.set_typed(NEXT_ACCOUNT_NUMBER_KEY, &(account_number + 1))?;

        let account = BaseAccount {
            address: *address,
            account_number,
            sequence: 0,
            pub_key: None,
        };
        self.set_account(state, &account)?;
        Ok(account)
    }

    fn fee_collector(&self) -> Address {
        self.fee_collector
    }
}

/// Produces `SignDoc` bytes for direct mode and `StdSignDoc` JSON for the
/// legacy mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSignModeHandler;

impl SignModeHandler for DefaultSignModeHandler {
    fn sign_bytes(
        &self,
        mode: SignMode,
        signer: &SignerData,
        tx: &Transaction,
    ) -> Result<Vec<u8>, AdmissionError> {
        let bytes = match mode {
            SignMode::Direct => {
                SignDoc::new(tx, &signer.chain_id, signer.account_number)?.to_bytes()?
            }
            SignMode::LegacyAminoJson => StdSignDoc::new(
                tx,
                &signer.chain_id,
                signer.account_number,
                signer.sequence,
            )
            .to_bytes()?,
        };
        Ok(bytes)
    }
}
