//! Shared fixtures for the admission integration tests.

#![allow(dead_code)]

use k256::ecdsa::SigningKey;
use shared_types::{
    Address, AuthInfo, Coin, EthTxData, ExtensionOption, Fee, KeyAlgorithm, Msg, MsgEthereumTx,
    PublicKey, SignMode, SignerInfo, Transaction, TxBody, EXT_ETHEREUM_TX, U256,
};
use std::sync::Arc;
use tx_admission::adapters::{
    DefaultSignModeHandler, MemoryAccountKeeper, MemoryBankKeeper, MemoryCircuitBreaker,
    MemoryEvmKeeper, MemoryFeeGrantKeeper, MemoryFeeMarketKeeper, MemoryRelayKeeper,
    MemoryStateStore, MemoryTxCounterStore, StaticContractGasHooks,
};
use tx_admission::domain::crypto::{address_from_pubkey, normalize_signature, signing_digest};
use tx_admission::domain::{BaseAccount, EvmParams, GasRegisterTable, SignerData};
use tx_admission::stages::sigs::eip712_digest;
use tx_admission::{
    AccountKeeper, AdmissionConfig, AdmissionService, BankKeeper, BlockInfo, EvmKeeper,
    PipelineConfig, PipelineConfigBuilder, SignModeHandler, StateOverlay,
};

pub const DENOM: &str = "aante";
pub const CHAIN_ID: &str = "ante_9000-1";
pub const EVM_CHAIN_ID: u64 = 9000;
pub const GAS: u64 = 200_000;

// =============================================================================
// WIRING
// =============================================================================

pub fn evm_params() -> EvmParams {
    EvmParams {
        chain_id: EVM_CHAIN_ID,
        evm_denom: DENOM.into(),
        allow_unprotected_txs: false,
    }
}

pub fn evm_keeper() -> MemoryEvmKeeper {
    MemoryEvmKeeper::new(
        evm_params(),
        Arc::new(MemoryAccountKeeper::new()),
        Arc::new(MemoryBankKeeper),
    )
}

/// Builder with every in-memory collaborator set.
pub fn full_builder(params: AdmissionConfig) -> PipelineConfigBuilder {
    PipelineConfig::builder(params)
        .account_keeper(Arc::new(MemoryAccountKeeper::new()))
        .bank_keeper(Arc::new(MemoryBankKeeper))
        .sign_mode_handler(Arc::new(DefaultSignModeHandler))
        .contract_gas_hooks(Arc::new(StaticContractGasHooks(GasRegisterTable::default())))
        .tx_counter_store(Arc::new(MemoryTxCounterStore))
        .circuit_breaker(Arc::new(MemoryCircuitBreaker))
        .fee_market_keeper(Arc::new(MemoryFeeMarketKeeper))
        .evm_keeper(Arc::new(evm_keeper()))
        .fee_grant_keeper(Arc::new(MemoryFeeGrantKeeper))
        .relay_keeper(Arc::new(MemoryRelayKeeper))
}

pub fn service(params: AdmissionConfig) -> AdmissionService {
    AdmissionService::new(full_builder(params).build().unwrap())
}

pub fn block() -> BlockInfo {
    BlockInfo::new(5, CHAIN_ID)
}

// =============================================================================
// STATE
// =============================================================================

pub fn register(store: &MemoryStateStore, address: &Address) -> BaseAccount {
    let mut account = None;
    store
        .seed(|s| {
            account = Some(MemoryAccountKeeper::new().new_account(s, address)?);
            Ok(())
        })
        .unwrap();
    account.unwrap()
}

pub fn fund(store: &MemoryStateStore, address: &Address, amount: u64) {
    store
        .seed(|s| MemoryBankKeeper.set_balance(s, address, &Coin::new(DENOM, amount)))
        .unwrap();
}

pub fn balance(store: &MemoryStateStore, address: &Address) -> U256 {
    MemoryBankKeeper
        .balance(&StateOverlay::new(store), address, DENOM)
        .unwrap()
}

pub fn account(store: &MemoryStateStore, address: &Address) -> BaseAccount {
    MemoryAccountKeeper::new()
        .get_account(&StateOverlay::new(store), address)
        .unwrap()
        .unwrap()
}

pub fn account_in(state: &StateOverlay<'_>, address: &Address) -> BaseAccount {
    MemoryAccountKeeper::new()
        .get_account(state, address)
        .unwrap()
        .unwrap()
}

pub fn evm_nonce(store: &MemoryStateStore, address: &Address) -> u64 {
    evm_keeper()
        .get_account(&StateOverlay::new(store), address)
        .unwrap()
        .map(|a| a.nonce)
        .unwrap_or(0)
}

// =============================================================================
// COSMOS TRANSACTIONS
// =============================================================================

pub struct Signer {
    pub key: SigningKey,
    pub public_key: PublicKey,
    pub address: Address,
}

impl Signer {
    pub fn random() -> Self {
        let key = SigningKey::random(&mut rand::thread_rng());
        let public_key = PublicKey::secp256k1(
            key.verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        );
        let address = address_from_pubkey(key.verifying_key());
        Self {
            key,
            public_key,
            address,
        }
    }

    /// Registers the signer and funds it; returns its account number.
    pub fn onboard(&self, store: &MemoryStateStore, amount: u64) -> u64 {
        let account = register(store, &self.address);
        fund(store, &self.address, amount);
        account.account_number
    }

    pub fn sign_direct(&self, tx: &mut Transaction, account_number: u64, sequence: u64) {
        tx.signatures = vec![self.direct_signature(tx, CHAIN_ID, account_number, sequence)];
    }

    /// Compact direct-mode signature over `tx` for `chain_id`.
    pub fn direct_signature(
        &self,
        tx: &Transaction,
        chain_id: &str,
        account_number: u64,
        sequence: u64,
    ) -> Vec<u8> {
        let data = SignerData {
            address: self.address,
            chain_id: chain_id.into(),
            account_number,
            sequence,
        };
        let bytes = DefaultSignModeHandler
            .sign_bytes(SignMode::Direct, &data, tx)
            .unwrap();
        let digest = signing_digest(KeyAlgorithm::Secp256k1, &bytes);
        let (r, s, _) = sign_prehash(&self.key, &digest);
        [r, s].concat()
    }

    /// Recoverable `r || s || v` typed-data signature over the legacy JSON
    /// sign document of `tx`.
    pub fn typed_data_signature(
        &self,
        tx: &Transaction,
        account_number: u64,
        sequence: u64,
    ) -> Vec<u8> {
        let data = SignerData {
            address: self.address,
            chain_id: CHAIN_ID.into(),
            account_number,
            sequence,
        };
        let bytes = DefaultSignModeHandler
            .sign_bytes(SignMode::LegacyAminoJson, &data, tx)
            .unwrap();
        let (r, s, v) = sign_prehash(&self.key, &eip712_digest(EVM_CHAIN_ID, &bytes));
        [r.as_slice(), s.as_slice(), [v].as_slice()].concat()
    }

    pub fn signer_info(&self, sequence: u64) -> SignerInfo {
        SignerInfo {
            public_key: Some(self.public_key.clone()),
            mode: SignMode::Direct,
            sequence,
        }
    }
}

fn sign_prehash(key: &SigningKey, digest: &[u8; 32]) -> ([u8; 32], [u8; 32], u8) {
    let (sig, recid) = key.sign_prehash_recoverable(digest).unwrap();
    let bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    normalize_signature(r, s, recid.to_byte())
}

/// Unsigned bank send from `signer` declaring `sequence`.
pub fn send_tx(signer: &Signer, fee: u64, gas: u64, sequence: u64) -> Transaction {
    Transaction {
        body: TxBody {
            msgs: vec![Msg::Send {
                from: signer.address,
                to: [0xEE; 20],
                amount: vec![Coin::new(DENOM, 1u64)],
            }],
            ..Default::default()
        },
        auth_info: AuthInfo {
            signer_infos: vec![signer.signer_info(sequence)],
            fee: Fee {
                amount: vec![Coin::new(DENOM, fee)],
                gas_limit: gas,
                payer: None,
                granter: None,
            },
        },
        signatures: vec![],
    }
}

pub fn signed_send(
    signer: &Signer,
    account_number: u64,
    sequence: u64,
    fee: u64,
) -> Transaction {
    let mut tx = send_tx(signer, fee, GAS, sequence);
    signer.sign_direct(&mut tx, account_number, sequence);
    tx
}

// =============================================================================
// ETHEREUM TRANSACTIONS
// =============================================================================

pub struct EthSender {
    pub key: SigningKey,
    pub address: Address,
}

impl EthSender {
    pub fn random() -> Self {
        let key = SigningKey::random(&mut rand::thread_rng());
        let address = address_from_pubkey(key.verifying_key());
        Self { key, address }
    }

    /// Dynamic-fee transfer paying at most 10 per gas with a tip of 2.
    pub fn transfer(&self, nonce: u64, value: u64) -> MsgEthereumTx {
        let mut data = EthTxData {
            chain_id: Some(EVM_CHAIN_ID),
            nonce,
            gas_limit: 21_000,
            gas_fee_cap: U256::from(10u64),
            gas_tip_cap: U256::from(2u64),
            to: Some([0xAB; 20]),
            value: U256::from(value),
            input: vec![],
            v: 0,
            r: [0; 32],
            s: [0; 32],
        };
        let (r, s, v) = sign_prehash(&self.key, &data.signing_hash().unwrap());
        data.r = r;
        data.s = s;
        data.v = v;
        MsgEthereumTx {
            from: self.address,
            data,
        }
    }
}

/// Wraps payloads with the fee and gas the wrapper must declare.
pub fn eth_wrap(payloads: Vec<MsgEthereumTx>) -> Transaction {
    let fee = payloads
        .iter()
        .map(|p| p.data.max_fee().unwrap())
        .fold(U256::zero(), |a, b| a + b);
    let gas = payloads.iter().map(|p| p.data.gas_limit).sum();
    Transaction {
        body: TxBody {
            msgs: payloads.into_iter().map(Msg::EthereumTx).collect(),
            extension_options: vec![ExtensionOption::new(EXT_ETHEREUM_TX, vec![])],
            ..Default::default()
        },
        auth_info: AuthInfo {
            signer_infos: vec![],
            fee: Fee {
                amount: vec![Coin::new(DENOM, fee)],
                gas_limit: gas,
                payer: None,
                granter: None,
            },
        },
        signatures: vec![],
    }
}
