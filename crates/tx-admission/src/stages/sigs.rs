//! Signature stages: public-key binding, signature count and gas, and
//! verification for direct and legacy EIP-712 signing.

use crate::domain::crypto::{address_of, recover_address_from_bytes, verify_signature};
use crate::domain::{
    AdmissionError, AnteStage, BaseAccount, Event, ExecutionContext, SignerData,
};
use crate::ports::{AccountKeeper, EvmKeeper, SignModeHandler};
use shared_types::{
    address_hex, keccak256, Address, Hash, KeyAlgorithm, SignMode, SignerInfo, Transaction,
    Web3Extension, EXT_WEB3_TX,
};
use std::sync::Arc;

fn existing_account(
    accounts: &dyn AccountKeeper,
    ctx: &ExecutionContext<'_>,
    address: &Address,
) -> Result<BaseAccount, AdmissionError> {
    accounts.get_account(&ctx.state, address)?.ok_or_else(|| {
        AdmissionError::AccountVerificationFailed(format!(
            "account {} does not exist",
            address_hex(address)
        ))
    })
}

fn signer_info<'t>(tx: &'t Transaction, index: usize) -> Result<&'t SignerInfo, AdmissionError> {
    tx.auth_info.signer_infos.get(index).ok_or_else(|| {
        AdmissionError::StructuralValidation(format!("missing signer info {index}"))
    })
}

fn check_sequence(account: &BaseAccount, info: &SignerInfo) -> Result<(), AdmissionError> {
    if info.sequence != account.sequence {
        return Err(AdmissionError::SequenceMismatch {
            address: account.address,
            expected: account.sequence,
            got: info.sequence,
        });
    }
    Ok(())
}

/// Binds each signer's public key: keys supplied in the transaction must
/// hash to the signer's address and are stored on accounts that lack one.
pub struct SetPubKey {
    accounts: Arc<dyn AccountKeeper>,
}

impl SetPubKey {
    pub fn new(accounts: Arc<dyn AccountKeeper>) -> Self {
        Self { accounts }
    }
}

impl AnteStage for SetPubKey {
    fn name(&self) -> &'static str {
        "SetPubKey"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        for (index, signer) in tx.signers().iter().enumerate() {
            let mut account = existing_account(self.accounts.as_ref(), &ctx, signer)?;
            let supplied = tx
                .auth_info
                .signer_infos
                .get(index)
                .and_then(|info| info.public_key.clone());

            if let Some(public_key) = &supplied {
                let derived = address_of(public_key)?;
                if derived != *signer {
                    return Err(AdmissionError::AccountVerificationFailed(format!(
                        "public key address {} does not match signer {}",
                        address_hex(&derived),
                        address_hex(signer)
                    )));
                }
                if account.pub_key.is_none() {
                    account.pub_key = Some(public_key.clone());
                    self.accounts.set_account(&mut ctx.state, &account)?;
                }
            }

            if let Some(public_key) = account.pub_key.clone().or(supplied) {
                ctx.pubkeys.insert(*signer, public_key);
            }
            ctx.emit(Event::new("tx").attr(
                "acc_seq",
                format!("{}/{}", address_hex(signer), account.sequence),
            ));
        }
        Ok(ctx)
    }
}

/// Caps the number of signatures a transaction may carry.
pub struct ValidateSigCount {
    accounts: Arc<dyn AccountKeeper>,
}

impl ValidateSigCount {
    pub fn new(accounts: Arc<dyn AccountKeeper>) -> Self {
        Self { accounts }
    }
}

impl AnteStage for ValidateSigCount {
    fn name(&self) -> &'static str {
        "ValidateSigCount"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let limit = self.accounts.params(&ctx.state)?.tx_sig_limit;
        let count = tx.signers().len() as u64;
        if count > limit {
            return Err(AdmissionError::StructuralValidation(format!(
                "signatures: {count}, limit: {limit}"
            )));
        }
        Ok(ctx)
    }
}

/// Charges verification gas per signature by key algorithm.
pub struct SigGasConsume {
    accounts: Arc<dyn AccountKeeper>,
}

impl SigGasConsume {
    pub fn new(accounts: Arc<dyn AccountKeeper>) -> Self {
        Self { accounts }
    }
}

impl AnteStage for SigGasConsume {
    fn name(&self) -> &'static str {
        "SigGasConsume"
    }

    fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let params = self.accounts.params(&ctx.state)?;

        for signer in tx.signers() {
            let algorithm = match ctx.pubkeys.get(&signer) {
                Some(public_key) => public_key.algorithm,
                // Simulations may run before the key is known.
                None if ctx.mode.is_simulate() => KeyAlgorithm::Secp256k1,
                None => {
                    return Err(AdmissionError::AccountVerificationFailed(format!(
                        "public key not set for {}",
                        address_hex(&signer)
                    )))
                }
            };
            let (cost, descriptor) = match algorithm {
                KeyAlgorithm::Secp256k1 => {
                    (params.sig_verify_cost_secp256k1, "ante verify: secp256k1")
                }
                KeyAlgorithm::EthSecp256k1 => (
                    params.sig_verify_cost_eth_secp256k1,
                    "ante verify: eth_secp256k1",
                ),
            };
            ctx.gas_meter.consume(cost, descriptor)?;
        }
        Ok(ctx)
    }
}

/// Checks each signer's sequence and signature against this node's chain
/// id. Simulations check the sequence only.
pub struct SigVerification {
    accounts: Arc<dyn AccountKeeper>,
    sign_mode: Arc<dyn SignModeHandler>,
    chain_id: String,
}

impl SigVerification {
    pub fn new(
        accounts: Arc<dyn AccountKeeper>,
        sign_mode: Arc<dyn SignModeHandler>,
        chain_id: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            sign_mode,
            chain_id: chain_id.into(),
        }
    }
}

impl AnteStage for SigVerification {
    fn name(&self) -> &'static str {
        "SigVerification"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        for (index, signer) in tx.signers().iter().enumerate() {
            let account = existing_account(self.accounts.as_ref(), &ctx, signer)?;
            let info = signer_info(tx, index)?;
            check_sequence(&account, info)?;

            if ctx.mode.is_simulate() {
                continue;
            }

            let public_key = ctx.pubkeys.get(signer).ok_or_else(|| {
                AdmissionError::AccountVerificationFailed(format!(
                    "public key not set for {}",
                    address_hex(signer)
                ))
            })?;
            let signer_data = SignerData {
                address: *signer,
                chain_id: self.chain_id.clone(),
                account_number: if ctx.is_genesis() {
                    0
                } else {
                    account.account_number
                },
                sequence: account.sequence,
            };
            let sign_bytes = self.sign_mode.sign_bytes(info.mode, &signer_data, tx)?;
            let signature = tx.signatures.get(index).ok_or_else(|| {
                AdmissionError::StructuralValidation(format!("missing signature {index}"))
            })?;

            verify_signature(public_key, &sign_bytes, signature).map_err(|err| {
                AdmissionError::SignatureInvalid(format!(
                    "{err} (account number {}, sequence {}, chain id {})",
                    signer_data.account_number, signer_data.sequence, signer_data.chain_id
                ))
            })?;
        }
        Ok(ctx)
    }
}

/// Domain separator for legacy typed-data signatures on `chain_id`.
pub fn eip712_domain_separator(chain_id: u64) -> Hash {
    let mut chain = [0u8; 32];
    chain[24..].copy_from_slice(&chain_id.to_be_bytes());
    keccak256(
        &[
            keccak256(b"EIP712Domain(string name,string version,uint256 chainId)").as_slice(),
            keccak256(b"Cosmos Web3").as_slice(),
            keccak256(b"1.0.0").as_slice(),
            chain.as_slice(),
        ]
        .concat(),
    )
}

/// Digest the fee payer signs over a legacy JSON sign document.
pub fn eip712_digest(chain_id: u64, sign_bytes: &[u8]) -> Hash {
    keccak256(
        &[
            b"\x19\x01".as_slice(),
            eip712_domain_separator(chain_id).as_slice(),
            keccak256(sign_bytes).as_slice(),
        ]
        .concat(),
    )
}

/// Verifies the fee payer's typed-data signature carried in the web3
/// extension option.
pub struct LegacyEip712SigVerification {
    accounts: Arc<dyn AccountKeeper>,
    sign_mode: Arc<dyn SignModeHandler>,
    evm: Arc<dyn EvmKeeper>,
    chain_id: String,
}

impl LegacyEip712SigVerification {
    pub fn new(
        accounts: Arc<dyn AccountKeeper>,
        sign_mode: Arc<dyn SignModeHandler>,
        evm: Arc<dyn EvmKeeper>,
        chain_id: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            sign_mode,
            evm,
            chain_id: chain_id.into(),
        }
    }
}

impl AnteStage for LegacyEip712SigVerification {
    fn name(&self) -> &'static str {
        "LegacyEip712SigVerification"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let extension: Web3Extension = tx
            .extension_options()
            .iter()
            .find(|o| o.type_url == EXT_WEB3_TX)
            .ok_or_else(|| AdmissionError::UnsupportedExtension("missing web3 extension".into()))?
            .decode()?;

        let evm_chain_id = self.evm.params().chain_id;
        if extension.typed_data_chain_id != evm_chain_id {
            return Err(AdmissionError::SignatureInvalid(format!(
                "typed data chain id {} does not match {}",
                extension.typed_data_chain_id, evm_chain_id
            )));
        }

        let signers = tx.signers();
        if signers.len() != 1 {
            return Err(AdmissionError::StructuralValidation(format!(
                "legacy typed-data transactions take exactly one signer, got {}",
                signers.len()
            )));
        }
        let signer = signers[0];
        if signer != extension.fee_payer {
            return Err(AdmissionError::SignatureInvalid(format!(
                "signer {} is not the fee payer {}",
                address_hex(&signer),
                address_hex(&extension.fee_payer)
            )));
        }

        let account = existing_account(self.accounts.as_ref(), &ctx, &signer)?;
        check_sequence(&account, signer_info(tx, 0)?)?;

        if ctx.mode.is_simulate() {
            return Ok(ctx);
        }

        let signer_data = SignerData {
            address: signer,
            chain_id: self.chain_id.clone(),
            account_number: account.account_number,
            sequence: account.sequence,
        };
        let sign_bytes = self
            .sign_mode
            .sign_bytes(SignMode::LegacyAminoJson, &signer_data, tx)?;
        let digest = eip712_digest(evm_chain_id, &sign_bytes);

        let recovered = recover_address_from_bytes(&digest, &extension.fee_payer_sig)?;
        if recovered != extension.fee_payer {
            return Err(AdmissionError::SignatureInvalid(format!(
                "typed-data signature recovers {}, expected {}",
                address_hex(&recovered),
                address_hex(&extension.fee_payer)
            )));
        }
        Ok(ctx)
    }
}
