//! # secp256k1 Signatures
//!
//! Verification for both key flavours the pipeline accepts, and public-key
//! recovery for Ethereum-style payloads.
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: S must be strictly below half the curve order
//! - **Scalar Range Validation**: R and S must be in [1, n-1]
//! - **Constant-Time Operations**: scalar comparisons use `subtle`

use super::errors::AdmissionError;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use shared_types::{keccak256, sha256, Address, Hash, KeyAlgorithm, PublicKey};
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;
use zeroize::Zeroize;

/// secp256k1 curve order n
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// n/2, the malleability bound for S.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Length of a compact `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// Why a signature or key was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature format")]
    InvalidFormat,

    #[error("malleable signature (high S value)")]
    MalleableSignature,

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("failed to recover public key")]
    RecoveryFailed,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signature does not match public key")]
    VerificationFailed,
}

impl From<SignatureError> for AdmissionError {
    fn from(err: SignatureError) -> Self {
        AdmissionError::SignatureInvalid(err.to_string())
    }
}

/// Digest a key of `algorithm` signs for `msg`.
pub fn signing_digest(algorithm: KeyAlgorithm, msg: &[u8]) -> Hash {
    match algorithm {
        KeyAlgorithm::Secp256k1 => sha256(msg),
        KeyAlgorithm::EthSecp256k1 => keccak256(msg),
    }
}

/// Account address of a public key: last 20 bytes of Keccak-256 over the
/// uncompressed point without its 0x04 prefix.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let point = public_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Address of an encoded (compressed or uncompressed) public key.
pub fn address_of(public_key: &PublicKey) -> Result<Address, SignatureError> {
    Ok(address_from_pubkey(&parse_pubkey(public_key)?))
}

fn parse_pubkey(public_key: &PublicKey) -> Result<VerifyingKey, SignatureError> {
    VerifyingKey::from_sec1_bytes(&public_key.bytes).map_err(|_| SignatureError::InvalidPublicKey)
}

/// Verify a compact signature over `msg` with `public_key`.
pub fn verify_signature(
    public_key: &PublicKey,
    msg: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidFormat);
    }
    let (r, s) = split_rs(signature);
    check_scalars(&r, &s)?;

    let key = parse_pubkey(public_key)?;
    let sig = Signature::from_slice(signature).map_err(|_| SignatureError::InvalidFormat)?;
    let digest = signing_digest(public_key.algorithm, msg);

    key.verify_prehash(&digest, &sig)
        .map_err(|_| SignatureError::VerificationFailed)
}

/// Recover the signer address from `(r, s, v)` over a 32-byte digest.
pub fn recover_address(
    digest: &Hash,
    r: &[u8; 32],
    s: &[u8; 32],
    v: u8,
) -> Result<Address, SignatureError> {
    check_scalars(r, s)?;
    let recovery_id = parse_recovery_id(v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(r);
    sig_bytes[32..].copy_from_slice(s);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| SignatureError::InvalidFormat)?;

    let recovered = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_from_pubkey(&recovered))
}

/// Recover the signer address from a 65-byte `r || s || v` signature.
pub fn recover_address_from_bytes(digest: &Hash, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN + 1 {
        return Err(SignatureError::InvalidFormat);
    }
    let (r, s) = split_rs(&signature[..SIGNATURE_LEN]);
    recover_address(digest, &r, &s, signature[SIGNATURE_LEN])
}

fn split_rs(signature: &[u8]) -> ([u8; 32], [u8; 32]) {
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature[..32]);
    s.copy_from_slice(&signature[32..64]);
    (r, s)
}

fn check_scalars(r: &[u8; 32], s: &[u8; 32]) -> Result<(), SignatureError> {
    if !is_valid_scalar(r) || !is_valid_scalar(s) {
        return Err(SignatureError::InvalidFormat);
    }
    if !is_low_s(s) {
        return Err(SignatureError::MalleableSignature);
    }
    Ok(())
}

/// Constant-time `a < b` over big-endian 32-byte values.
fn ct_less_than(a: &[u8; 32], b: &[u8; 32]) -> Choice {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        less |= not_decided & Choice::from((a[i] < b[i]) as u8);
        greater |= not_decided & Choice::from((a[i] > b[i]) as u8);
    }
    less
}

/// S at most n/2 (EIP-2).
fn is_low_s(s: &[u8; 32]) -> bool {
    (!ct_less_than(&SECP256K1_HALF_ORDER, s)).into()
}

/// Scalar in [1, n-1].
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }
    (!is_zero & ct_less_than(scalar, &SECP256K1_ORDER)).into()
}

/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

/// s' = n - s
fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}

/// Bring a freshly produced signature into low-S form, flipping the
/// recovery id when S is inverted.
pub fn normalize_signature(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> ([u8; 32], [u8; 32], u8) {
    if is_low_s(&s) {
        (r, s, recovery_id)
    } else {
        (r, invert_s(&s), recovery_id ^ 1)
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use k256::ecdsa::SigningKey;

    pub fn generate_keypair() -> (SigningKey, PublicKey) {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let bytes = signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        (signing_key, PublicKey::secp256k1(bytes))
    }

    /// Compact low-S signature over the digest `algorithm` prescribes.
    pub fn sign(key: &SigningKey, algorithm: KeyAlgorithm, msg: &[u8]) -> Vec<u8> {
        let (r, s, _) = sign_digest(key, &signing_digest(algorithm, msg));
        let mut out = r.to_vec();
        out.extend_from_slice(&s);
        out
    }

    /// Recoverable low-S signature over a prehashed digest.
    pub fn sign_digest(key: &SigningKey, digest: &Hash) -> ([u8; 32], [u8; 32], u8) {
        let (sig, recid) = key
            .sign_prehash_recoverable(digest)
            .expect("signing failed");
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        normalize_signature(r, s, recid.to_byte())
    }
}
