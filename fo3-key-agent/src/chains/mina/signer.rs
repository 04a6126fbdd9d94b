//! Schnorr signatures over Pallas
//!
//! `R = k·G` with `k` derived deterministically from the key and payload and
//! negated when needed so `R.y` is even; `e = H(domain ‖ pk.x ‖ pk.y ‖ R.x ‖ payload)`
//! reduced into the scalar field; `s = k + e·sk`. The signature is
//! `(R.x, s)`. Verification recomputes `s·G − e·pk` and checks its x and
//! y parity.

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_pallas::{Fq, Fr};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use super::keys::{MinaPrivateKey, MinaPublicKey, MINA_GENERATOR};
use super::types::{FieldElement, Signature, TransactionBody, TransactionKind};
use crate::chains::NetworkType;
use crate::error::{Error, Result};

const MEMO_LEN: usize = 34;
const MEMO_MAX_BYTES: usize = 32;

/// Default `validUntil` for transactions that do not set one
pub const NO_EXPIRY: u32 = u32::MAX;

/// Signature domain; a testnet signature never verifies on mainnet
fn domain(network_type: NetworkType) -> &'static [u8] {
    match network_type {
        NetworkType::Mainnet => b"MinaSignatureMainnet",
        NetworkType::Testnet => b"CodaSignature*******",
    }
}

pub(crate) fn fq_bytes(value: &Fq) -> Vec<u8> {
    value.into_bigint().to_bytes_le()
}

pub(crate) fn fr_bytes(value: &Fr) -> Vec<u8> {
    value.into_bigint().to_bytes_le()
}

/// SHA-512 over the parts, reduced into the scalar field
pub(crate) fn hash_to_scalar(parts: &[&[u8]]) -> Fr {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update((part.len() as u32).to_le_bytes());
        hasher.update(part);
    }
    Fr::from_le_bytes_mod_order(&hasher.finalize())
}

fn derive_nonce(key: &MinaPrivateKey, domain: &[u8], public_key: &[u8], payload: &[u8]) -> Result<Fr> {
    let secret = Zeroizing::new(fr_bytes(key.scalar()));
    let mut hmac = Hmac::<Sha512>::new_from_slice(&secret)
        .map_err(|_| Error::Signing("HMAC error".to_string()))?;
    hmac.update(domain);
    hmac.update(public_key);
    hmac.update(payload);
    let nonce = Fr::from_le_bytes_mod_order(&hmac.finalize().into_bytes());

    if nonce.is_zero() {
        return Err(Error::Signing("derived nonce is zero".to_string()));
    }
    Ok(nonce)
}

/// Challenge over `pk.x, pk.y, R.x, payload` in the order Mina's signer
/// absorbs them
fn challenge(domain: &[u8], public_key: &MinaPublicKey, rx: &Fq, payload: &[u8]) -> Fr {
    let pk = public_key.point();
    hash_to_scalar(&[domain, &fq_bytes(&pk.x), &fq_bytes(&pk.y), &fq_bytes(rx), payload])
}

/// Sign raw payload bytes
pub fn sign(key: &MinaPrivateKey, network_type: NetworkType, payload: &[u8]) -> Result<Signature> {
    let domain = domain(network_type);
    let public_key = key.public_key();

    let k = Zeroizing::new(derive_nonce(key, domain, &public_key.compressed(), payload)?);
    let r = (MINA_GENERATOR * *k).into_affine();
    let (rx, ry) = r
        .xy()
        .ok_or_else(|| Error::Signing("nonce commitment is the identity".to_string()))?;

    let k = if ry.into_bigint().is_even() { *k } else { -*k };
    let e = challenge(domain, &public_key, rx, payload);
    let s = k + e * key.scalar();

    Ok(Signature { field: *rx, scalar: s })
}

/// Check a signature over raw payload bytes
pub fn verify(signature: &Signature, public_key: &MinaPublicKey, network_type: NetworkType, payload: &[u8]) -> bool {
    let e = challenge(domain(network_type), public_key, &signature.field, payload);
    let r = (MINA_GENERATOR * signature.scalar - *public_key.point() * e).into_affine();

    match r.xy() {
        Some((rx, ry)) => *rx == signature.field && ry.into_bigint().is_even(),
        None => false,
    }
}

/// The 34-byte memo: `0x01 ‖ len ‖ bytes ‖ zero padding`
pub fn encode_memo(memo: Option<&str>) -> Result<[u8; MEMO_LEN]> {
    let bytes = memo.unwrap_or("").as_bytes();
    if bytes.len() > MEMO_MAX_BYTES {
        return Err(Error::Input(format!(
            "memo is {} bytes, at most {} allowed",
            bytes.len(),
            MEMO_MAX_BYTES
        )));
    }

    let mut out = [0u8; MEMO_LEN];
    out[0] = 0x01;
    out[1] = bytes.len() as u8;
    out[2..2 + bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Canonical byte encoding of a transaction, the input to signing
pub fn transaction_payload(body: &TransactionBody) -> Result<Vec<u8>> {
    let from = MinaPublicKey::from_address(&body.from)?;
    let to = MinaPublicKey::from_address(&body.to)?;

    let amount = match body.kind {
        TransactionKind::Payment => body
            .amount
            .ok_or_else(|| Error::Input("payment requires an amount".to_string()))?,
        TransactionKind::Delegation => 0,
    };

    let mut out = Vec::with_capacity(3 + 8 + 33 + 33 + 4 + 4 + MEMO_LEN + 8);
    out.extend_from_slice(b"tx");
    out.push(match body.kind {
        TransactionKind::Payment => 0,
        TransactionKind::Delegation => 1,
    });
    out.extend_from_slice(&body.fee.to_le_bytes());
    out.extend_from_slice(&from.compressed());
    out.extend_from_slice(&to.compressed());
    out.extend_from_slice(&body.nonce.to_le_bytes());
    out.extend_from_slice(&body.valid_until.unwrap_or(NO_EXPIRY).to_le_bytes());
    out.extend_from_slice(&encode_memo(body.memo.as_deref())?);
    out.extend_from_slice(&amount.to_le_bytes());
    Ok(out)
}

pub fn message_payload(message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + message.len());
    out.extend_from_slice(b"msg");
    out.extend_from_slice(message.as_bytes());
    out
}

pub fn fields_payload(fields: &[FieldElement]) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + fields.len() * 32);
    out.extend_from_slice(b"fields");
    for field in fields {
        out.extend_from_slice(&fq_bytes(&field.0));
    }
    out
}
