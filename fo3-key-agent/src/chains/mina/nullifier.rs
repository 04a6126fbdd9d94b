//! Deterministic nullifiers (PLUME-style)
//!
//! For a key `sk` and message `m`: `h = hash_to_curve(pk, m)`,
//! `nullifier = sk·h`. A proof `(c, s)` with commitments `g_r = r·G` and
//! `h_m_pk_r = r·h` shows the same `sk` sits behind `pk` and `nullifier`
//! without revealing it. The nullifier depends only on `(sk, m)`; the proof
//! is randomized.

use ark_ec::{short_weierstrass::SWCurveConfig, AffineRepr, CurveGroup};
use ark_ff::{BigInteger, Field, PrimeField, Zero};
use ark_pallas::{Affine, Fq, Fr, PallasConfig};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use super::keys::{MinaPrivateKey, MinaPublicKey, MINA_GENERATOR};
use super::signer::{fq_bytes, hash_to_scalar};
use super::types::{FieldElement, Nullifier, NullifierPrivate, NullifierPublic, Point};
use crate::error::{Error, Result};

const HASH_TO_CURVE_DOMAIN: &[u8] = b"MinaNullifierHashToCurve";
const CHALLENGE_DOMAIN: &[u8] = b"MinaNullifierChallenge";

/// Try-and-increment map of `(pk, message)` onto Pallas, even y
fn hash_to_curve(public_key: &MinaPublicKey, message: &[FieldElement]) -> Result<Affine> {
    for counter in 0u8..=u8::MAX {
        let mut hasher = Sha512::new();
        hasher.update(HASH_TO_CURVE_DOMAIN);
        hasher.update(public_key.compressed());
        for element in message {
            hasher.update(fq_bytes(&element.0));
        }
        hasher.update([counter]);

        let x = Fq::from_le_bytes_mod_order(&hasher.finalize());
        let rhs = x.square() * x + PallasConfig::COEFF_B;
        if let Some(mut y) = rhs.sqrt() {
            if y.into_bigint().is_odd() {
                y = -y;
            }
            return Ok(Affine::new_unchecked(x, y));
        }
    }
    Err(Error::Signing("hash to curve did not find a point".to_string()))
}

fn point_bytes(point: &Affine) -> Vec<u8> {
    let Point { x, y } = Point::from(*point);
    let mut out = fq_bytes(&x);
    out.extend_from_slice(&fq_bytes(&y));
    out
}

fn challenge(public_key: &MinaPublicKey, h: &Affine, nullifier: &Affine, g_r: &Affine, h_r: &Affine) -> Fr {
    hash_to_scalar(&[
        CHALLENGE_DOMAIN,
        &point_bytes(&MINA_GENERATOR),
        &point_bytes(public_key.point()),
        &point_bytes(h),
        &point_bytes(nullifier),
        &point_bytes(g_r),
        &point_bytes(h_r),
    ])
}

fn random_scalar() -> Result<Fr> {
    let mut bytes = Zeroizing::new([0u8; 64]);
    OsRng.fill_bytes(&mut bytes[..]);
    let scalar = Fr::from_le_bytes_mod_order(&bytes[..]);
    if scalar.is_zero() {
        return Err(Error::Signing("random scalar is zero".to_string()));
    }
    Ok(scalar)
}

/// Create the nullifier for `message` under `key`
pub fn create(key: &MinaPrivateKey, message: &[FieldElement]) -> Result<Nullifier> {
    let public_key = key.public_key();
    let h = hash_to_curve(&public_key, message)?;
    let nullifier = (h * key.scalar()).into_affine();

    let r = Zeroizing::new(random_scalar()?);
    let g_r = (MINA_GENERATOR * *r).into_affine();
    let h_r = (h * *r).into_affine();

    let c = challenge(&public_key, &h, &nullifier, &g_r, &h_r);
    let s = *r + c * key.scalar();

    Ok(Nullifier {
        public_key: public_key.to_address(),
        message: message.to_vec(),
        public: NullifierPublic {
            nullifier: nullifier.into(),
            s,
        },
        private: NullifierPrivate {
            c,
            g_r: g_r.into(),
            h_m_pk_r: h_r.into(),
        },
    })
}

/// Check the proof carried by a nullifier
pub fn verify(nullifier: &Nullifier) -> Result<bool> {
    let public_key = MinaPublicKey::from_address(&nullifier.public_key)?;
    let h = hash_to_curve(&public_key, &nullifier.message)?;

    let n = nullifier.public.nullifier.to_affine()?;
    let g_r = nullifier.private.g_r.to_affine()?;
    let h_r = nullifier.private.h_m_pk_r.to_affine()?;
    let s = nullifier.public.s;
    let c = nullifier.private.c;

    if c != challenge(&public_key, &h, &n, &g_r, &h_r) {
        return Ok(false);
    }

    // s·G = g_r + c·pk  and  s·h = h_r + c·nullifier
    let lhs_g = MINA_GENERATOR * s;
    let rhs_g = g_r.into_group() + *public_key.point() * c;
    let lhs_h = h * s;
    let rhs_h = h_r.into_group() + n * c;

    Ok(lhs_g == rhs_g && lhs_h == rhs_h)
}
