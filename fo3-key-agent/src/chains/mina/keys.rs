//! Mina key finishing and base58check encodings

use ark_ec::{short_weierstrass::SWCurveConfig, CurveGroup};
use ark_ff::{BigInteger, Field, MontFp, PrimeField, Zero};
use ark_pallas::{Affine, Fq, Fr, PallasConfig};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

/// Version prefix of an encoded private key ("EK…")
const PRIVATE_KEY_VERSION: [u8; 2] = [0x5a, 0x01];
/// Version prefix of an encoded public key ("B62…")
const ADDRESS_VERSION: [u8; 3] = [0xcb, 0x01, 0x01];

/// Base point Mina uses for keys and signatures. Not the arkworks
/// Pallas generator `(-1, 2)`.
pub const MINA_GENERATOR: Affine = Affine::new_unchecked(
    MontFp!("1"),
    MontFp!("12418654782883325593414442427049395787963493412651469444558597405572177144507"),
);

/// Reverse byte order
pub fn reverse_bytes(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// A Mina private key: a Pallas scalar. Wiped on drop.
pub struct MinaPrivateKey(Fr);

impl MinaPrivateKey {
    /// Turn a raw big-endian BIP-32 child key into a Pallas scalar.
    ///
    /// The two high bits of the most significant byte are cleared so the
    /// value fits the scalar field, then the bytes are read little-endian.
    pub fn from_bip32(raw: &[u8; 32]) -> Result<Self> {
        let mut masked = Zeroizing::new(*raw);
        masked[0] &= 0x3f;
        let little_endian = Zeroizing::new(reverse_bytes(&masked[..]));
        Self::from_le_bytes(&little_endian)
    }

    fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        let scalar = Fr::from_le_bytes_mod_order(bytes);
        if scalar.is_zero() {
            return Err(Error::KeyDerivation("derived private key is zero".to_string()));
        }
        Ok(Self(scalar))
    }

    /// Decode an "EK…" base58check private key
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let raw = Zeroizing::new(
            bs58::decode(encoded)
                .with_check(None)
                .into_vec()
                .map_err(|e| Error::Input(format!("invalid private key encoding: {}", e)))?,
        );
        if raw.len() != PRIVATE_KEY_VERSION.len() + 32 || raw[..2] != PRIVATE_KEY_VERSION {
            return Err(Error::Input("invalid private key version".to_string()));
        }
        Self::from_le_bytes(&raw[2..])
    }

    /// Encode as base58check with the private key version prefix
    pub fn to_base58(&self) -> Zeroizing<String> {
        let mut raw = Zeroizing::new(Vec::with_capacity(34));
        raw.extend_from_slice(&PRIVATE_KEY_VERSION);
        raw.extend_from_slice(&self.0.into_bigint().to_bytes_le());
        Zeroizing::new(bs58::encode(raw.as_slice()).with_check().into_string())
    }

    pub(crate) fn scalar(&self) -> &Fr {
        &self.0
    }

    /// `sk · G` on Pallas
    pub fn public_key(&self) -> MinaPublicKey {
        MinaPublicKey((MINA_GENERATOR * self.0).into_affine())
    }
}

impl Drop for MinaPrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A Mina public key (Pallas point)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinaPublicKey(Affine);

impl MinaPublicKey {
    pub fn point(&self) -> &Affine {
        &self.0
    }

    /// x-coordinate (little-endian) and y parity, 33 bytes
    pub fn compressed(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[..32].copy_from_slice(&self.0.x.into_bigint().to_bytes_le());
        out[32] = self.0.y.into_bigint().is_odd() as u8;
        out
    }

    /// Encode as a "B62…" address
    pub fn to_address(&self) -> String {
        let mut raw = Vec::with_capacity(36);
        raw.extend_from_slice(&ADDRESS_VERSION);
        raw.extend_from_slice(&self.compressed());
        bs58::encode(raw).with_check().into_string()
    }

    /// Decode and validate a "B62…" address
    pub fn from_address(address: &str) -> Result<Self> {
        let raw = bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|e| Error::Input(format!("invalid address {}: {}", address, e)))?;

        if raw.len() != ADDRESS_VERSION.len() + 33 || raw[..3] != ADDRESS_VERSION {
            return Err(Error::Input(format!("invalid address version: {}", address)));
        }

        let x_bytes = &raw[3..35];
        let x = Fq::from_le_bytes_mod_order(x_bytes);
        if x.into_bigint().to_bytes_le() != x_bytes {
            return Err(Error::Input(format!("address x-coordinate out of range: {}", address)));
        }

        let odd = match raw[35] {
            0 => false,
            1 => true,
            _ => return Err(Error::Input(format!("invalid address parity byte: {}", address))),
        };

        let point = point_from_x(x, odd)
            .ok_or_else(|| Error::Input(format!("address is not on the curve: {}", address)))?;
        Ok(Self(point))
    }
}

impl From<Affine> for MinaPublicKey {
    fn from(point: Affine) -> Self {
        Self(point)
    }
}

/// Recover the point with the given x-coordinate and y parity
pub(crate) fn point_from_x(x: Fq, odd: bool) -> Option<Affine> {
    let rhs = x.square() * x + PallasConfig::COEFF_B;
    let mut y = rhs.sqrt()?;
    if y.into_bigint().is_odd() != odd {
        y = -y;
    }
    let point = Affine::new_unchecked(x, y);
    point.is_on_curve().then_some(point)
}
