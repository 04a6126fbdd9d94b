//! Mina payload and result shapes

use ark_ec::AffineRepr;
use ark_pallas::{Affine, Fq, Fr};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Field elements travel as canonical decimal strings
pub(crate) mod decimal {
    use std::str::FromStr;

    use ark_ff::PrimeField;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn to_string<F: PrimeField>(value: &F) -> String {
        value.into_bigint().to_string()
    }

    pub fn parse<F: PrimeField>(text: &str) -> Option<F> {
        let value = F::from_str(text).ok()?;
        // from_str reduces modulo p; only accept the canonical form
        (to_string(&value) == text).then_some(value)
    }

    pub fn serialize<F: PrimeField, S: Serializer>(value: &F, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_string(value))
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(deserializer: D) -> Result<F, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| D::Error::custom(format!("invalid field element: {}", text)))
    }
}

/// An element of the Pallas base field (a Mina `Field`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldElement(#[serde(with = "decimal")] pub Fq);

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(Fq::from(value))
    }
}

impl std::str::FromStr for FieldElement {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        decimal::parse(text)
            .map(Self)
            .ok_or_else(|| Error::Input(format!("invalid field element: {}", text)))
    }
}

/// Affine Pallas point as `{ x, y }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(with = "decimal")]
    pub x: Fq,
    #[serde(with = "decimal")]
    pub y: Fq,
}

impl Point {
    /// Back to a curve point, rejecting anything off the curve
    pub fn to_affine(&self) -> Result<Affine> {
        let point = Affine::new_unchecked(self.x, self.y);
        if !point.is_on_curve() {
            return Err(Error::Input("point is not on the curve".to_string()));
        }
        Ok(point)
    }
}

impl From<Affine> for Point {
    fn from(point: Affine) -> Self {
        match point.xy() {
            Some((x, y)) => Self { x: *x, y: *y },
            None => Self { x: Fq::from(0u64), y: Fq::from(0u64) },
        }
    }
}

/// Schnorr signature: nonce commitment x-coordinate and response scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "decimal")]
    pub field: Fq,
    #[serde(with = "decimal")]
    pub scalar: Fr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Payment,
    Delegation,
}

/// A payment or stake delegation, as handed over by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    pub to: String,
    pub from: String,
    pub fee: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub nonce: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<u32>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignableFields {
    pub fields: Vec<FieldElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierRequest {
    pub message: Vec<FieldElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub signature: Signature,
    pub public_key: String,
    pub data: TransactionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    pub signature: Signature,
    pub public_key: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFields {
    pub signature: Signature,
    pub public_key: String,
    pub data: Vec<FieldElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierPublic {
    pub nullifier: Point,
    #[serde(with = "decimal")]
    pub s: Fr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierPrivate {
    #[serde(with = "decimal")]
    pub c: Fr,
    pub g_r: Point,
    pub h_m_pk_r: Point,
}

/// Deterministic nullifier plus the proof tying it to the key and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nullifier {
    pub public_key: String,
    pub message: Vec<FieldElement>,
    pub public: NullifierPublic,
    pub private: NullifierPrivate,
}
