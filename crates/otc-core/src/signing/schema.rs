//! EIP-712 struct schemas and field encoding.
//!
//! A [`StructSchema`] is an ordered list of `(name, type)` pairs. Its type
//! string is hashed into every signature, so the order and types of the
//! fields are part of the signed data: two schemas that differ in either
//! produce different struct hashes for the same values.

use std::fmt;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::{Error, Result};

/// Type of a single schema field.
///
/// Only the static types the settlement contract uses are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Unsigned integer of the given bit width (8..=256, multiple of 8).
    Uint(u16),
    Address,
    Bool,
    /// Dynamic string, encoded as the keccak256 of its UTF-8 bytes.
    String,
}

impl FieldType {
    pub const UINT256: FieldType = FieldType::Uint(256);
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Uint(bits) => write!(f, "uint{}", bits),
            FieldType::Address => write!(f, "address"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::String => write!(f, "string"),
        }
    }
}

/// A field value supplied by a message for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uint(U256),
    Address(Address),
    Bool(bool),
    String(String),
}

/// A value that can be hashed under a [`StructSchema`].
pub trait TypedStruct {
    /// Look up a field by its schema name.
    ///
    /// Returns `Ok(None)` for unknown fields. Implementations return an
    /// error when the stored value cannot be encoded as-is.
    fn field(&self, name: &str) -> Result<Option<FieldValue>>;
}

/// One `(name, type)` entry of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub kind: FieldType,
}

/// Ordered EIP-712 struct schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructSchema {
    name: String,
    fields: Vec<Field>,
}

impl StructSchema {
    pub fn new<'a>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, FieldType)>,
    ) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, kind)| Field {
                    name: name.to_string(),
                    kind,
                })
                .collect(),
        }
    }

    /// `EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)`
    pub fn eip712_domain() -> Self {
        Self::new(
            "EIP712Domain",
            [
                ("name", FieldType::String),
                ("version", FieldType::String),
                ("chainId", FieldType::UINT256),
                ("verifyingContract", FieldType::Address),
            ],
        )
    }

    /// The Crab V2 OTC `Order` struct, matching the settlement contract's
    /// `_CRAB_BALANCE_TYPEHASH`.
    pub fn crab_order() -> Self {
        Self::new(
            "Order",
            [
                ("bidId", FieldType::UINT256),
                ("trader", FieldType::Address),
                ("quantity", FieldType::UINT256),
                ("price", FieldType::UINT256),
                ("isBuying", FieldType::Bool),
                ("expiry", FieldType::UINT256),
                ("nonce", FieldType::UINT256),
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// EIP-712 `encodeType`, e.g. `Order(uint256 bidId,address trader,...)`.
    pub fn encode_type(&self) -> String {
        let members: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{} {}", field.kind, field.name))
            .collect();
        format!("{}({})", self.name, members.join(","))
    }

    pub fn type_hash(&self) -> B256 {
        keccak256(self.encode_type().as_bytes())
    }

    /// EIP-712 `hashStruct`: keccak256(typeHash ‖ encodeData(value)).
    pub fn hash_struct<T: TypedStruct + ?Sized>(&self, value: &T) -> Result<B256> {
        let mut encoded = Vec::with_capacity(32 * (self.fields.len() + 1));
        encoded.extend_from_slice(self.type_hash().as_slice());

        for field in &self.fields {
            let value = value.field(&field.name)?.ok_or_else(|| Error::TypeMismatch {
                field: field.name.clone(),
                expected: format!("{} (field missing)", field.kind),
            })?;
            encoded.extend_from_slice(encode_field(field, &value)?.as_slice());
        }

        Ok(keccak256(&encoded))
    }
}

/// Encode one value into its 32-byte EIP-712 word.
fn encode_field(field: &Field, value: &FieldValue) -> Result<B256> {
    let mismatch = || Error::TypeMismatch {
        field: field.name.clone(),
        expected: field.kind.to_string(),
    };

    match (field.kind, value) {
        (FieldType::Uint(bits), FieldValue::Uint(v)) => {
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(mismatch());
            }
            if bits < 256 && v.bit_len() > bits as usize {
                return Err(mismatch());
            }
            Ok(B256::from(v.to_be_bytes::<32>()))
        }
        (FieldType::Address, FieldValue::Address(address)) => {
            Ok(B256::left_padding_from(address.as_slice()))
        }
        (FieldType::Bool, FieldValue::Bool(flag)) => Ok(B256::with_last_byte(*flag as u8)),
        (FieldType::String, FieldValue::String(text)) => Ok(keccak256(text.as_bytes())),
        _ => Err(mismatch()),
    }
}
