//! Canonical tight-packing encoder.
//!
//! Implements Solidity's packed ABI encoding (`abi.encodePacked`), which is the
//! preimage the Request contracts feed to `keccak256`. Fixed-width values emit
//! exactly their byte width, strings emit their raw UTF-8 bytes, and arrays emit
//! their elements back to back with no length prefix. As in Solidity, array
//! elements are each padded to a full 32-byte word.
//!
//! Two fixed schemas are built here:
//!
//! - [`request_body_fields`]: the request body submitted when broadcasting a
//!   signed request (`_requestData`).
//! - [`request_hash_fields`]: the signing preimage, i.e. the currency contract,
//!   the request body, the payout addresses and the expiration date.

use alloy_primitives::{Address, I256, U256};

use crate::types::Payee;

/// A Solidity type as understood by the packed encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedType {
    /// `address`, 20 bytes.
    Address,
    /// `uintN` with `N` bits, `N` a multiple of 8 up to 256.
    Uint(u16),
    /// `intN` with `N` bits, `N` a multiple of 8 up to 256.
    Int(u16),
    /// `string`, raw bytes without a length prefix.
    String,
    /// `T[]`, each element padded to 32 bytes, no length prefix.
    Array(Box<PackedType>),
}

impl std::fmt::Display for PackedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::String => write!(f, "string"),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// A value to be packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedValue {
    /// An address.
    Address(Address),
    /// An unsigned integer.
    Uint(U256),
    /// A signed integer.
    Int(I256),
    /// A UTF-8 string.
    String(String),
    /// A list of values of the same type.
    Array(Vec<PackedValue>),
}

impl PackedValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Uint(_) => "unsigned integer",
            Self::Int(_) => "signed integer",
            Self::String(_) => "string",
            Self::Array(_) => "array",
        }
    }
}

impl From<Address> for PackedValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<I256> for PackedValue {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<U256> for PackedValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<usize> for PackedValue {
    fn from(value: usize) -> Self {
        Self::Uint(U256::from(value))
    }
}

/// Errors raised by the canonical encoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// A request must have at least one payee.
    #[error("payee list is empty")]
    EmptyPayees,
    /// A value does not fit the declared bit width.
    #[error("value {value} does not fit in {ty}")]
    Overflow {
        /// The declared type.
        ty: String,
        /// The offending value.
        value: String,
    },
    /// A value does not match its declared type.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        /// The declared type.
        expected: String,
        /// The kind of value supplied.
        actual: &'static str,
    },
    /// The declared type cannot be packed.
    #[error("unsupported packed type {0}")]
    UnsupportedType(String),
    /// A field required by the schema is missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// Encodes an ordered list of `(value, type)` pairs with tight packing.
///
/// # Errors
///
/// Returns [`EncodingError`] if a value does not match or does not fit its
/// declared type.
pub fn encode_packed(fields: &[(PackedValue, PackedType)]) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(fields.len() * 32);
    for (value, ty) in fields {
        encode_field(&mut out, value, ty)?;
    }
    Ok(out)
}

fn encode_field(out: &mut Vec<u8>, value: &PackedValue, ty: &PackedType) -> Result<(), EncodingError> {
    match (ty, value) {
        (PackedType::Address, PackedValue::Address(address)) => {
            out.extend_from_slice(address.as_slice());
        }
        (PackedType::Uint(bits), PackedValue::Uint(v)) => {
            let width = byte_width(*bits, ty)?;
            if v.bit_len() > usize::from(*bits) {
                return Err(overflow(ty, v));
            }
            out.extend_from_slice(&v.to_be_bytes::<32>()[32 - width..]);
        }
        (PackedType::Int(bits), PackedValue::Int(v)) => {
            let width = byte_width(*bits, ty)?;
            if !fits_signed(*v, *bits) {
                return Err(overflow(ty, v));
            }
            out.extend_from_slice(&v.into_raw().to_be_bytes::<32>()[32 - width..]);
        }
        (PackedType::String, PackedValue::String(s)) => {
            out.extend_from_slice(s.as_bytes());
        }
        (PackedType::Array(inner), PackedValue::Array(items)) => {
            for item in items {
                encode_array_element(out, item, inner)?;
            }
        }
        (ty, value) => {
            return Err(EncodingError::TypeMismatch {
                expected: ty.to_string(),
                actual: value.kind(),
            });
        }
    }
    Ok(())
}

/// Array elements are padded to 32 bytes, even in packed mode.
fn encode_array_element(
    out: &mut Vec<u8>,
    value: &PackedValue,
    ty: &PackedType,
) -> Result<(), EncodingError> {
    match ty {
        PackedType::Address | PackedType::Uint(_) => {
            let mut element = Vec::with_capacity(32);
            encode_field(&mut element, value, ty)?;
            out.extend(std::iter::repeat_n(0u8, 32 - element.len()));
            out.extend_from_slice(&element);
        }
        PackedType::Int(bits) => {
            let PackedValue::Int(v) = value else {
                return Err(EncodingError::TypeMismatch {
                    expected: ty.to_string(),
                    actual: value.kind(),
                });
            };
            byte_width(*bits, ty)?;
            if !fits_signed(*v, *bits) {
                return Err(overflow(ty, v));
            }
            out.extend_from_slice(&v.into_raw().to_be_bytes::<32>());
        }
        PackedType::String | PackedType::Array(_) => {
            return Err(EncodingError::UnsupportedType(format!("{ty}[]")));
        }
    }
    Ok(())
}

fn byte_width(bits: u16, ty: &PackedType) -> Result<usize, EncodingError> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(EncodingError::UnsupportedType(ty.to_string()));
    }
    Ok(usize::from(bits / 8))
}

fn fits_signed(value: I256, bits: u16) -> bool {
    if bits == 256 {
        return true;
    }
    let bound = I256::from_raw(U256::from(1u8) << (usize::from(bits) - 1));
    value >= -bound && value < bound
}

fn overflow(ty: &PackedType, value: &impl std::fmt::Display) -> EncodingError {
    EncodingError::Overflow {
        ty: ty.to_string(),
        value: value.to_string(),
    }
}

/// Fields of the request body, in contract order.
///
/// `address(primary payee) ∥ address(payer-or-zero) ∥ uint8(payee count) ∥
/// per payee (address ∥ int256(amount)) ∥ uint8(len(data)) ∥ string(data)`.
///
/// # Errors
///
/// Returns [`EncodingError::EmptyPayees`] if `payees` is empty.
pub fn request_body_fields(
    payees: &[Payee],
    payer: Option<Address>,
    data: Option<&str>,
) -> Result<Vec<(PackedValue, PackedType)>, EncodingError> {
    let primary = payees.first().ok_or(EncodingError::EmptyPayees)?;
    let data = data.unwrap_or_default();

    let mut fields = Vec::with_capacity(5 + payees.len() * 2);
    fields.push((primary.id_address.into(), PackedType::Address));
    fields.push((payer.unwrap_or(Address::ZERO).into(), PackedType::Address));
    fields.push((payees.len().into(), PackedType::Uint(8)));
    for payee in payees {
        fields.push((payee.id_address.into(), PackedType::Address));
        fields.push((payee.amount.into(), PackedType::Int(256)));
    }
    fields.push((data.len().into(), PackedType::Uint(8)));
    fields.push((PackedValue::String(data.to_owned()), PackedType::String));
    Ok(fields)
}

/// Fields of the request hash preimage, in contract order.
///
/// `address(currency contract) ∥ request body ∥ address[](payout addresses) ∥
/// uint256(expiration)`. Absent payout addresses pack as the zero address.
///
/// # Errors
///
/// Returns [`EncodingError::EmptyPayees`] if `payees` is empty.
pub fn request_hash_fields(
    currency_contract: Address,
    payees: &[Payee],
    payer: Option<Address>,
    data: Option<&str>,
    expiration: u64,
) -> Result<Vec<(PackedValue, PackedType)>, EncodingError> {
    let mut fields = vec![(currency_contract.into(), PackedType::Address)];
    fields.extend(request_body_fields(payees, payer, data)?);
    let payment_addresses = payees
        .iter()
        .map(|p| PackedValue::Address(p.payment_address.unwrap_or(Address::ZERO)))
        .collect();
    fields.push((
        PackedValue::Array(payment_addresses),
        PackedType::Array(Box::new(PackedType::Address)),
    ));
    fields.push((U256::from(expiration).into(), PackedType::Uint(256)));
    Ok(fields)
}
