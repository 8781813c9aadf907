//! # Typed Slot Values
//!
//! Canonical encodings for each `TypeTag`. Decoding checks exact widths so
//! a slot written under one layout is never silently read under another.

use crate::domain::slot::TypeTag;
use crate::errors::StorageError;
use shared_types::{Principal, U256};

/// A decoded slot value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotValue {
    /// 256-bit unsigned integer.
    UInt(U256),
    /// 128-bit signed integer.
    Int(i128),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Principal address.
    Address(Principal),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text.
    String(String),
}

impl SlotValue {
    /// Tag of this value.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::UInt(_) => TypeTag::UInt,
            Self::Int(_) => TypeTag::Int,
            Self::Bytes(_) => TypeTag::Bytes,
            Self::Address(_) => TypeTag::Address,
            Self::Bool(_) => TypeTag::Bool,
            Self::String(_) => TypeTag::String,
        }
    }

    /// Canonical encoding.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::UInt(v) => {
                let mut buf = [0u8; 32];
                v.to_big_endian(&mut buf);
                buf.to_vec()
            }
            Self::Int(v) => v.to_be_bytes().to_vec(),
            Self::Bytes(v) => v.clone(),
            Self::Address(p) => p.as_bytes().to_vec(),
            Self::Bool(b) => vec![u8::from(*b)],
            Self::String(s) => s.as_bytes().to_vec(),
        }
    }

    /// Decodes `bytes` as `tag`.
    ///
    /// # Errors
    ///
    /// `StorageError::Codec` if the width or content is invalid for `tag`.
    pub fn decode(tag: TypeTag, bytes: &[u8]) -> Result<Self, StorageError> {
        let width_error = |expected: usize| {
            StorageError::Codec(format!(
                "{tag} expects {expected} bytes, found {}",
                bytes.len()
            ))
        };
        match tag {
            TypeTag::UInt => {
                if bytes.len() != 32 {
                    return Err(width_error(32));
                }
                Ok(Self::UInt(U256::from_big_endian(bytes)))
            }
            TypeTag::Int => {
                let raw: [u8; 16] = bytes.try_into().map_err(|_| width_error(16))?;
                Ok(Self::Int(i128::from_be_bytes(raw)))
            }
            TypeTag::Bytes => Ok(Self::Bytes(bytes.to_vec())),
            TypeTag::Address => Principal::from_slice(bytes)
                .map(Self::Address)
                .ok_or_else(|| width_error(20)),
            TypeTag::Bool => match bytes {
                [0] => Ok(Self::Bool(false)),
                [1] => Ok(Self::Bool(true)),
                _ => Err(StorageError::Codec(format!("invalid bool encoding {bytes:?}"))),
            },
            TypeTag::String => String::from_utf8(bytes.to_vec())
                .map(Self::String)
                .map_err(|e| StorageError::Codec(e.to_string())),
        }
    }

    /// Unsigned integer payload.
    #[must_use]
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed integer payload.
    #[must_use]
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Bytes payload.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Address payload.
    #[must_use]
    pub fn as_address(&self) -> Option<Principal> {
        match self {
            Self::Address(p) => Some(*p),
            _ => None,
        }
    }

    /// Boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<U256> for SlotValue {
    fn from(v: U256) -> Self {
        Self::UInt(v)
    }
}

impl From<u64> for SlotValue {
    fn from(v: u64) -> Self {
        Self::UInt(U256::from(v))
    }
}

impl From<i128> for SlotValue {
    fn from(v: i128) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<u8>> for SlotValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Principal> for SlotValue {
    fn from(p: Principal) -> Self {
        Self::Address(p)
    }
}

impl From<bool> for SlotValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for SlotValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for SlotValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
