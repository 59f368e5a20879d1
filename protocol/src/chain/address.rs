//! # Addresses
//!
//! Every account on the host chain, externally owned or contract, is a
//! 20-byte [`Address`]. Contract addresses are derived from the deployer and
//! its deployment nonce, so the same deployment sequence always lands on the
//! same addresses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when parsing an address from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded byte string has the wrong length.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// A 20-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Never owns anything.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Parses `0x`-prefixed or bare hex, case-insensitively.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Derives a contract address from its deployer and deployment nonce.
    ///
    /// `BLAKE3(deployer || nonce_be)` truncated to the first 20 bytes.
    pub fn derive(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&deployer.0);
        hasher.update(&nonce.to_be_bytes());
        let digest = hasher.finalize();
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Self(arr)
    }

    /// Derives a stable address from a human label. Handy for naming
    /// externally owned accounts (`"alice"`, `"treasury"`) in tests and demos.
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Self(arr)
    }

    /// Returns `true` for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Address({}..{})", &hex[..8], &hex[hex.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Hex strings on the wire so addresses can key JSON objects.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
