//! Canonical Primitive Types
//!
//! Fixed-size, copyable value types shared by the token, exchange and
//! factory crates. Amounts are `u128` everywhere so that curve arithmetic
//! has headroom before any checked operation can overflow.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Block height stamped on emitted events (0-indexed)
pub type BlockHeight = u64;

/// Token and native-currency amounts in atomic units
pub type Amount = u128;

/// Basis points for percentage calculations (10000 = 100%)
pub type Bps = u16;

/// Basis-point denominator
pub const BPS_DENOMINATOR: Amount = 10_000;

// ============================================================================
// ADDRESS
// ============================================================================

/// 32-byte address of an account, token or exchange
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed Address
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Derive an address as Blake3(domain || parts...)
    ///
    /// Used for contract addresses (token, exchange, factory) so that the
    /// same deployment sequence always yields the same addresses.
    pub fn derive(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Derive a stable address from a human-readable label ("alice", "admin")
    pub fn from_label(label: &str) -> Self {
        Self::derive(ADDRESS_LABEL_DOMAIN, &[label.as_bytes()])
    }

    /// Short hex form for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

/// Domain separator for label-derived addresses
const ADDRESS_LABEL_DOMAIN: &[u8] = b"CURVE_ADDRESS_LABEL_V1";

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Error parsing a hex address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// Not valid hex
    InvalidHex(String),
    /// Decoded to the wrong number of bytes
    InvalidLength(usize),
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressParseError::InvalidHex(msg) => write!(f, "Invalid address hex: {}", msg),
            AddressParseError::InvalidLength(len) => {
                write!(f, "Address must be 32 bytes, got {}", len)
            }
        }
    }
}

impl std::error::Error for AddressParseError {}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(hex_str).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

// Hex string in human-readable formats (JSON, TOML), raw bytes otherwise.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
