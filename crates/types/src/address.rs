use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an account or contract address string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with '0x'")]
    InvalidPrefix,
    #[error("address must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("address payload must be exactly 20 bytes")]
    InvalidPayloadLength,
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 20;
/// Expected string length of an encoded address (prefix + 40 hex chars).
pub const ADDRESS_STRING_LENGTH: usize = 2 + ADDRESS_BYTES * 2;

/// Encode a 20-byte identifier as `0x`-prefixed lowercase hex.
pub fn encode_address(bytes: &[u8; ADDRESS_BYTES]) -> String {
    let mut encoded = String::with_capacity(ADDRESS_STRING_LENGTH);
    encoded.push_str("0x");
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Attempt to decode a `0x`-prefixed address string into the raw bytes.
pub fn decode_address(address: &str) -> Result<[u8; ADDRESS_BYTES], AddressError> {
    let Some(payload) = address.strip_prefix("0x") else {
        return Err(AddressError::InvalidPrefix);
    };

    if address.len() != ADDRESS_STRING_LENGTH {
        return Err(AddressError::InvalidLength {
            expected: ADDRESS_STRING_LENGTH,
            actual: address.len(),
        });
    }

    let decoded = hex::decode(payload)?;
    let bytes: [u8; ADDRESS_BYTES] = decoded
        .try_into()
        .map_err(|_| AddressError::InvalidPayloadLength)?;

    Ok(bytes)
}

/// Account, token or contract identifier.
///
/// Serialised as a `0x` hex string so it can be used directly as a map key
/// in JSON and TOML documents.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    /// The all-zero address. Never a valid fund, token or contract.
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    /// Ledger identifier used for the chain's native asset.
    pub const NATIVE: Address = Address([0xEEu8; ADDRESS_BYTES]);

    /// Derive a deterministic address from a domain tag and a list of parts.
    ///
    /// Each part is length-prefixed so `("ab", "c")` and `("a", "bc")` never
    /// collide.
    pub fn derive(domain: &str, parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"verdant/");
        hasher.update(domain.as_bytes());
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_BYTES]);
        Address(bytes)
    }

    /// Convenience wrapper for symbol or label based derivation.
    pub fn derive_labeled(domain: &str, label: &str) -> Self {
        Self::derive(domain, &[label.as_bytes()])
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        encode_address(&value.0)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode_address(&value).map(Address)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_address(s).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_address(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", encode_address(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let bytes = [0xABu8; ADDRESS_BYTES];
        let encoded = encode_address(&bytes);
        assert!(encoded.starts_with("0x"));
        assert_eq!(encoded.len(), ADDRESS_STRING_LENGTH);

        let decoded = decode_address(&encoded).expect("address should decode");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn invalid_prefix_rejected() {
        let bad = "1x".to_string() + &"00".repeat(ADDRESS_BYTES);
        let err = decode_address(&bad).unwrap_err();
        assert!(matches!(err, AddressError::InvalidPrefix));
    }

    #[test]
    fn invalid_length_rejected() {
        let bad = "0x".to_string() + &"00".repeat(ADDRESS_BYTES - 1);
        let err = decode_address(&bad).unwrap_err();
        assert!(matches!(err, AddressError::InvalidLength { .. }));
    }

    #[test]
    fn invalid_hex_rejected() {
        let bad = format!("0x{}", "gg".repeat(ADDRESS_BYTES));
        let err = decode_address(&bad).unwrap_err();
        assert!(matches!(err, AddressError::InvalidHex(_)));
    }

    #[test]
    fn derivation_is_deterministic_and_separated() {
        let a = Address::derive_labeled("token", "USDC");
        let b = Address::derive_labeled("token", "USDC");
        let c = Address::derive_labeled("contract", "USDC");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());

        let split_left = Address::derive("pair", &[b"ab", b"c"]);
        let split_right = Address::derive("pair", &[b"a", b"bc"]);
        assert_ne!(split_left, split_right);
    }

    #[test]
    fn serde_uses_hex_strings() {
        let addr = Address([0x11; ADDRESS_BYTES]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "11".repeat(ADDRESS_BYTES)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());
    }
}
