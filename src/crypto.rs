use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use primitive_types::{H160, H256};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::ValidationError;

/// 20-byte account address. Parsing validates the EIP-55 checksum when the
/// input is mixed-case; all-lowercase and all-uppercase inputs are accepted
/// as unchecksummed. Display renders the checksummed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(H160);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() != 20 {
            return Err(ValidationError::InvalidAddress {
                input: hex::encode(bytes),
                reason: format!("expected 20 bytes, got {}", bytes.len()),
            });
        }
        Ok(Self(H160::from_slice(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Lowercase hex form used on the wire.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_bytes()))
    }

    /// EIP-55 mixed-case form: a hex digit is uppercased when the matching
    /// nibble of keccak256(lowercase_hex) is >= 8.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0.as_bytes());
        let digest = Keccak256::digest(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (digest[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0xf;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidAddress {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };

        let digits = s.strip_prefix("0x").ok_or_else(|| invalid("missing 0x prefix"))?;
        if digits.len() != 40 {
            return Err(invalid("expected 40 hex digits"));
        }
        let bytes = hex::decode(digits).map_err(|_| invalid("not hexadecimal"))?;
        let address = Self(H160::from_slice(&bytes));

        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        if has_upper && has_lower && address.to_checksum() != s {
            return Err(ValidationError::BadChecksum(s.to_owned()));
        }
        Ok(address)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

/// 32-byte hash (block hash, transaction hash, storage key, topic).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(H256);

impl Hash {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() != 32 {
            return Err(ValidationError::InvalidHash {
                input: hex::encode(bytes),
                reason: format!("expected 32 bytes, got {}", bytes.len()),
            });
        }
        Ok(Self(H256::from_slice(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl FromStr for Hash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidHash {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };
        let digits = s.strip_prefix("0x").ok_or_else(|| invalid("missing 0x prefix"))?;
        if digits.len() != 64 {
            return Err(invalid("expected 64 hex digits"));
        }
        let bytes = hex::decode(digits).map_err(|_| invalid("not hexadecimal"))?;
        Ok(Self(H256::from_slice(&bytes)))
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_address_accepts_valid_checksum() {
        let address: Address = CHECKSUMMED.parse().unwrap();
        assert_eq!(address.to_checksum(), CHECKSUMMED);
        assert_eq!(address.to_hex(), CHECKSUMMED.to_lowercase());
    }

    #[test]
    fn test_address_accepts_lowercase() {
        let address: Address = CHECKSUMMED.to_lowercase().parse().unwrap();
        assert_eq!(address.to_checksum(), CHECKSUMMED);
    }

    #[test]
    fn test_address_rejects_bad_checksum() {
        // flip the case of one alphabetic digit
        let tampered = CHECKSUMMED.replace("f39F", "F39F");
        assert!(matches!(
            tampered.parse::<Address>(),
            Err(ValidationError::BadChecksum(_))
        ));
    }

    #[test]
    fn test_address_rejects_malformed_input() {
        assert!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse::<Address>()
            .is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzzzzd6e51aad88f6f4ce6ab8827279cfffb92266"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_hash_round_trip() {
        let hex = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        let hash: Hash = hex.parse().unwrap();
        assert_eq!(hash.to_hex(), hex);
        assert!("0x1234".parse::<Hash>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_hex() {
        let address: Address = CHECKSUMMED.parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", CHECKSUMMED.to_lowercase()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
