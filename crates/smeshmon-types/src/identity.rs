use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SmeshmonError};

/// Length of a smesher public key in bytes
pub const IDENTITY_LEN: usize = 32;

/// Smesher identity: a 32-byte public key, rendered as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Identity(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Parse a hex-encoded key, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed)
            .map_err(|e| SmeshmonError::InvalidIdentity(format!("{}: {}", s, e)))?;
        Self::from_slice(&bytes)
    }

    /// Parse a base64-encoded key, as the node reports it on the wire
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| SmeshmonError::InvalidIdentity(format!("{}: {}", s, e)))?;
        Self::from_slice(&bytes)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; IDENTITY_LEN] = bytes.try_into().map_err(|_| {
            SmeshmonError::InvalidIdentity(format!(
                "public key must be {} bytes long, got {}",
                IDENTITY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Identity(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    /// Short label for timeline groups, e.g. `1a2b…9f0e`
    pub fn abbreviated(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Identity {
    type Err = SmeshmonError;

    fn from_str(s: &str) -> Result<Self> {
        Identity::from_hex(s)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identity::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_base64_agree() {
        let id = Identity::from_bytes([7u8; IDENTITY_LEN]);
        assert_eq!(Identity::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(Identity::from_base64(&id.to_base64()).unwrap(), id);
        assert_eq!(Identity::from_hex(&format!("0x{}", id.to_hex())).unwrap(), id);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(Identity::from_hex("abcd").is_err());
        assert!(Identity::from_hex("zz").is_err());
        assert!(Identity::from_base64("AAAA").is_err());
    }

    #[test]
    fn test_abbreviated() {
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes[0] = 0x1a;
        bytes[31] = 0x0e;
        let id = Identity::from_bytes(bytes);
        assert_eq!(id.abbreviated(), "1a00…000e");
    }
}
