//! SHA-256 digests used for run fingerprints, record chaining and content hashes

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A SHA-256 hash (32 bytes), serialized as lowercase hex
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Hash arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hash UTF-8 text
    pub fn of_text(text: &str) -> Self {
        Self::digest(text.as_bytes())
    }

    /// Chain a hash onto a predecessor (audit log linking)
    pub fn chain(previous: &Hash, current: &Hash) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(previous.0);
        hasher.update(current.0);
        Self(hasher.finalize().into())
    }

    /// Full hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First `n` hex characters (for ids and log lines)
    pub fn short(&self, n: usize) -> String {
        let hex = self.to_hex();
        hex[..n.min(hex.len())].to_string()
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short(16))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
