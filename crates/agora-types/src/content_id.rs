use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Content-addressed identifier for a stored blob.
///
/// A `ContentId` is the SHA-256 digest of a blob's exact bytes. Identical
/// content always produces the same `ContentId`, making blobs
/// deduplicatable and verifiable. The digest is computed over the raw
/// bytes with no framing or domain prefix, so the hex form matches what
/// external tooling (`sha256sum`) reports for the same data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Compute a `ContentId` from a blob's bytes.
    pub fn from_blob(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Create a `ContentId` from a pre-computed digest.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short_hex())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Serialized as a hex string so persisted metadata and ledger files stay
// human-auditable.
impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl From<[u8; 32]> for ContentId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<ContentId> for [u8; 32] {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_blob_is_deterministic() {
        let data = b"hello world";
        let id1 = ContentId::from_blob(data);
        let id2 = ContentId::from_blob(data);
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_blobs_produce_different_ids() {
        let id1 = ContentId::from_blob(b"hello");
        let id2 = ContentId::from_blob(b"world");
        assert_ne!(id1, id2);
    }

    #[test]
    fn hex_matches_plain_sha256() {
        // SHA-256 of the empty input, a fixed vector.
        let id = ContentId::from_blob(b"");
        assert_eq!(
            id.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn csv_blob_digest() {
        let id = ContentId::from_blob(b"a,b\n1,2\n");
        assert_eq!(
            id.to_hex(),
            hex::encode(sha2::Sha256::digest(b"a,b\n1,2\n"))
        );
        assert_eq!(id.to_hex().len(), 64);
    }

    #[test]
    fn hex_roundtrip() {
        let id = ContentId::from_blob(b"test");
        let parsed = ContentId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            ContentId::from_hex("zzzz"),
            Err(TypeError::InvalidHex(_))
        ));
        assert!(matches!(
            ContentId::from_hex("abcd"),
            Err(TypeError::InvalidLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn serde_is_hex_string() {
        let id = ContentId::from_blob(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let parsed: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn display_is_full_hex() {
        let id = ContentId::from_blob(b"test");
        assert_eq!(format!("{id}"), id.to_hex());
    }

    proptest! {
        #[test]
        fn identical_bytes_collapse_to_one_id(data: Vec<u8>) {
            let copy = data.clone();
            prop_assert_eq!(ContentId::from_blob(&data), ContentId::from_blob(&copy));
        }

        #[test]
        fn hex_roundtrip_holds(data: Vec<u8>) {
            let id = ContentId::from_blob(&data);
            prop_assert_eq!(ContentId::from_hex(&id.to_hex()).unwrap(), id);
        }
    }
}
