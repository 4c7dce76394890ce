use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Width of an [`ObjectId`] in bytes.
pub const OBJECT_ID_LEN: usize = 32;

/// Content address of a tree, blob, or commit.
///
/// Two objects with the same `ObjectId` are bit-identical, recursively: a
/// tree id covers every entry name, kind, and child id beneath it. The diff
/// engine relies on this as its only equality primitive and never looks
/// inside two objects whose ids match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Hash `data` under a domain tag.
    ///
    /// The tag is prepended before hashing so that a blob and a tree with
    /// identical bytes never share an id.
    pub fn hash_with_domain(domain: &str, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; OBJECT_ID_LEN]) -> Self {
        Self(hash)
    }

    /// The null id (all zeros). Never the id of a stored object.
    pub const fn null() -> Self {
        Self([0u8; OBJECT_ID_LEN])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex (first 4 bytes), for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse a full-length hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let arr: [u8; OBJECT_ID_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| TypeError::InvalidLength {
                    expected: OBJECT_ID_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

// Ids travel as hex strings in JSON/TOML so that status reports and configs
// stay readable.
impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        let id1 = ObjectId::hash_with_domain("blob", b"hello world");
        let id2 = ObjectId::hash_with_domain("blob", b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn domain_separates_identical_bytes() {
        let blob = ObjectId::hash_with_domain("blob", b"same");
        let tree = ObjectId::hash_with_domain("tree", b"same");
        assert_ne!(blob, tree);
    }

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert!(!ObjectId::from_hash([7; 32]).is_null());
    }

    #[test]
    fn parse_from_str() {
        let id = ObjectId::hash_with_domain("blob", b"parse me");
        let parsed: ObjectId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_short_hex() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            ObjectId::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn debug_uses_short_form() {
        let id = ObjectId::from_hash([0xab; 32]);
        assert_eq!(format!("{id:?}"), "ObjectId(abababab)");
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ObjectId::from_hash([1; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ordering_is_bytewise() {
        let low = ObjectId::from_hash([0; 32]);
        let high = ObjectId::from_hash([1; 32]);
        assert!(low < high);
    }
}
