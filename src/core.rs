use std::collections::BTreeMap;

use serde::Serialize;

/// JSON-valued configuration payload with deterministic key order.
///
/// Every free-form mapping in the compiler (settings values, extras, declared
/// parameters, component configuration) uses this alias so that serialized
/// output and content fingerprints are stable across compilations.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// A 32-byte BLAKE3 hash used for content-addressing compiled specs.
///
/// Two compilations that produce the same [`Hash32`] for a pipeline spec are
/// behaviorally identical for caching and versioning purposes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    pub fn hash(buffer: impl AsRef<[u8]>) -> Self {
        blake3::Hasher::new()
            .update(buffer.as_ref())
            .finalize()
            .into()
    }

    /// Hashes the canonical JSON encoding of a serializable value.
    pub fn hash_json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::hash(serde_json::to_vec(value)?))
    }

    pub fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = vec![0u8; 64];

        for (i, &byte) in self.0.iter().enumerate() {
            acc[i * 2] = HEX[(byte >> 4) as usize];
            acc[i * 2 + 1] = HEX[(byte & 0xF) as usize];
        }

        String::from_utf8(acc).unwrap()
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding_is_stable() {
        let hash = Hash32::hash(b"pipeline");
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hash, Hash32::hash(b"pipeline"));
        assert_ne!(hash, Hash32::hash(b"pipelines"));
    }

    #[test]
    fn json_hash_ignores_map_insertion_order() {
        let mut a = ConfigMap::new();
        a.insert("cpu".into(), serde_json::json!(4));
        a.insert("memory".into(), serde_json::json!("16Gi"));

        let mut b = ConfigMap::new();
        b.insert("memory".into(), serde_json::json!("16Gi"));
        b.insert("cpu".into(), serde_json::json!(4));

        assert_eq!(
            Hash32::hash_json(&a).unwrap(),
            Hash32::hash_json(&b).unwrap()
        );
    }
}
