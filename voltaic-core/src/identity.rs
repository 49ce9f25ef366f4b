//! Identity types: tenant/record ids, timestamps, and content digests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 digest of an uploaded file's bytes.
///
/// Every upload is stamped with the digest of the bytes being sent so the
/// gateway can deduplicate documents (the same invoice PDF uploaded twice
/// resolves to one stored file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn compute(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, the form the gateway wire contract uses.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

macro_rules! typed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh UUIDv7 identifier.
            pub fn now_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(
    /// Tenant (organization) identifier. Every gateway call and cache entry
    /// is scoped to exactly one tenant.
    TenantId
);

typed_id!(
    /// Identifier of a single gateway record.
    RecordId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_v7_and_sortable() {
        let id1 = RecordId::now_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = RecordId::now_v7();
        assert_eq!(id1.as_uuid().get_version_num(), 7);
        // UUIDv7 embeds a Unix timestamp, so later ids sort later.
        assert!(id1 < id2);
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let content = b"invoice.pdf bytes";
        let hash = ContentHash::compute(content);
        assert_eq!(hash, ContentHash::compute(content));
        assert_ne!(hash, ContentHash::compute(b"other bytes"));
    }

    #[test]
    fn test_content_hash_hex_matches_sha256() {
        let hash = ContentHash::compute(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash.to_string(), hash.to_hex());
    }

    #[test]
    fn test_typed_id_round_trip() {
        let raw = Uuid::now_v7();
        let tenant = TenantId::new(raw);
        assert_eq!(tenant.as_uuid(), raw);
        assert_eq!(tenant, TenantId::from(raw));
        assert_eq!(tenant.to_string(), raw.to_string());
    }

    #[test]
    fn test_typed_id_serde_transparent() {
        let record = RecordId::now_v7();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, format!("\"{}\"", record.as_uuid()));
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
