use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use edms_types::{Iid, RevisionNumber};

use crate::error::LedgerError;

const RECORD_DOMAIN: &[u8] = b"edms-revision-v1:";

/// Immutable record of one committed revision of a partition.
///
/// Records of a partition form a hash chain: `prev_hash` is the
/// `record_hash` of the previous revision, or `None` for revision 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRecord {
    pub partition: Iid,
    pub revision: RevisionNumber,
    pub committed_on: DateTime<Utc>,
    /// Person that issued the write, `None` for bootstrap writes.
    pub actor: Option<Iid>,
    /// Things created or updated, including side effects and ancestors.
    pub changed: Vec<Iid>,
    pub deleted: Vec<Iid>,
    #[serde(with = "hex_opt")]
    pub prev_hash: Option<[u8; 32]>,
    #[serde(with = "hex_bytes")]
    pub record_hash: [u8; 32],
}

impl RevisionRecord {
    /// BLAKE3 over the canonical JSON of the record with a zeroed hash.
    pub fn compute_hash(&self) -> Result<[u8; 32], LedgerError> {
        let mut canonical = self.clone();
        canonical.record_hash = [0; 32];
        let encoded = serde_json::to_vec(&canonical)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(RECORD_DOMAIN);
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.record_hash)
    }
}

/// Permission to write the next revision of a partition.
///
/// A token is bound to the head it was issued against; committing after
/// another writer advanced the head fails with [`LedgerError::StaleToken`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionToken {
    pub(crate) partition: Iid,
    pub(crate) base: RevisionNumber,
    pub(crate) prev_hash: Option<[u8; 32]>,
}

impl RevisionToken {
    pub fn partition(&self) -> Iid {
        self.partition
    }

    /// The revision this token will commit.
    pub fn revision(&self) -> RevisionNumber {
        self.base.next()
    }

    /// The head the token was issued against.
    pub fn base(&self) -> RevisionNumber {
        self.base
    }
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(d)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(&raw, &mut out).map_err(D::Error::custom)?;
        Ok(out)
    }
}

mod hex_opt {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<[u8; 32]>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => super::hex_bytes::serialize(b, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<[u8; 32]>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) => {
                let mut out = [0u8; 32];
                hex::decode_to_slice(&raw, &mut out).map_err(D::Error::custom)?;
                Ok(Some(out))
            }
        }
    }
}
