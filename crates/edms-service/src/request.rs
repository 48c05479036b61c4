//! Request and response shapes of the write and read operations.

use std::collections::BTreeMap;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use edms_model::{Patch, Thing};
use edms_types::{Iid, RevisionNumber};

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// One Thing to create under an existing (or earlier created) container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateItem {
    pub container: Iid,
    /// Sort key when the container holds this class in an ordered slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<i64>,
    pub thing: Thing,
}

/// Field-level changes to one existing Thing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub iid: Iid,
    #[serde(flatten)]
    pub patch: Patch,
}

/// A single atomic write against one partition.
///
/// Processed in the order delete, create, update. `files` carries file
/// revision payloads keyed by content hash, hex-encoded on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub delete: Vec<Iid>,
    #[serde(default)]
    pub create: Vec<CreateItem>,
    #[serde(default)]
    pub update: Vec<UpdateItem>,
    #[serde(default, with = "hex_payloads", skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, Bytes>,
}

impl WriteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.create.is_empty() && self.update.is_empty()
    }

    pub fn delete(mut self, iid: Iid) -> Self {
        self.delete.push(iid);
        self
    }

    pub fn create(mut self, container: Iid, thing: Thing) -> Self {
        self.create.push(CreateItem {
            container,
            key: None,
            thing,
        });
        self
    }

    pub fn create_at(mut self, container: Iid, key: i64, thing: Thing) -> Self {
        self.create.push(CreateItem {
            container,
            key: Some(key),
            thing,
        });
        self
    }

    pub fn update(mut self, iid: Iid, patch: Patch) -> Self {
        self.update.push(UpdateItem { iid, patch });
        self
    }

    pub fn file(mut self, content_hash: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.files.insert(content_hash.into(), data.into());
        self
    }
}

mod hex_payloads {
    use std::collections::BTreeMap;

    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(files: &BTreeMap<String, Bytes>, s: S) -> Result<S::Ok, S::Error> {
        files
            .iter()
            .map(|(hash, data)| (hash.as_str(), hex::encode(data)))
            .collect::<BTreeMap<_, _>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, Bytes>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(d)?;
        let mut out = BTreeMap::new();
        for (hash, text) in encoded {
            let data = hex::decode(&text).map_err(serde::de::Error::custom)?;
            out.insert(hash, Bytes::from(data));
        }
        Ok(out)
    }
}

/// Commit of a model partition produced as a side effect of a site
/// directory write (model creation or iteration branching).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCommit {
    pub model: Iid,
    pub revision: RevisionNumber,
    pub things: Vec<Thing>,
}

/// Result of an accepted write: the new revision and every Thing whose
/// revision it raised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub revision: RevisionNumber,
    pub things: Vec<Thing>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_commits: Vec<ModelCommit>,
}

impl WriteResponse {
    /// The returned state of `iid`, if the write touched it.
    pub fn thing(&self, iid: &Iid) -> Option<&Thing> {
        self.things.iter().find(|t| t.iid() == *iid)
    }

    pub fn contains(&self, iid: &Iid) -> bool {
        self.thing(iid).is_some()
    }
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// How much of the containment tree a read returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extent {
    #[default]
    Shallow,
    Deep,
}

/// A revision bound given as a number or an RFC 3339 instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionSelector {
    Number(RevisionNumber),
    At(DateTime<Utc>),
}

impl FromStr for RevisionSelector {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(number) = s.parse::<RevisionNumber>() {
            return Ok(Self::Number(number));
        }
        DateTime::parse_from_rfc3339(s.trim())
            .map(|at| Self::At(at.with_timezone(&Utc)))
            .map_err(|_| {
                ServiceError::Validation(format!(
                    "'{s}' is neither a revision number nor an RFC 3339 timestamp"
                ))
            })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub include_all_containers: bool,
    pub extent: Extent,
    pub include_file_data: bool,
    pub revision_from: Option<RevisionSelector>,
    pub revision_to: Option<RevisionSelector>,
}

impl ReadOptions {
    pub fn deep() -> Self {
        Self {
            extent: Extent::Deep,
            ..Default::default()
        }
    }

    pub fn with_containers(mut self) -> Self {
        self.include_all_containers = true;
        self
    }

    pub fn file_data() -> Self {
        Self {
            include_file_data: true,
            ..Default::default()
        }
    }

    pub fn revisions(from: RevisionSelector, to: Option<RevisionSelector>) -> Self {
        Self {
            revision_from: Some(from),
            revision_to: to,
            ..Default::default()
        }
    }

    pub fn is_revision_query(&self) -> bool {
        self.revision_from.is_some() || self.revision_to.is_some()
    }
}

/// One file of a folder or file-store bundle: where it lands in the archive
/// and which blob fills it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Folder names and file name joined by `/`.
    pub path: String,
    pub content_hash: String,
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReadResponse {
    Things(Vec<Thing>),
    FileData(Bytes),
    /// Zip archive of a Folder or DomainFileStore.
    Archive(Bytes),
}

impl ReadResponse {
    /// The returned Things, empty for file payloads.
    pub fn things(&self) -> &[Thing] {
        match self {
            Self::Things(things) => things,
            Self::FileData(_) | Self::Archive(_) => &[],
        }
    }
}
