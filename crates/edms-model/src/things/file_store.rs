//! Domain file stores, folders, files and their immutable revisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use edms_types::{Iid, RevisionNumber};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainFileStore {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub owner: Iid,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub folder: Vec<Iid>,
    #[serde(default)]
    pub file: Vec<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub owner: Iid,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub containing_folder: Option<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub owner: Iid,
    #[serde(default)]
    pub locked_by: Option<Iid>,
    #[serde(default)]
    pub file_revision: Vec<Iid>,
}

/// One uploaded version of a file. Content lives in the blob store and is
/// addressed by `content_hash`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRevision {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    #[serde(default)]
    pub extension: String,
    pub content_hash: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub containing_folder: Option<Iid>,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub creator: Option<Iid>,
}

impl FileRevision {
    /// `name.extension`, or just `name` when there is no extension.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}
