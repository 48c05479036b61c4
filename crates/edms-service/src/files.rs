//! File revision payloads and folder bundles.

use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use edms_model::{File, FileRevision, Thing, ThingView};
use edms_store::BlobStore;
use edms_types::Iid;

use crate::error::{ServiceError, ServiceResult};
use crate::request::BundleEntry;

/// The newest revision of `file`.
pub fn latest_revision<'v>(view: &'v dyn ThingView, file: &File) -> Option<&'v FileRevision> {
    file.file_revision
        .iter()
        .filter_map(|id| match view.get(id) {
            Some(Thing::FileRevision(rev)) => Some(rev),
            _ => None,
        })
        .max_by_key(|rev| rev.created_on)
}

/// Content hash of the payload served for a FileRevision or File.
pub fn content_hash_of(view: &dyn ThingView, thing: &Thing) -> ServiceResult<String> {
    match thing {
        Thing::FileRevision(rev) => Ok(rev.content_hash.clone()),
        Thing::File(file) => latest_revision(view, file)
            .map(|rev| rev.content_hash.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("revisions of file {}", file.iid))),
        other => Err(ServiceError::Validation(format!(
            "{} has no single file payload",
            other.class_kind()
        ))),
    }
}

/// Folder names from the outermost folder down to `folder`.
fn folder_chain(view: &dyn ThingView, folder: Option<Iid>) -> Vec<(Iid, String)> {
    let mut chain = Vec::new();
    let mut current = folder;
    while let Some(id) = current {
        if chain.iter().any(|(seen, _)| *seen == id) {
            break;
        }
        match view.get(&id) {
            Some(Thing::Folder(f)) => {
                chain.push((id, f.name.clone()));
                current = f.containing_folder;
            }
            _ => break,
        }
    }
    chain.reverse();
    chain
}

/// Layout of the archive served for a Folder or DomainFileStore.
///
/// One entry per file, taken from its latest revision. Paths are prefixed
/// with folder names; folder bundles start at the requested folder. Folders
/// are not listed themselves, so empty folders do not appear.
pub fn bundle(view: &dyn ThingView, root: &Iid) -> ServiceResult<Vec<BundleEntry>> {
    let (store, scope) = match view.get(root) {
        Some(Thing::DomainFileStore(_)) => (*root, None),
        Some(Thing::Folder(_)) => {
            let store = view
                .container_of(root)
                .ok_or_else(|| ServiceError::NotFound(format!("file store of folder {root}")))?;
            (store, Some(*root))
        }
        Some(other) => {
            return Err(ServiceError::Validation(format!(
                "{} cannot be bundled",
                other.class_kind()
            )))
        }
        None => return Err(ServiceError::NotFound(root.to_string())),
    };
    let Some(Thing::DomainFileStore(store)) = view.get(&store) else {
        return Err(ServiceError::NotFound(format!("file store {store}")));
    };

    let mut entries = Vec::new();
    for id in &store.file {
        let Some(Thing::File(file)) = view.get(id) else {
            continue;
        };
        let Some(rev) = latest_revision(view, file) else {
            continue;
        };
        let mut chain = folder_chain(view, rev.containing_folder);
        if let Some(scope) = scope {
            match chain.iter().position(|(id, _)| *id == scope) {
                Some(start) => {
                    chain.drain(..start);
                }
                None => continue,
            }
        }
        let mut path: Vec<String> = chain.into_iter().map(|(_, name)| name).collect();
        path.push(rev.file_name());
        entries.push(BundleEntry {
            path: path.join("/"),
            content_hash: rev.content_hash.clone(),
            size: rev.size,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Zip archive holding the content of every entry at its bundle path. No
/// directory entries are written.
pub fn archive(entries: &[BundleEntry], blobs: &dyn BlobStore) -> ServiceResult<Bytes> {
    let zip_error = |e: zip::result::ZipError| ServiceError::Internal(format!("zip archive: {e}"));
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let data = blobs.get(&entry.content_hash)?.ok_or_else(|| {
            ServiceError::NotFound(format!("file content {}", entry.content_hash))
        })?;
        writer
            .start_file(entry.path.as_str(), SimpleFileOptions::default())
            .map_err(zip_error)?;
        writer
            .write_all(&data)
            .map_err(|e| ServiceError::Internal(format!("zip archive: {e}")))?;
    }
    let cursor = writer.finish().map_err(zip_error)?;
    Ok(Bytes::from(cursor.into_inner()))
}
