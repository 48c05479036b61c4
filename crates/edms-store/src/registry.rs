use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use edms_types::{Iid, PartitionKind};

use crate::error::{StoreError, StoreResult};
use crate::partition::Partition;

/// A partition behind its own lock. Writers hold the write guard for a
/// whole transaction; readers get a consistent snapshot at one revision.
pub type SharedPartition = Arc<RwLock<Partition>>;

/// Every partition of a store: the site directory and one per model.
///
/// Lock order when several are held: site directory first, then models.
#[derive(Debug)]
pub struct PartitionRegistry {
    site_directory: SharedPartition,
    models: RwLock<HashMap<Iid, SharedPartition>>,
}

impl PartitionRegistry {
    pub fn new(site_directory_iid: Iid) -> Self {
        Self {
            site_directory: Arc::new(RwLock::new(Partition::new(
                site_directory_iid,
                PartitionKind::SiteDirectory,
            ))),
            models: RwLock::new(HashMap::new()),
        }
    }

    pub fn site_directory(&self) -> SharedPartition {
        Arc::clone(&self.site_directory)
    }

    pub fn site_directory_iid(&self) -> StoreResult<Iid> {
        let guard = self
            .site_directory
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.iid())
    }

    pub fn model(&self, iid: &Iid) -> StoreResult<SharedPartition> {
        let models = self.models.read().map_err(|_| StoreError::LockPoisoned)?;
        models
            .get(iid)
            .cloned()
            .ok_or(StoreError::PartitionNotFound(*iid))
    }

    /// Register an empty model partition rooted at `iid`.
    pub fn create_model(&self, iid: Iid) -> StoreResult<SharedPartition> {
        let mut models = self.models.write().map_err(|_| StoreError::LockPoisoned)?;
        if models.contains_key(&iid) {
            return Err(StoreError::PartitionExists(iid));
        }
        let partition = Arc::new(RwLock::new(Partition::new(
            iid,
            PartitionKind::EngineeringModel,
        )));
        models.insert(iid, Arc::clone(&partition));
        tracing::info!(model = %iid, "model partition registered");
        Ok(partition)
    }

    /// Drop a model partition, e.g. when its creating transaction aborts.
    pub fn remove_model(&self, iid: &Iid) -> StoreResult<bool> {
        let mut models = self.models.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(models.remove(iid).is_some())
    }

    /// The site directory or model partition rooted at `iid`.
    pub fn resolve(&self, iid: &Iid) -> StoreResult<SharedPartition> {
        if self.site_directory_iid()? == *iid {
            return Ok(self.site_directory());
        }
        self.model(iid)
    }

    pub fn model_ids(&self) -> StoreResult<Vec<Iid>> {
        let models = self.models.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut ids: Vec<Iid> = models.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
