//! The transactional front of the store: every read and write goes through
//! [`EdmsService`].

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::RwLockWriteGuard;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use edms_engine::{apply_invariants, MAX_ROUNDS};
use edms_gate::{
    AccessGate, AccessRequest, Actor, FrozenIterationStage, GateConfig, Operation,
    VisibilityStage,
};
use edms_ledger::{
    ChainValidator, InMemoryLedger, LedgerReader, LedgerWriter, RevisionRecord, ValidationReport,
};
use edms_model::{
    apply_patch, detached, EngineeringModel, EngineeringModelSetup, Iteration, IterationSetup,
    Participant, Person, SiteDirectory, Thing, ThingView,
};
use edms_store::{
    BlobStore, Change, FsBlobStore, InMemoryBlobStore, Partition, PartitionRegistry, SharedPartition,
};
use edms_types::{ClassKind, Iid, PartitionKind, RevisionNumber};

use crate::access::{request_for, request_for_create, resolve_actor};
use crate::branch::copy_iteration;
use crate::error::{ServiceError, ServiceResult};
use crate::files::{archive, bundle, content_hash_of};
use crate::overlay::Overlay;
use crate::request::{
    Extent, ModelCommit, ReadOptions, ReadResponse, RevisionSelector, WriteRequest, WriteResponse,
};

/// Person id used for unauthenticated reads.
const ANONYMOUS: Iid = Iid::from_u128(0);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub gate: GateConfig,
    /// Directory for file revision payloads; kept in memory when unset.
    pub blob_dir: Option<PathBuf>,
}

/// Iids produced by [`EdmsService::bootstrap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bootstrap {
    pub site_directory: Iid,
    pub admin: Iid,
}

/// Iids produced by [`EdmsService::create_model`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelHandle {
    pub setup: Iid,
    pub model: Iid,
    pub iteration_setup: Iid,
    pub iteration: Iid,
    pub participant: Iid,
}

/// A model partition that a site directory write creates.
struct NewModel {
    model: Iid,
    setup: Iid,
    iteration: Iid,
    iteration_setup: Iid,
}

/// An iteration a site directory write branches off.
struct Branch {
    model: Iid,
    source: Iid,
    iteration: Iid,
    iteration_setup: Iid,
}

fn poisoned() -> ServiceError {
    ServiceError::Internal("partition lock poisoned".into())
}

// ---------------------------------------------------------------------------
// EdmsService
// ---------------------------------------------------------------------------

/// Revision-tracked engineering data store.
///
/// Each write is one transaction against one partition: authorize, stage,
/// run the synchronization engines to a fixpoint, then commit a single new
/// revision. Failures leave the partition untouched.
pub struct EdmsService {
    registry: PartitionRegistry,
    ledger: InMemoryLedger,
    blobs: Box<dyn BlobStore>,
    gate: AccessGate,
    anonymous_gate: AccessGate,
}

impl EdmsService {
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let blobs: Box<dyn BlobStore> = match &config.blob_dir {
            Some(dir) => Box::new(FsBlobStore::open(dir)?),
            None => Box::new(InMemoryBlobStore::new()),
        };
        Ok(Self::with_blob_store(config.gate, blobs))
    }

    /// A store keeping everything in memory, with the default gate.
    pub fn in_memory() -> Self {
        Self::with_blob_store(GateConfig::default(), Box::new(InMemoryBlobStore::new()))
    }

    pub fn with_blob_store(gate: GateConfig, blobs: Box<dyn BlobStore>) -> Self {
        // Anonymous readers see what is not frozen out or hidden.
        let mut anonymous_gate = AccessGate::new(gate.clone());
        anonymous_gate.add_stage(Box::new(FrozenIterationStage));
        anonymous_gate.add_stage(Box::new(VisibilityStage));
        Self {
            registry: PartitionRegistry::new(Iid::new()),
            ledger: InMemoryLedger::new(),
            blobs,
            gate: AccessGate::with_default_stages(gate),
            anonymous_gate,
        }
    }

    pub fn site_directory_iid(&self) -> ServiceResult<Iid> {
        Ok(self.registry.site_directory_iid()?)
    }

    pub fn model_ids(&self) -> ServiceResult<Vec<Iid>> {
        Ok(self.registry.model_ids()?)
    }

    /// Current revision of a partition.
    pub fn revision(&self, partition: &Iid) -> ServiceResult<RevisionNumber> {
        let shared = self.registry.resolve(partition)?;
        let guard = shared.read().map_err(|_| poisoned())?;
        Ok(guard.revision())
    }

    /// Committed revision records of a partition, oldest first.
    pub fn revisions(&self, partition: &Iid) -> ServiceResult<Vec<RevisionRecord>> {
        Ok(self.ledger.read_all(partition)?)
    }

    /// Check the hash chain of a partition's revision records.
    pub fn verify(&self, partition: &Iid) -> ServiceResult<ValidationReport> {
        Ok(ChainValidator::validate(&self.ledger, partition)?)
    }

    /// Iid of the active person with `short_name`.
    pub fn person_by_short_name(&self, short_name: &str) -> ServiceResult<Option<Iid>> {
        let shared = self.registry.site_directory();
        let sd = shared.read().map_err(|_| poisoned())?;
        Ok(sd
            .of_kind(ClassKind::Person)
            .into_iter()
            .find(|id| {
                matches!(sd.get(id), Some(Thing::Person(p)) if p.short_name == short_name && p.is_active)
            }))
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// Create the site directory root and its first administrator.
    pub fn bootstrap(&self, site_name: &str, admin_short_name: &str) -> ServiceResult<Bootstrap> {
        let shared = self.registry.site_directory();
        let mut sd = shared.write().map_err(|_| poisoned())?;
        if sd.revision() != RevisionNumber::ZERO {
            return Err(ServiceError::Validation(
                "site directory is already initialized".into(),
            ));
        }
        let root = sd.iid();
        let admin = Iid::new();
        let mut site = SiteDirectory::new(root, site_name);
        site.person.push(admin);
        let mut person = Person::new(admin, admin_short_name);
        person.is_site_admin = true;

        let changes = vec![
            Change::Upsert {
                container: None,
                thing: Thing::SiteDirectory(site),
            },
            Change::Upsert {
                container: Some(root),
                thing: Thing::Person(person),
            },
        ];
        self.commit(&mut sd, None, changes)?;
        Ok(Bootstrap {
            site_directory: root,
            admin,
        })
    }

    /// Create an engineering model with its first iteration, and make
    /// `person` a participant acting for `domains`.
    pub fn create_model(
        &self,
        person: &Iid,
        name: &str,
        short_name: &str,
        domains: Vec<Iid>,
    ) -> ServiceResult<ModelHandle> {
        let root = self.site_directory_iid()?;
        let setup = Iid::new();
        let model = Iid::new();
        let participant = Iid::new();
        let request = WriteRequest::new()
            .create(
                root,
                Thing::EngineeringModelSetup(EngineeringModelSetup::new(
                    setup, name, short_name, model,
                )),
            )
            .create(
                setup,
                Thing::Participant(Participant::new(participant, *person, domains)),
            );
        let response = self.write(person, &root, request)?;
        let (iteration_setup, iteration) = response
            .things
            .iter()
            .find_map(|t| match t {
                Thing::IterationSetup(s) => s.iteration_iid.map(|it| (s.iid, it)),
                _ => None,
            })
            .ok_or_else(|| ServiceError::Internal("model created without an iteration".into()))?;
        Ok(ModelHandle {
            setup,
            model,
            iteration_setup,
            iteration,
            participant,
        })
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    /// Apply `request` to `partition` as one atomic revision.
    pub fn write(
        &self,
        person: &Iid,
        partition: &Iid,
        request: WriteRequest,
    ) -> ServiceResult<WriteResponse> {
        if *partition == self.site_directory_iid()? {
            self.write_site_directory(person, request)
        } else {
            let shared = self.registry.model(partition)?;
            self.write_model(person, partition, &shared, request)
        }
    }

    fn write_model(
        &self,
        person: &Iid,
        partition: &Iid,
        shared: &SharedPartition,
        request: WriteRequest,
    ) -> ServiceResult<WriteResponse> {
        let sd_shared = self.registry.site_directory();
        let sd = sd_shared.read().map_err(|_| poisoned())?;
        let actor = resolve_actor(&*sd, person, Some(partition))?;
        let components = component_table(&sd);
        let mut model = shared.write().map_err(|_| poisoned())?;

        let mut overlay = Overlay::new(&*model);
        self.stage(&actor, &*sd, &mut overlay, &request, PartitionKind::EngineeringModel)?;
        check_parameters(&overlay, &components)?;
        self.store_files(&request)?;
        self.complete_file_revisions(&actor, &mut overlay)?;
        settle(&mut overlay, &components)?;

        if overlay.is_empty() {
            return Ok(WriteResponse {
                revision: model.revision(),
                things: Vec::new(),
                model_commits: Vec::new(),
            });
        }
        let changes = overlay.into_changes();
        let (revision, things) = self.commit(&mut model, Some(*person), changes)?;
        Ok(WriteResponse {
            revision,
            things,
            model_commits: Vec::new(),
        })
    }

    fn write_site_directory(
        &self,
        person: &Iid,
        request: WriteRequest,
    ) -> ServiceResult<WriteResponse> {
        let sd_shared = self.registry.site_directory();
        let mut sd = sd_shared.write().map_err(|_| poisoned())?;
        let actor = resolve_actor(&*sd, person, None)?;

        // Models that new iteration setups branch off are locked up front,
        // after the site directory.
        let branched = self.branched_models(&sd, &request)?;
        let mut guards: BTreeMap<Iid, RwLockWriteGuard<'_, Partition>> = BTreeMap::new();
        for (model, shared) in &branched {
            guards.insert(*model, shared.write().map_err(|_| poisoned())?);
        }

        let mut overlay = Overlay::new(&*sd);
        self.stage(&actor, &*sd, &mut overlay, &request, PartitionKind::SiteDirectory)?;
        let branches = self.plan_branches(&mut overlay, &request)?;
        let new_models = self.plan_models(&mut overlay)?;
        let retired = retired_models(&sd, &overlay);
        // Site directory classes carry no derived state; no invariant rounds.

        if overlay.is_empty() {
            return Ok(WriteResponse {
                revision: sd.revision(),
                things: Vec::new(),
                model_commits: Vec::new(),
            });
        }

        let mut model_changes = Vec::new();
        for (model, guard) in &guards {
            let mut model_overlay = Overlay::new(&**guard);
            for branch in branches.iter().filter(|b| b.model == *model) {
                let copy = copy_iteration(
                    &model_overlay,
                    &branch.source,
                    branch.iteration,
                    branch.iteration_setup,
                )?;
                model_overlay.create(*model, copy.iteration, None)?;
                for (container, thing) in copy.contents {
                    model_overlay.stage(container, thing);
                }
            }
            model_changes.push((*model, model_overlay.into_changes()));
        }

        let changes = overlay.into_changes();
        let (revision, things) = self.commit(&mut sd, Some(*person), changes)?;

        let mut model_commits = Vec::new();
        for (model, changes) in model_changes {
            if let Some(guard) = guards.get_mut(&model) {
                let (revision, things) = self.commit(guard, Some(*person), changes)?;
                model_commits.push(ModelCommit {
                    model,
                    revision,
                    things,
                });
            }
        }
        for new in new_models {
            model_commits.push(self.open_model(person, &new)?);
        }
        for model in retired {
            self.registry.remove_model(&model)?;
            info!(model = %model, "model partition retired");
        }

        Ok(WriteResponse {
            revision,
            things,
            model_commits,
        })
    }

    /// Apply deletes, creates and updates in that order.
    fn stage(
        &self,
        actor: &Actor,
        site_directory: &dyn ThingView,
        overlay: &mut Overlay<'_>,
        request: &WriteRequest,
        partition: PartitionKind,
    ) -> ServiceResult<()> {
        for iid in &request.delete {
            if overlay.delta().deleted.contains(iid) {
                continue;
            }
            let thing = overlay
                .get(iid)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(iid.to_string()))?;
            if overlay.container_of(iid).is_none() {
                return Err(ServiceError::Validation(format!(
                    "partition root {iid} cannot be deleted"
                )));
            }
            if thing.class_kind().is_derived() {
                return Err(ServiceError::Validation(format!(
                    "{} objects are maintained by the server",
                    thing.class_kind()
                )));
            }
            self.authorize(
                actor,
                &request_for(site_directory, &*overlay, Operation::Delete, iid)?,
            )?;
            match thing {
                Thing::IterationSetup(mut setup) => {
                    setup.is_deleted = true;
                    overlay.replace(Thing::IterationSetup(setup));
                }
                _ => overlay.delete(*iid)?,
            }
        }

        for item in &request.create {
            let kind = item.thing.class_kind();
            if kind.partition() != partition {
                return Err(ServiceError::Validation(format!(
                    "{kind} does not belong in a {partition:?} partition"
                )));
            }
            if kind.is_derived()
                || matches!(
                    kind,
                    ClassKind::SiteDirectory | ClassKind::EngineeringModel | ClassKind::Iteration
                )
            {
                return Err(ServiceError::Validation(format!(
                    "{kind} objects are created by the server"
                )));
            }
            let thing = detached(&item.thing)?;
            self.authorize(
                actor,
                &request_for_create(site_directory, &*overlay, &item.container, &thing)?,
            )?;
            overlay.create(item.container, thing, item.key)?;
        }

        for item in &request.update {
            let current = overlay
                .get(&item.iid)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(item.iid.to_string()))?;
            self.authorize(
                actor,
                &request_for(site_directory, &*overlay, Operation::Update, &item.iid)?,
            )?;
            let updated = apply_patch(&current, &item.patch)?;
            if updated != current {
                overlay.replace(updated);
            }
        }
        Ok(())
    }

    fn authorize(&self, actor: &Actor, request: &AccessRequest) -> ServiceResult<()> {
        let gate = if actor.person == ANONYMOUS {
            &self.anonymous_gate
        } else {
            &self.gate
        };
        let result = gate.evaluate(actor, request)?;
        match result.denial() {
            None => Ok(()),
            Some((kind, reason)) => {
                warn!(
                    person = %actor.person,
                    target = %request.target,
                    operation = ?request.operation,
                    denial = ?kind,
                    "request denied"
                );
                Err(ServiceError::denied(kind, reason))
            }
        }
    }

    fn store_files(&self, request: &WriteRequest) -> ServiceResult<()> {
        for (hash, data) in &request.files {
            self.blobs.put_verified(hash, data.clone())?;
        }
        Ok(())
    }

    /// Every new file revision must have its content in the blob store;
    /// size and creator are filled in from the upload and the actor.
    fn complete_file_revisions(&self, actor: &Actor, overlay: &mut Overlay<'_>) -> ServiceResult<()> {
        let created: Vec<Iid> = overlay.delta().created.iter().copied().collect();
        for iid in created {
            let Some(Thing::FileRevision(mut revision)) = overlay.get(&iid).cloned() else {
                continue;
            };
            let data = self.blobs.get(&revision.content_hash)?.ok_or_else(|| {
                ServiceError::Validation(format!(
                    "no content uploaded for hash {}",
                    revision.content_hash
                ))
            })?;
            revision.size = data.len() as u64;
            revision.creator.get_or_insert(actor.person);
            overlay.replace(Thing::FileRevision(revision));
        }
        Ok(())
    }

    /// Model partitions that new iteration setups in `request` branch off.
    fn branched_models(
        &self,
        sd: &Partition,
        request: &WriteRequest,
    ) -> ServiceResult<BTreeMap<Iid, SharedPartition>> {
        let mut out = BTreeMap::new();
        for item in &request.create {
            if item.thing.class_kind() != ClassKind::IterationSetup {
                continue;
            }
            let Some(Thing::EngineeringModelSetup(setup)) = sd.get(&item.container) else {
                return Err(ServiceError::Validation(format!(
                    "iteration setups must be created under an existing model setup, not {}",
                    item.container
                )));
            };
            let model = setup.engineering_model_iid;
            if !out.contains_key(&model) {
                out.insert(model, self.registry.model(&model)?);
            }
        }
        Ok(out)
    }

    /// Complete client-created iteration setups and freeze their sources.
    fn plan_branches(
        &self,
        overlay: &mut Overlay<'_>,
        request: &WriteRequest,
    ) -> ServiceResult<Vec<Branch>> {
        let mut branches = Vec::new();
        let now = Utc::now();
        for item in &request.create {
            let Thing::IterationSetup(requested) = &item.thing else {
                continue;
            };
            let Some(Thing::EngineeringModelSetup(model_setup)) = overlay.get(&item.container).cloned()
            else {
                continue;
            };
            let siblings: Vec<IterationSetup> = model_setup
                .iteration_setup
                .iter()
                .filter(|id| **id != requested.iid)
                .filter_map(|id| match overlay.get(id) {
                    Some(Thing::IterationSetup(s)) => Some(s.clone()),
                    _ => None,
                })
                .collect();
            let source = match requested.source_iteration_setup {
                Some(id) => siblings.iter().find(|s| s.iid == id && !s.is_deleted),
                None => siblings
                    .iter()
                    .filter(|s| !s.is_deleted)
                    .max_by_key(|s| s.iteration_number),
            }
            .cloned()
            .ok_or_else(|| {
                ServiceError::Validation("no live iteration setup to branch from".into())
            })?;
            let source_iteration = source.iteration_iid.ok_or_else(|| {
                ServiceError::Validation(format!("iteration setup {} has no iteration", source.iid))
            })?;

            let iteration = Iid::new();
            let number = siblings.iter().map(|s| s.iteration_number).max().unwrap_or(0) + 1;
            let mut created = IterationSetup::new(requested.iid, number, iteration);
            created.description = requested.description.clone();
            created.source_iteration_setup = Some(source.iid);
            created.created_on = now;
            overlay.replace(Thing::IterationSetup(created));

            let mut frozen = source;
            frozen.frozen_on = Some(now);
            let source_setup = frozen.iid;
            overlay.replace(Thing::IterationSetup(frozen));
            info!(source = %source_setup, setup = %requested.iid, "iteration branched");

            branches.push(Branch {
                model: model_setup.engineering_model_iid,
                source: source_iteration,
                iteration,
                iteration_setup: requested.iid,
            });
        }
        Ok(branches)
    }

    /// Give every new model setup its first iteration setup.
    fn plan_models(&self, overlay: &mut Overlay<'_>) -> ServiceResult<Vec<NewModel>> {
        let created: Vec<Iid> = overlay.delta().created.iter().copied().collect();
        let mut out = Vec::new();
        for iid in created {
            let Some(Thing::EngineeringModelSetup(setup)) = overlay.get(&iid).cloned() else {
                continue;
            };
            let model = setup.engineering_model_iid;
            if self.registry.model(&model).is_ok() {
                return Err(ServiceError::Validation(format!("model {model} already exists")));
            }
            let iteration_setup = Iid::new();
            let iteration = Iid::new();
            overlay.create(
                setup.iid,
                Thing::IterationSetup(IterationSetup::new(iteration_setup, 1, iteration)),
                None,
            )?;
            out.push(NewModel {
                model,
                setup: setup.iid,
                iteration,
                iteration_setup,
            });
        }
        Ok(out)
    }

    /// Register and commit the first revision of a new model partition.
    fn open_model(&self, person: &Iid, new: &NewModel) -> ServiceResult<ModelCommit> {
        let shared = self.registry.create_model(new.model)?;
        let mut partition = shared.write().map_err(|_| poisoned())?;
        let mut root = EngineeringModel::new(new.model, new.setup);
        root.iteration.push(new.iteration);
        let changes = vec![
            Change::Upsert {
                container: None,
                thing: Thing::EngineeringModel(root),
            },
            Change::Upsert {
                container: Some(new.model),
                thing: Thing::Iteration(Iteration::new(new.iteration, new.iteration_setup)),
            },
        ];
        let (revision, things) = self.commit(&mut partition, Some(*person), changes)?;
        Ok(ModelCommit {
            model: new.model,
            revision,
            things,
        })
    }

    /// Record the next revision in the ledger, then apply `changes` to the
    /// partition under that revision.
    fn commit(
        &self,
        partition: &mut Partition,
        actor: Option<Iid>,
        changes: Vec<Change>,
    ) -> ServiceResult<(RevisionNumber, Vec<Thing>)> {
        let id = partition.iid();
        let token = self.ledger.issue(&id)?;
        if token.base() != partition.revision() {
            return Err(ServiceError::Internal(format!(
                "ledger head {} disagrees with partition revision {}",
                token.base(),
                partition.revision()
            )));
        }
        let mut changed = Vec::new();
        let mut deleted = Vec::new();
        for change in &changes {
            match change {
                Change::Upsert { thing, .. } => changed.push(thing.iid()),
                Change::Delete(iid) => deleted.push(*iid),
            }
        }
        let record = self.ledger.commit(token, actor, changed.clone(), deleted.clone())?;
        partition.commit(record.revision, changes)?;
        info!(
            partition = %id,
            revision = record.revision.get(),
            changed = changed.len(),
            deleted = deleted.len(),
            "write committed"
        );
        let things = changed
            .iter()
            .filter_map(|iid| partition.get(iid).cloned())
            .collect();
        Ok((record.revision, things))
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Read `iid` from `partition`. `person` is `None` for anonymous access.
    pub fn read(
        &self,
        person: Option<&Iid>,
        partition: &Iid,
        iid: &Iid,
        options: &ReadOptions,
    ) -> ServiceResult<ReadResponse> {
        let sd_shared = self.registry.site_directory();
        let sd = sd_shared.read().map_err(|_| poisoned())?;
        let is_site_directory = *partition == sd.iid();
        let actor = match person {
            Some(person) => resolve_actor(&*sd, person, (!is_site_directory).then_some(partition))?,
            None => Actor::new(ANONYMOUS),
        };

        if is_site_directory {
            return self.read_in(&actor, &sd, &sd, iid, options);
        }
        let shared = self.registry.model(partition)?;
        let model = shared.read().map_err(|_| poisoned())?;
        self.read_in(&actor, &sd, &model, iid, options)
    }

    fn read_in(
        &self,
        actor: &Actor,
        sd: &Partition,
        partition: &Partition,
        iid: &Iid,
        options: &ReadOptions,
    ) -> ServiceResult<ReadResponse> {
        if options.is_revision_query() {
            return self.read_revisions(actor, sd, partition, iid, options);
        }

        self.authorize(actor, &request_for(sd, partition, Operation::Read, iid)?)?;
        let thing = partition
            .get(iid)
            .ok_or_else(|| ServiceError::NotFound(iid.to_string()))?;

        if options.include_file_data {
            return match thing.class_kind() {
                ClassKind::FileRevision | ClassKind::File => {
                    let hash = content_hash_of(partition, thing)?;
                    let data = self
                        .blobs
                        .get(&hash)?
                        .ok_or_else(|| ServiceError::NotFound(format!("file content {hash}")))?;
                    Ok(ReadResponse::FileData(data))
                }
                ClassKind::Folder | ClassKind::DomainFileStore => {
                    let entries = bundle(partition, iid)?;
                    debug!(iid = %iid, files = entries.len(), "bundling");
                    Ok(ReadResponse::Archive(archive(&entries, self.blobs.as_ref())?))
                }
                other => Err(ServiceError::Validation(format!("{other} carries no file data"))),
            };
        }

        let mut out = Vec::new();
        if options.include_all_containers {
            let mut containers = partition.ancestors(iid);
            containers.reverse();
            out.extend(containers.iter().filter_map(|id| partition.get(id).cloned()));
        }
        out.push(thing.clone());
        if options.extent == Extent::Deep {
            for id in partition.descendants(iid) {
                let readable = request_for(sd, partition, Operation::Read, &id)
                    .and_then(|request| self.authorize(actor, &request))
                    .is_ok();
                if readable {
                    out.extend(partition.get(&id).cloned());
                }
            }
        }
        debug!(iid = %iid, things = out.len(), "read");
        Ok(ReadResponse::Things(out))
    }

    /// Historical states of `iid` within an inclusive revision range.
    fn read_revisions(
        &self,
        actor: &Actor,
        sd: &Partition,
        partition: &Partition,
        iid: &Iid,
        options: &ReadOptions,
    ) -> ServiceResult<ReadResponse> {
        let from = match options.revision_from {
            Some(selector) => self.resolve_revision(partition, selector)?,
            None => RevisionNumber::ZERO,
        };
        let to = match options.revision_to {
            Some(selector) => self.resolve_revision(partition, selector)?,
            None => partition.revision(),
        };
        if from > to {
            return Err(ServiceError::Validation(format!(
                "revision range {from}..={to} is empty"
            )));
        }
        let states = partition.states_between(iid, from, to);
        let Some(latest) = states.last() else {
            return Err(ServiceError::NotFound(format!("{iid} in revisions {from}..={to}")));
        };
        let request = if partition.contains(iid) {
            request_for(sd, partition, Operation::Read, iid)?
        } else {
            AccessRequest::new(Operation::Read, latest.class_kind(), *iid)
                .owned_by(latest.owner())
                .hidden(latest.is_hidden())
                .locked_by(latest.locked_by())
        };
        self.authorize(actor, &request)?;
        Ok(ReadResponse::Things(states))
    }

    fn resolve_revision(
        &self,
        partition: &Partition,
        selector: RevisionSelector,
    ) -> ServiceResult<RevisionNumber> {
        match selector {
            RevisionSelector::Number(number) => Ok(number),
            RevisionSelector::At(at) => Ok(self.ledger.revision_at(&partition.iid(), at)?),
        }
    }
}

impl std::fmt::Debug for EdmsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdmsService")
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Component counts of every parameter type in the site directory.
pub fn component_table(site_directory: &Partition) -> HashMap<Iid, usize> {
    site_directory
        .graph()
        .iter()
        .filter_map(|thing| match thing {
            Thing::ParameterType(t) => Some((t.iid, t.component_count())),
            _ => None,
        })
        .collect()
}

/// Every created or updated Parameter must name a parameter type of the site
/// directory, and no two Parameters of one element definition may share a
/// type.
fn check_parameters(overlay: &Overlay<'_>, components: &HashMap<Iid, usize>) -> ServiceResult<()> {
    let delta = overlay.delta();
    for iid in delta.created.iter().chain(&delta.updated) {
        let Some(Thing::Parameter(parameter)) = overlay.get(iid) else {
            continue;
        };
        if !components.contains_key(&parameter.parameter_type) {
            return Err(ServiceError::Validation(format!(
                "parameter {iid} refers to unknown parameter type {}",
                parameter.parameter_type
            )));
        }
        let siblings = match overlay.container_of(iid).and_then(|c| overlay.get(&c)) {
            Some(Thing::ElementDefinition(element)) => element.parameter.clone(),
            _ => continue,
        };
        let duplicate = siblings.iter().filter(|s| *s != iid).any(|s| {
            matches!(overlay.get(s), Some(Thing::Parameter(other))
                if other.parameter_type == parameter.parameter_type)
        });
        if duplicate {
            return Err(ServiceError::Validation(format!(
                "element definition already has a parameter of type {}",
                parameter.parameter_type
            )));
        }
    }
    Ok(())
}

/// Run the synchronization engines until they have nothing left to add.
fn settle(overlay: &mut Overlay<'_>, components: &HashMap<Iid, usize>) -> ServiceResult<()> {
    for round in 0..MAX_ROUNDS {
        let delta = overlay.take_pending();
        if delta.is_empty() {
            return Ok(());
        }
        let mutations = apply_invariants(&*overlay, &delta, components)?;
        debug!(round, mutations = mutations.len(), "cascade round");
        if mutations.is_empty() {
            return Ok(());
        }
        for mutation in mutations {
            overlay.apply(mutation)?;
        }
    }
    Err(ServiceError::Validation(format!(
        "derived objects did not settle within {MAX_ROUNDS} rounds"
    )))
}

/// Models whose setup the transaction deletes.
fn retired_models(sd: &Partition, overlay: &Overlay<'_>) -> Vec<Iid> {
    overlay
        .deleted()
        .iter()
        .filter_map(|id| match sd.get(id) {
            Some(Thing::EngineeringModelSetup(setup)) => Some(setup.engineering_model_iid),
            _ => None,
        })
        .collect()
}
