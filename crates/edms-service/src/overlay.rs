//! Staged changes of one transaction on top of a committed partition.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use edms_engine::{Delta, Mutation};
use edms_model::{RefStrength, Thing, ThingView};
use edms_store::Change;
use edms_types::Iid;

use crate::error::{ServiceError, ServiceResult};

/// Copy-on-write view of a partition.
///
/// Reads fall through to `base` unless the transaction staged a newer state.
/// Nothing reaches the partition until [`Overlay::into_changes`] is
/// committed, so readers never observe partial cascades.
pub struct Overlay<'a> {
    base: &'a dyn ThingView,
    /// `None` marks a deletion.
    staged: BTreeMap<Iid, Option<Thing>>,
    containers: HashMap<Iid, Iid>,
    /// Changes not yet seen by the invariant engines.
    pending: Delta,
    /// Every change of the transaction.
    total: Delta,
}

impl<'a> Overlay<'a> {
    pub fn new(base: &'a dyn ThingView) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
            containers: HashMap::new(),
            pending: Delta::default(),
            total: Delta::default(),
        }
    }

    fn mark(&mut self, f: impl Fn(&mut Delta)) {
        f(&mut self.pending);
        f(&mut self.total);
    }

    fn require(&self, iid: &Iid) -> ServiceResult<Thing> {
        self.get(iid)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(iid.to_string()))
    }

    /// Insert `thing` under `container`, registering it in the container's
    /// child slot (at `key` for ordered slots).
    pub fn create(&mut self, container: Iid, thing: Thing, key: Option<i64>) -> ServiceResult<()> {
        let iid = thing.iid();
        if self.contains(&iid) {
            return Err(ServiceError::Validation(format!("{iid} already exists")));
        }
        let mut parent = self.require(&container)?;
        parent.add_child(thing.class_kind(), iid, key)?;
        self.replace(parent);
        self.stage(container, thing);
        Ok(())
    }

    /// Insert `thing` whose container already lists it.
    pub fn stage(&mut self, container: Iid, thing: Thing) {
        let iid = thing.iid();
        tracing::debug!(iid = %iid, kind = %thing.class_kind(), "staged create");
        self.containers.insert(iid, container);
        self.staged.insert(iid, Some(thing));
        self.mark(|d| d.mark_created(iid));
    }

    /// Replace the state of an existing Thing.
    pub fn replace(&mut self, thing: Thing) {
        let iid = thing.iid();
        self.staged.insert(iid, Some(thing));
        self.mark(|d| d.mark_updated(iid));
    }

    /// Delete `iid` with everything it contains. Things holding a strong
    /// reference to a deleted Thing are deleted too; weak references are
    /// cleared.
    pub fn delete(&mut self, iid: Iid) -> ServiceResult<()> {
        let Some(thing) = self.get(&iid).cloned() else {
            return Ok(());
        };
        if let Some(container) = self.container_of(&iid) {
            if let Some(mut parent) = self.get(&container).cloned() {
                parent.remove_child(thing.class_kind(), &iid);
                self.replace(parent);
            }
        }
        let mut doomed = self.descendants(&iid);
        doomed.push(iid);
        for id in &doomed {
            tracing::debug!(iid = %id, "staged delete");
            self.staged.insert(*id, None);
            self.mark(|d| d.mark_deleted(*id));
        }
        for id in doomed {
            for (holder, reference) in self.referrers(&id) {
                match reference.strength {
                    RefStrength::Strong => self.delete(holder)?,
                    RefStrength::Weak => {
                        let mut held = self.require(&holder)?;
                        if held.drop_reference(&id) {
                            self.replace(held);
                        }
                    }
                    RefStrength::Derived => {}
                }
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, mutation: Mutation) -> ServiceResult<()> {
        match mutation {
            Mutation::Create { container, thing } => self.create(container, thing, None),
            Mutation::Replace(thing) => {
                self.replace(thing);
                Ok(())
            }
            Mutation::Delete(iid) => self.delete(iid),
        }
    }

    /// Changes since the last call, for the next invariant round.
    pub fn take_pending(&mut self) -> Delta {
        std::mem::take(&mut self.pending)
    }

    /// Every change of the transaction so far.
    pub fn delta(&self) -> &Delta {
        &self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    /// Things whose revision the transaction raises: every created or
    /// updated Thing plus all of their containers up to the root.
    pub fn bump_set(&self) -> BTreeSet<Iid> {
        let mut out = BTreeSet::new();
        for iid in self.total.created.iter().chain(&self.total.updated) {
            if !self.contains(iid) {
                continue;
            }
            out.insert(*iid);
            out.extend(self.ancestors(iid));
        }
        out
    }

    /// Deleted Things that existed before the transaction.
    pub fn deleted(&self) -> BTreeSet<Iid> {
        self.total
            .deleted
            .iter()
            .filter(|iid| self.base.contains(iid))
            .copied()
            .collect()
    }

    /// Partition changes realizing the transaction.
    pub fn into_changes(self) -> Vec<Change> {
        let bumped = self.bump_set();
        let deleted = self.deleted();
        let mut changes = Vec::with_capacity(bumped.len() + deleted.len());
        for iid in deleted {
            changes.push(Change::Delete(iid));
        }
        for iid in bumped {
            if let Some(thing) = self.get(&iid).cloned() {
                changes.push(Change::Upsert {
                    container: self.container_of(&iid),
                    thing,
                });
            }
        }
        changes
    }
}

impl ThingView for Overlay<'_> {
    fn get(&self, iid: &Iid) -> Option<&Thing> {
        match self.staged.get(iid) {
            Some(staged) => staged.as_ref(),
            None => self.base.get(iid),
        }
    }

    fn container_of(&self, iid: &Iid) -> Option<Iid> {
        if matches!(self.staged.get(iid), Some(None)) {
            return None;
        }
        self.containers
            .get(iid)
            .copied()
            .or_else(|| self.base.container_of(iid))
    }

    fn iids(&self) -> Vec<Iid> {
        let mut all: BTreeSet<Iid> = self.base.iids().into_iter().collect();
        for (iid, state) in &self.staged {
            if state.is_some() {
                all.insert(*iid);
            } else {
                all.remove(iid);
            }
        }
        all.into_iter().collect()
    }
}
