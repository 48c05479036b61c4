use std::collections::BTreeSet;

use edms_model::Thing;
use edms_types::Iid;

/// A side effect requested by an engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Create `thing` inside `container`.
    Create { container: Iid, thing: Thing },
    /// Replace an existing Thing with a new version of itself.
    Replace(Thing),
    /// Delete a Thing together with everything it contains.
    Delete(Iid),
}

impl Mutation {
    pub fn target(&self) -> Iid {
        match self {
            Mutation::Create { thing, .. } | Mutation::Replace(thing) => thing.iid(),
            Mutation::Delete(iid) => *iid,
        }
    }
}

/// The Things created, updated and deleted by one step of a transaction.
///
/// Containers whose child lists changed count as updated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    pub created: BTreeSet<Iid>,
    pub updated: BTreeSet<Iid>,
    pub deleted: BTreeSet<Iid>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn mark_created(&mut self, iid: Iid) {
        self.deleted.remove(&iid);
        self.created.insert(iid);
    }

    pub fn mark_updated(&mut self, iid: Iid) {
        if !self.created.contains(&iid) && !self.deleted.contains(&iid) {
            self.updated.insert(iid);
        }
    }

    pub fn mark_deleted(&mut self, iid: Iid) {
        self.created.remove(&iid);
        self.updated.remove(&iid);
        self.deleted.insert(iid);
    }

    /// Created or updated, i.e. present with new content.
    pub fn changed(&self, iid: &Iid) -> bool {
        self.created.contains(iid) || self.updated.contains(iid)
    }

    pub fn touched(&self, iid: &Iid) -> bool {
        self.changed(iid) || self.deleted.contains(iid)
    }
}
