//! Read access to a containment forest, shared by stored partitions and
//! transaction overlays.

use std::collections::{HashSet, VecDeque};

use edms_types::{ClassKind, Iid};

use crate::thing::{Reference, Thing};

/// A readable set of Things with their containment links.
pub trait ThingView {
    fn get(&self, iid: &Iid) -> Option<&Thing>;

    /// The direct container of `iid`, `None` for a partition root.
    fn container_of(&self, iid: &Iid) -> Option<Iid>;

    /// Every Thing in the view, in ascending iid order.
    fn iids(&self) -> Vec<Iid>;

    fn contains(&self, iid: &Iid) -> bool {
        self.get(iid).is_some()
    }

    /// Containers of `iid` from the direct parent up to the root.
    fn ancestors(&self, iid: &Iid) -> Vec<Iid> {
        let mut out = Vec::new();
        let mut current = *iid;
        while let Some(parent) = self.container_of(&current) {
            if parent == *iid || out.contains(&parent) {
                break;
            }
            out.push(parent);
            current = parent;
        }
        out
    }

    /// The Iteration `iid` lives in (or is).
    fn iteration_of(&self, iid: &Iid) -> Option<Iid> {
        std::iter::once(*iid)
            .chain(self.ancestors(iid))
            .find(|id| self.get(id).map(Thing::class_kind) == Some(ClassKind::Iteration))
    }

    /// The nearest owning domain up the containment chain.
    fn owner_of(&self, iid: &Iid) -> Option<Iid> {
        std::iter::once(*iid)
            .chain(self.ancestors(iid))
            .find_map(|id| self.get(&id).and_then(Thing::owner))
    }

    /// Every Thing transitively contained by `iid`, breadth first.
    fn descendants(&self, iid: &Iid) -> Vec<Iid> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([*iid]);
        let mut queue: VecDeque<Iid> = self
            .get(iid)
            .map(|t| t.children().into())
            .unwrap_or_default();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            if let Some(thing) = self.get(&next) {
                queue.extend(thing.children());
            }
        }
        out
    }

    /// Things holding a non-containment reference to `target`.
    fn referrers(&self, target: &Iid) -> Vec<(Iid, Reference)> {
        let mut out = Vec::new();
        for id in self.iids() {
            if let Some(thing) = self.get(&id) {
                out.extend(
                    thing
                        .references()
                        .into_iter()
                        .filter(|r| r.target == *target)
                        .map(|r| (id, r)),
                );
            }
        }
        out
    }

    fn of_kind(&self, kind: ClassKind) -> Vec<Iid> {
        self.iids()
            .into_iter()
            .filter(|id| self.get(id).map(Thing::class_kind) == Some(kind))
            .collect()
    }
}
