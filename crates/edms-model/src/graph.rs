use std::collections::{BTreeMap, HashMap};

use edms_types::Iid;

use crate::thing::Thing;
use crate::view::ThingView;

/// Owned containment forest: Things keyed by iid plus a container index.
///
/// The graph does not keep container child slots in step with the index;
/// callers that add or remove a child update the container Thing as well.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThingGraph {
    things: BTreeMap<Iid, Thing>,
    containers: HashMap<Iid, Iid>,
}

impl ThingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Insert or replace `thing`. A `None` container keeps any existing link.
    pub fn insert(&mut self, container: Option<Iid>, thing: Thing) -> Option<Thing> {
        let iid = thing.iid();
        if let Some(container) = container {
            self.containers.insert(iid, container);
        }
        self.things.insert(iid, thing)
    }

    pub fn remove(&mut self, iid: &Iid) -> Option<Thing> {
        self.containers.remove(iid);
        self.things.remove(iid)
    }

    pub fn get_mut(&mut self, iid: &Iid) -> Option<&mut Thing> {
        self.things.get_mut(iid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }
}

impl ThingView for ThingGraph {
    fn get(&self, iid: &Iid) -> Option<&Thing> {
        self.things.get(iid)
    }

    fn container_of(&self, iid: &Iid) -> Option<Iid> {
        self.containers.get(iid).copied()
    }

    fn iids(&self) -> Vec<Iid> {
        self.things.keys().copied().collect()
    }
}
