//! A single partition: current state plus the history of every Thing in it.

use std::collections::HashMap;

use edms_model::{Thing, ThingGraph, ThingView};
use edms_types::{Iid, PartitionKind, RevisionNumber};

use crate::error::{StoreError, StoreResult};

/// One staged modification, applied by [`Partition::commit`].
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// Insert or replace a Thing. `container` is `None` for the root and for
    /// replacements that keep their container.
    Upsert {
        container: Option<Iid>,
        thing: Thing,
    },
    Delete(Iid),
}

impl Change {
    pub fn iid(&self) -> Iid {
        match self {
            Change::Upsert { thing, .. } => thing.iid(),
            Change::Delete(iid) => *iid,
        }
    }
}

/// A recorded version of a Thing. `state` is `None` when the revision
/// deleted it.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub revision: RevisionNumber,
    pub state: Option<Thing>,
}

/// State of a SiteDirectory or EngineeringModel partition at its current
/// revision, with full per-Thing history.
#[derive(Clone, Debug)]
pub struct Partition {
    iid: Iid,
    kind: PartitionKind,
    revision: RevisionNumber,
    graph: ThingGraph,
    history: HashMap<Iid, Vec<HistoryEntry>>,
}

impl Partition {
    /// An empty partition rooted at `iid`, at revision zero.
    pub fn new(iid: Iid, kind: PartitionKind) -> Self {
        Self {
            iid,
            kind,
            revision: RevisionNumber::ZERO,
            graph: ThingGraph::new(),
            history: HashMap::new(),
        }
    }

    /// Iid of the root Thing.
    pub fn iid(&self) -> Iid {
        self.iid
    }

    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    pub fn revision(&self) -> RevisionNumber {
        self.revision
    }

    pub fn root(&self) -> Option<&Thing> {
        self.graph.get(&self.iid)
    }

    pub fn graph(&self) -> &ThingGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Apply `changes` as revision `revision`.
    ///
    /// Every upserted Thing is stamped with `revision` before it is stored.
    pub fn commit(&mut self, revision: RevisionNumber, changes: Vec<Change>) -> StoreResult<()> {
        if revision <= self.revision {
            return Err(StoreError::RevisionNotAdvanced {
                current: self.revision,
                attempted: revision,
            });
        }
        let count = changes.len();
        for change in changes {
            match change {
                Change::Upsert {
                    container,
                    mut thing,
                } => {
                    thing.set_revision_number(revision);
                    self.record(thing.iid(), revision, Some(thing.clone()));
                    self.graph.insert(container, thing);
                }
                Change::Delete(iid) => {
                    if self.graph.remove(&iid).is_some() {
                        self.record(iid, revision, None);
                    }
                }
            }
        }
        self.revision = revision;
        tracing::debug!(
            partition = %self.iid,
            revision = revision.get(),
            changes = count,
            "partition committed"
        );
        Ok(())
    }

    fn record(&mut self, iid: Iid, revision: RevisionNumber, state: Option<Thing>) {
        let entries = self.history.entry(iid).or_default();
        match entries.last_mut() {
            Some(last) if last.revision == revision => last.state = state,
            _ => entries.push(HistoryEntry { revision, state }),
        }
    }

    /// The recorded versions of `iid`, oldest first.
    pub fn history(&self, iid: &Iid) -> &[HistoryEntry] {
        self.history.get(iid).map(Vec::as_slice).unwrap_or_default()
    }

    /// The state of `iid` as of `revision`, `None` if it did not exist then.
    pub fn state_at(&self, iid: &Iid, revision: RevisionNumber) -> Option<&Thing> {
        self.history(iid)
            .iter()
            .take_while(|entry| entry.revision <= revision)
            .last()
            .and_then(|entry| entry.state.as_ref())
    }

    /// Versions of `iid` in effect at any point within `from..=to`, oldest
    /// first. The version live at `from` is included even if it was written
    /// earlier.
    pub fn states_between(&self, iid: &Iid, from: RevisionNumber, to: RevisionNumber) -> Vec<Thing> {
        let mut out = Vec::new();
        if let Some(state) = self.state_at(iid, from) {
            out.push(state.clone());
        }
        out.extend(
            self.history(iid)
                .iter()
                .filter(|entry| entry.revision > from && entry.revision <= to)
                .filter_map(|entry| entry.state.clone()),
        );
        out
    }
}

impl ThingView for Partition {
    fn get(&self, iid: &Iid) -> Option<&Thing> {
        self.graph.get(iid)
    }

    fn container_of(&self, iid: &Iid) -> Option<Iid> {
        self.graph.container_of(iid)
    }

    fn iids(&self) -> Vec<Iid> {
        self.graph.iids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iid(n: u128) -> Iid {
        Iid::from_u128(n)
    }

    fn domain(n: u128, name: &str) -> Thing {
        serde_json::from_value(json!({
            "classKind": "DomainOfExpertise",
            "iid": iid(n).to_string(),
            "name": name,
            "shortName": name.to_lowercase(),
        }))
        .unwrap()
    }

    fn site_directory(domains: &[u128]) -> Thing {
        let ids: Vec<String> = domains.iter().map(|d| iid(*d).to_string()).collect();
        serde_json::from_value(json!({
            "classKind": "SiteDirectory",
            "iid": iid(1).to_string(),
            "name": "Site",
            "domain": ids,
        }))
        .unwrap()
    }

    fn seeded() -> Partition {
        let mut p = Partition::new(iid(1), PartitionKind::SiteDirectory);
        p.commit(
            RevisionNumber(1),
            vec![
                Change::Upsert { container: None, thing: site_directory(&[2]) },
                Change::Upsert { container: Some(iid(1)), thing: domain(2, "Power") },
            ],
        )
        .unwrap();
        p
    }

    #[test]
    fn commit_stamps_revision() {
        let p = seeded();
        assert_eq!(p.revision(), RevisionNumber(1));
        assert_eq!(p.get(&iid(2)).unwrap().revision_number(), RevisionNumber(1));
        assert_eq!(p.container_of(&iid(2)), Some(iid(1)));
        assert_eq!(p.root().unwrap().iid(), iid(1));
    }

    #[test]
    fn commit_must_advance() {
        let mut p = seeded();
        let err = p.commit(RevisionNumber(1), vec![]).unwrap_err();
        assert!(matches!(err, StoreError::RevisionNotAdvanced { .. }));
    }

    #[test]
    fn history_tracks_updates_and_deletes() {
        let mut p = seeded();
        p.commit(
            RevisionNumber(2),
            vec![Change::Upsert { container: None, thing: domain(2, "Power Systems") }],
        )
        .unwrap();
        p.commit(
            RevisionNumber(4),
            vec![
                Change::Upsert { container: None, thing: site_directory(&[]) },
                Change::Delete(iid(2)),
            ],
        )
        .unwrap();

        assert_eq!(p.history(&iid(2)).len(), 3);
        assert!(p.get(&iid(2)).is_none());
        assert!(p.state_at(&iid(2), RevisionNumber(4)).is_none());
        assert!(p.state_at(&iid(2), RevisionNumber(0)).is_none());
        let at3 = p.state_at(&iid(2), RevisionNumber(3)).unwrap();
        assert_eq!(at3.revision_number(), RevisionNumber(2));

        let states = p.states_between(&iid(2), RevisionNumber(1), RevisionNumber(4));
        let revisions: Vec<_> = states.iter().map(Thing::revision_number).collect();
        assert_eq!(revisions, vec![RevisionNumber(1), RevisionNumber(2)]);

        let late = p.states_between(&iid(2), RevisionNumber(3), RevisionNumber(3));
        assert_eq!(late.len(), 1);
    }
}
