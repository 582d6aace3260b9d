//! Per-identity edit classification.
//!
//! Each tracked identity carries one [`EditState`] and, for pre-existing
//! features, the attribute values it had when tracking began. The public
//! buckets (inserts, updates, originals, deletes) are views over these
//! entries, so an identity can never sit in two buckets at once.

use std::collections::BTreeMap;

use log::trace;

use crate::feature::{Attributes, AttributeValue, Feature, FeatureId};

/// Classification of a tracked feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// Added since tracking began.
    Inserted,
    /// Present when tracking began and modified since.
    Updated,
    /// Present when tracking began and removed since.
    Deleted,
}

/// Deep copy of a feature's attributes at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    attributes: Attributes,
}

impl Snapshot {
    /// Copies every attribute of `feature`. Geometry values are cloned, so
    /// later in-place geometry edits on the feature do not leak in.
    pub fn capture(feature: &Feature) -> Self {
        Self {
            attributes: feature.attributes(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Resets `feature` to the captured values. Attributes the feature gained
    /// after the capture are removed.
    pub fn restore(&self, feature: &Feature) {
        let added: Vec<String> = feature
            .keys()
            .into_iter()
            .filter(|k| !self.attributes.contains_key(k))
            .collect();
        feature.set_values(self.attributes.clone());
        for key in added {
            feature.unset(&key);
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    feature: Feature,
    state: EditState,
    /// Always present for `Updated`; kept for `Deleted` when the feature was
    /// updated before removal.
    original: Option<Snapshot>,
}

/// Everything rollback needs, drained out of a [`ChangeLog`].
#[derive(Debug, Default)]
pub(crate) struct RollbackPlan {
    pub inserts: Vec<Feature>,
    pub updates: Vec<(Feature, Snapshot)>,
    pub deletes: Vec<(Feature, Option<Snapshot>)>,
}

/// State machine classifying observed add, change and remove events.
#[derive(Debug, Default)]
pub struct ChangeLog {
    entries: BTreeMap<FeatureId, Entry>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feature was added to the source.
    ///
    /// A deleted feature coming back returns to where it stood before its
    /// removal: updated if a baseline was captured, untracked otherwise.
    /// Anything else becomes an insert.
    pub fn record_added(&mut self, feature: &Feature) {
        let id = feature.id();
        match self.entries.remove(&id) {
            Some(Entry {
                state: EditState::Deleted,
                original: Some(original),
                ..
            }) => {
                trace!("feature {} restored as update", id);
                self.entries.insert(
                    id,
                    Entry {
                        feature: feature.clone(),
                        state: EditState::Updated,
                        original: Some(original),
                    },
                );
            }
            Some(Entry {
                state: EditState::Deleted,
                original: None,
                ..
            }) => {
                trace!("feature {} delete cancelled", id);
            }
            _ => {
                trace!("feature {} inserted", id);
                self.entries.insert(
                    id,
                    Entry {
                        feature: feature.clone(),
                        state: EditState::Inserted,
                        original: None,
                    },
                );
            }
        }
    }

    /// A feature is about to change. Must be called before the mutation.
    ///
    /// Inserted features are ignored. Otherwise the first call per identity
    /// captures the baseline snapshot and later calls leave it untouched.
    pub fn record_changing(&mut self, feature: &Feature) {
        let id = feature.id();
        match self.entries.get_mut(&id) {
            Some(entry) => {
                if entry.state == EditState::Inserted {
                    return;
                }
                if entry.original.is_none() {
                    entry.original = Some(Snapshot::capture(feature));
                }
                trace!("feature {} updated", id);
                entry.state = EditState::Updated;
                entry.feature = feature.clone();
            }
            None => {
                trace!("feature {} updated", id);
                self.entries.insert(
                    id,
                    Entry {
                        feature: feature.clone(),
                        state: EditState::Updated,
                        original: Some(Snapshot::capture(feature)),
                    },
                );
            }
        }
    }

    /// A feature was removed from the source.
    ///
    /// Removing an insert cancels it. Anything else becomes a delete; a
    /// baseline captured by an earlier update is retained for rollback.
    pub fn record_removed(&mut self, feature: &Feature) {
        let id = feature.id();
        match self.state(id) {
            Some(EditState::Inserted) => {
                trace!("feature {} insert cancelled", id);
                self.entries.remove(&id);
            }
            Some(_) => {
                trace!("feature {} deleted", id);
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.state = EditState::Deleted;
                    entry.feature = feature.clone();
                }
            }
            None => {
                trace!("feature {} deleted", id);
                self.entries.insert(
                    id,
                    Entry {
                        feature: feature.clone(),
                        state: EditState::Deleted,
                        original: None,
                    },
                );
            }
        }
    }

    pub fn state(&self, id: FeatureId) -> Option<EditState> {
        self.entries.get(&id).map(|e| e.state)
    }

    pub fn inserts(&self) -> BTreeMap<FeatureId, Feature> {
        self.in_state(EditState::Inserted)
    }

    pub fn updates(&self) -> BTreeMap<FeatureId, Feature> {
        self.in_state(EditState::Updated)
    }

    pub fn deletes(&self) -> BTreeMap<FeatureId, Feature> {
        self.in_state(EditState::Deleted)
    }

    /// Baseline snapshot of an updated feature.
    pub fn original(&self, id: FeatureId) -> Option<&Snapshot> {
        self.entries
            .get(&id)
            .filter(|e| e.state == EditState::Updated)
            .and_then(|e| e.original.as_ref())
    }

    /// Baseline snapshots keyed by identity, one per entry in
    /// [`updates`](Self::updates).
    pub fn originals(&self) -> BTreeMap<FeatureId, Snapshot> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == EditState::Updated)
            .filter_map(|(id, e)| e.original.clone().map(|s| (*id, s)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn in_state(&self, state: EditState) -> BTreeMap<FeatureId, Feature> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == state)
            .map(|(id, e)| (*id, e.feature.clone()))
            .collect()
    }

    pub(crate) fn into_plan(self) -> RollbackPlan {
        let mut plan = RollbackPlan::default();
        for entry in self.entries.into_values() {
            match (entry.state, entry.original) {
                (EditState::Inserted, _) => plan.inserts.push(entry.feature),
                (EditState::Updated, Some(original)) => {
                    plan.updates.push((entry.feature, original))
                }
                (EditState::Updated, None) => {}
                (EditState::Deleted, original) => plan.deletes.push((entry.feature, original)),
            }
        }
        plan
    }
}
