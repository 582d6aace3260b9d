//! Tracking of pending feature edits on a vector source.
//!
//! A [`Transaction`] observes a [`VectorSource`] and classifies every add,
//! change and remove into inserts, updates and deletes. The caller decides
//! what to do with them: persist them via [`Transaction::commit`] or revert
//! the source with [`Transaction::rollback`].

mod change_log;
mod change_set;

pub use change_log::{ChangeLog, EditState, Snapshot};
pub use change_set::ChangeSet;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use log::{debug, warn};

use crate::event::Subscription;
use crate::feature::{Feature, FeatureId};
use crate::source::{VectorSource, WeakSource};

#[derive(Default)]
struct Tracking {
    log: ChangeLog,
    /// Before-change subscription per watched feature.
    watched: HashMap<FeatureId, Subscription>,
}

impl Tracking {
    fn feature_added(state: &Rc<RefCell<Tracking>>, features: &[Feature]) {
        let mut tracking = state.borrow_mut();
        for feature in features {
            let sub = watch(Rc::downgrade(state), feature);
            tracking.watched.insert(feature.id(), sub);
            tracking.log.record_added(feature);
        }
    }

    fn feature_removed(state: &Rc<RefCell<Tracking>>, features: &[Feature]) {
        let released: Vec<Subscription> = {
            let mut tracking = state.borrow_mut();
            features
                .iter()
                .filter_map(|feature| {
                    tracking.log.record_removed(feature);
                    tracking.watched.remove(&feature.id())
                })
                .collect()
        };
        drop(released);
    }
}

fn watch(state: Weak<RefCell<Tracking>>, feature: &Feature) -> Subscription {
    feature.on_before_change(move |feature| {
        if let Some(state) = state.upgrade() {
            state.borrow_mut().log.record_changing(feature);
        }
    })
}

/// Keeps track of pending feature edits on one source at a time.
///
/// The transaction holds the source weakly and owns every subscription it
/// makes; detaching, reattaching or dropping the transaction leaves no
/// listener behind.
#[derive(Default)]
pub struct Transaction {
    state: Rc<RefCell<Tracking>>,
    source: Option<WeakSource>,
    source_subscriptions: Vec<Subscription>,
}

impl Transaction {
    /// Creates an empty, unattached transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `source`, or stops tracking when `None`.
    ///
    /// Pending edits of a previous attachment are discarded, not rolled back.
    pub fn attach(&mut self, source: Option<&VectorSource>) {
        self.release();
        self.reset();
        if let Some(source) = source {
            self.subscribe(source);
            debug!("transaction attached to source with {} features", source.len());
        } else {
            debug!("transaction detached");
        }
    }

    /// Same as `attach(None)`.
    pub fn detach(&mut self) {
        self.attach(None);
    }

    pub fn is_attached(&self) -> bool {
        self.source().is_some()
    }

    /// The attached source, if it is still alive.
    pub fn source(&self) -> Option<VectorSource> {
        self.source.as_ref().and_then(WeakSource::upgrade)
    }

    /// Features added since tracking began.
    pub fn inserts(&self) -> BTreeMap<FeatureId, Feature> {
        self.state.borrow().log.inserts()
    }

    /// Pre-existing features modified since tracking began.
    pub fn updates(&self) -> BTreeMap<FeatureId, Feature> {
        self.state.borrow().log.updates()
    }

    /// Pre-existing features removed since tracking began.
    pub fn deletes(&self) -> BTreeMap<FeatureId, Feature> {
        self.state.borrow().log.deletes()
    }

    /// Attribute values an updated feature had before its first change.
    pub fn original(&self, id: FeatureId) -> Option<Snapshot> {
        self.state.borrow().log.original(id).cloned()
    }

    pub fn originals(&self) -> BTreeMap<FeatureId, Snapshot> {
        self.state.borrow().log.originals()
    }

    pub fn state_of(&self, id: FeatureId) -> Option<EditState> {
        self.state.borrow().log.state(id)
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().log.is_empty()
    }

    /// Forgets every tracked change, originals included. Listeners stay.
    pub fn reset(&mut self) {
        self.state.borrow_mut().log.clear();
    }

    /// Current inserts, updates and deletes as an owned change set.
    pub fn change_set(&self) -> ChangeSet {
        let tracking = self.state.borrow();
        ChangeSet {
            inserts: tracking.log.inserts().into_values().collect(),
            updates: tracking.log.updates().into_values().collect(),
            deletes: tracking.log.deletes().into_values().collect(),
        }
    }

    /// Accepts the current changes: returns them and starts a new window.
    pub fn commit(&mut self) -> ChangeSet {
        let changes = self.change_set();
        debug!(
            "commit: {} inserts, {} updates, {} deletes",
            changes.inserts.len(),
            changes.updates.len(),
            changes.deletes.len()
        );
        self.reset();
        changes
    }

    /// Reverts every tracked change on the attached source.
    ///
    /// Inserted features are unloaded, updated features get their original
    /// attributes back, and deleted features are restored and reloaded.
    /// Does nothing when no source is attached. When the attached source has
    /// been dropped, pending edits are discarded and the transaction detaches.
    pub fn rollback(&mut self) {
        let Some(weak) = self.source.clone() else {
            return;
        };
        let Some(source) = weak.upgrade() else {
            warn!("rollback skipped: attached source no longer exists");
            self.release();
            self.reset();
            return;
        };

        // Unsubscribe first so the edits below never reach the change log.
        self.release();
        let plan = std::mem::take(&mut self.state.borrow_mut().log).into_plan();
        debug!(
            "rollback: {} inserts, {} updates, {} deletes",
            plan.inserts.len(),
            plan.updates.len(),
            plan.deletes.len()
        );

        source.unload_features(&plan.inserts);
        for (feature, original) in &plan.updates {
            original.restore(feature);
        }
        let mut reloaded = Vec::with_capacity(plan.deletes.len());
        for (feature, original) in plan.deletes {
            if let Some(original) = original {
                original.restore(&feature);
            }
            reloaded.push(feature);
        }
        source.load_features(reloaded);

        self.subscribe(&source);
    }

    fn subscribe(&mut self, source: &VectorSource) {
        let weak = Rc::downgrade(&self.state);
        let on_added = source.on_added(move |features| {
            if let Some(state) = weak.upgrade() {
                Tracking::feature_added(&state, features);
            }
        });
        let weak = Rc::downgrade(&self.state);
        let on_removed = source.on_removed(move |features| {
            if let Some(state) = weak.upgrade() {
                Tracking::feature_removed(&state, features);
            }
        });
        self.source_subscriptions = vec![on_added, on_removed];

        let mut tracking = self.state.borrow_mut();
        for feature in source.features() {
            let sub = watch(Rc::downgrade(&self.state), &feature);
            tracking.watched.insert(feature.id(), sub);
        }
        self.source = Some(source.downgrade());
    }

    /// Drops every source and feature subscription.
    fn release(&mut self) {
        self.source_subscriptions.clear();
        let watched = std::mem::take(&mut self.state.borrow_mut().watched);
        drop(watched);
        self.source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::AttributeValue;
    use crate::geometry::{Geometry, Point};

    fn named(name: &str) -> Feature {
        [("foo", name)].into_iter().collect()
    }

    #[test]
    fn new_transaction_is_empty_and_detached() {
        let mut tx = Transaction::new();
        assert!(tx.is_empty());
        assert!(!tx.is_attached());
        tx.rollback();
        assert!(tx.is_empty());
    }

    #[test]
    fn added_feature_stays_an_insert_after_change() {
        let source = VectorSource::new();
        let mut tx = Transaction::new();
        tx.attach(Some(&source));

        let f = named("bar");
        source.add_feature(f.clone());
        assert_eq!(tx.inserts().len(), 1);
        assert!(tx.inserts().contains_key(&f.id()));

        f.set_geometry(Geometry::Point(Point::new(1.0, 2.0)));
        assert_eq!(tx.inserts().len(), 1);
        assert!(tx.updates().is_empty());
        assert!(tx.originals().is_empty());
    }

    #[test]
    fn update_then_rollback_restores_value() {
        let f = named("bar");
        let source = VectorSource::with_features(vec![f.clone()]);
        let mut tx = Transaction::new();
        tx.attach(Some(&source));

        f.set("foo", "baz");
        assert!(tx.updates().contains_key(&f.id()));
        assert_eq!(
            tx.original(f.id()).and_then(|s| s.get("foo").cloned()),
            Some(AttributeValue::from("bar"))
        );

        tx.rollback();
        assert_eq!(f.get("foo"), Some(AttributeValue::from("bar")));
        assert!(tx.is_empty());
        assert!(tx.originals().is_empty());
    }

    #[test]
    fn changes_after_rollback_are_tracked_again() {
        let f = named("bar");
        let source = VectorSource::with_features(vec![f.clone()]);
        let mut tx = Transaction::new();
        tx.attach(Some(&source));

        f.set("foo", "baz");
        tx.rollback();
        assert!(tx.is_empty());

        f.set("foo", "qux");
        assert_eq!(tx.state_of(f.id()), Some(EditState::Updated));
    }

    #[test]
    fn commit_returns_changes_and_keeps_source() {
        let kept = named("a");
        let gone = named("b");
        let source = VectorSource::with_features(vec![kept.clone(), gone.clone()]);
        let mut tx = Transaction::new();
        tx.attach(Some(&source));

        kept.set("foo", "changed");
        source.remove_feature(&gone);
        source.add_feature(named("c"));

        let changes = tx.commit();
        assert_eq!(changes.inserts.len(), 1);
        assert_eq!(changes.updates, vec![kept.clone()]);
        assert_eq!(changes.deletes, vec![gone]);
        assert!(tx.is_empty());
        assert_eq!(source.len(), 2);
        assert_eq!(kept.get("foo"), Some(AttributeValue::from("changed")));
    }

    #[test]
    fn reset_clears_originals_but_keeps_listening() {
        let f = named("bar");
        let source = VectorSource::with_features(vec![f.clone()]);
        let mut tx = Transaction::new();
        tx.attach(Some(&source));

        f.set("foo", "baz");
        tx.reset();
        assert!(tx.originals().is_empty());
        assert!(tx.original(f.id()).is_none());

        f.set("foo", "qux");
        assert_eq!(
            tx.original(f.id()).and_then(|s| s.get("foo").cloned()),
            Some(AttributeValue::from("baz"))
        );
    }

    #[test]
    fn rollback_without_live_source_discards_edits() {
        let f = named("bar");
        let source = VectorSource::with_features(vec![f.clone()]);
        let mut tx = Transaction::new();
        tx.attach(Some(&source));
        f.set("foo", "baz");
        drop(source);

        tx.rollback();
        assert_eq!(f.get("foo"), Some(AttributeValue::from("baz")));
        assert!(!tx.is_attached());
        assert!(tx.is_empty());
        assert_eq!(f.listener_count(), 0);

        f.set("foo", "qux");
        assert!(tx.is_empty());
    }

    #[test]
    fn dropping_transaction_releases_listeners() {
        let f = named("bar");
        let source = VectorSource::with_features(vec![f.clone()]);
        let mut tx = Transaction::new();
        tx.attach(Some(&source));
        assert_eq!(source.listener_count(), 2);
        assert_eq!(f.listener_count(), 1);

        drop(tx);
        assert_eq!(source.listener_count(), 0);
        assert_eq!(f.listener_count(), 0);
    }
}
