//! Vector source: the observable feature collection edits are tracked on.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::trace;

use crate::event::{EventEmitter, Subscription};
use crate::feature::{Feature, FeatureId};

struct SourceInner {
    features: RefCell<BTreeMap<FeatureId, Feature>>,
    added: EventEmitter<Vec<Feature>>,
    removed: EventEmitter<Vec<Feature>>,
}

/// Shared handle to a collection of features keyed by identity.
///
/// `added` and `removed` notifications fire after membership has changed and
/// only carry the features whose membership actually changed.
#[derive(Clone)]
pub struct VectorSource {
    inner: Rc<SourceInner>,
}

/// Non-owning reference to a [`VectorSource`].
#[derive(Clone)]
pub struct WeakSource(Weak<SourceInner>);

impl WeakSource {
    pub fn upgrade(&self) -> Option<VectorSource> {
        self.0.upgrade().map(|inner| VectorSource { inner })
    }
}

impl VectorSource {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SourceInner {
                features: RefCell::new(BTreeMap::new()),
                added: EventEmitter::new(),
                removed: EventEmitter::new(),
            }),
        }
    }

    /// Creates a source already holding `features`.
    pub fn with_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let source = Self::new();
        source.inner.features.borrow_mut().extend(
            features.into_iter().map(|f| (f.id(), f)),
        );
        source
    }

    pub fn downgrade(&self) -> WeakSource {
        WeakSource(Rc::downgrade(&self.inner))
    }

    /// All features, ordered by identity.
    pub fn features(&self) -> Vec<Feature> {
        self.inner.features.borrow().values().cloned().collect()
    }

    pub fn feature(&self, id: FeatureId) -> Option<Feature> {
        self.inner.features.borrow().get(&id).cloned()
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.inner.features.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.features.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.features.borrow().is_empty()
    }

    /// Adds every feature not already present and announces them.
    pub fn load_features(&self, features: impl IntoIterator<Item = Feature>) {
        let added: Vec<Feature> = {
            let mut map = self.inner.features.borrow_mut();
            features
                .into_iter()
                .filter(|f| {
                    if map.contains_key(&f.id()) {
                        false
                    } else {
                        map.insert(f.id(), f.clone());
                        true
                    }
                })
                .collect()
        };
        if !added.is_empty() {
            trace!("source loaded {} features", added.len());
            self.inner.added.emit(&added);
        }
    }

    /// Removes every listed feature that is present and announces them.
    pub fn unload_features(&self, features: &[Feature]) {
        let removed: Vec<Feature> = {
            let mut map = self.inner.features.borrow_mut();
            features
                .iter()
                .filter_map(|f| map.remove(&f.id()))
                .collect()
        };
        if !removed.is_empty() {
            trace!("source unloaded {} features", removed.len());
            self.inner.removed.emit(&removed);
        }
    }

    pub fn add_feature(&self, feature: Feature) {
        self.load_features([feature]);
    }

    /// Returns `false` when the feature was not part of the source.
    pub fn remove_feature(&self, feature: &Feature) -> bool {
        let present = self.contains(feature.id());
        if present {
            self.unload_features(std::slice::from_ref(feature));
        }
        present
    }

    /// Removes every feature.
    pub fn clear(&self) {
        let all = self.features();
        self.unload_features(&all);
    }

    pub fn on_added(&self, callback: impl Fn(&Vec<Feature>) + 'static) -> Subscription {
        self.inner.added.on(callback)
    }

    pub fn on_removed(&self, callback: impl Fn(&Vec<Feature>) + 'static) -> Subscription {
        self.inner.removed.on(callback)
    }

    /// Number of live add and remove listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.added.size() + self.inner.removed.size()
    }
}

impl Default for VectorSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VectorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorSource")
            .field("features", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn load_skips_duplicates_and_notifies_once() {
        let source = VectorSource::new();
        let a = Feature::new();
        let b = Feature::new();
        let batches = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&batches);
        let _sub = source.on_added(move |fs| sink.borrow_mut().push(fs.len()));

        source.load_features(vec![a.clone(), b.clone()]);
        source.load_features(vec![a.clone()]);
        source.add_feature(b.clone());

        assert_eq!(source.len(), 2);
        assert_eq!(*batches.borrow(), vec![2]);
    }

    #[test]
    fn unload_only_reports_present_features() {
        let a = Feature::new();
        let b = Feature::new();
        let source = VectorSource::with_features(vec![a.clone()]);
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = source.on_removed(move |fs| c.set(c.get() + fs.len()));

        source.unload_features(&[a.clone(), b.clone()]);
        assert!(!source.remove_feature(&a));

        assert_eq!(count.get(), 1);
        assert!(source.is_empty());
    }

    #[test]
    fn weak_source_does_not_keep_source_alive() {
        let source = VectorSource::new();
        let weak = source.downgrade();
        assert!(weak.upgrade().is_some());
        drop(source);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let source = VectorSource::with_features(vec![Feature::new(), Feature::new()]);
        source.clear();
        assert!(source.is_empty());
        assert_eq!(source.listener_count(), 0);
    }
}
