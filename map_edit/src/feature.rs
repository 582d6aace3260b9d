//! Mutable vector features with stable identities and named attributes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::event::{EventEmitter, Subscription};
use crate::geometry::{Geometry, Point};

/// Attribute name under which a feature's default geometry is stored.
pub const GEOMETRY_KEY: &str = "geometry";

static NEXT_FEATURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a feature.
///
/// Assigned once when the feature is created and never changed afterwards.
/// Change tracking keys everything on this value, so an identity must stay
/// stable and unique for as long as the feature is observed. The only way to
/// obtain one is [`Feature::new`] and its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FeatureId(u64);

impl FeatureId {
    fn next() -> Self {
        Self(NEXT_FEATURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value of a single feature attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Geometry(Geometry),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            AttributeValue::Geometry(g) => Some(g),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<Geometry> for AttributeValue {
    fn from(v: Geometry) -> Self {
        AttributeValue::Geometry(v)
    }
}

impl From<Point> for AttributeValue {
    fn from(v: Point) -> Self {
        AttributeValue::Geometry(Geometry::Point(v))
    }
}

/// Attribute table of a feature, ordered by name.
pub type Attributes = BTreeMap<String, AttributeValue>;

struct FeatureInner {
    id: FeatureId,
    attributes: RefCell<Attributes>,
    before_change: EventEmitter<Feature>,
}

/// Shared handle to a mutable feature.
///
/// Clones alias the same feature. Every mutating call first emits a
/// before-change notification, then applies the change, so listeners always
/// observe the attribute values as they were prior to the edit.
#[derive(Clone)]
pub struct Feature {
    inner: Rc<FeatureInner>,
}

impl Feature {
    /// Creates a feature with no attributes.
    pub fn new() -> Self {
        Self::with_attributes(Attributes::new())
    }

    /// Creates a feature holding `attributes`.
    pub fn with_attributes(attributes: Attributes) -> Self {
        Self {
            inner: Rc::new(FeatureInner {
                id: FeatureId::next(),
                attributes: RefCell::new(attributes),
                before_change: EventEmitter::new(),
            }),
        }
    }

    /// Creates a feature whose default geometry attribute is `geometry`.
    pub fn with_geometry(geometry: Geometry) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(GEOMETRY_KEY.to_string(), geometry.into());
        Self::with_attributes(attributes)
    }

    pub fn id(&self) -> FeatureId {
        self.inner.id
    }

    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.inner.attributes.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.attributes.borrow().contains_key(key)
    }

    /// Copy of the whole attribute table.
    pub fn attributes(&self) -> Attributes {
        self.inner.attributes.borrow().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.attributes.borrow().keys().cloned().collect()
    }

    /// The default geometry, if one is set.
    pub fn geometry(&self) -> Option<Geometry> {
        self.get(GEOMETRY_KEY)
            .and_then(|v| v.as_geometry().cloned())
    }

    /// Sets one attribute, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.notify();
        self.inner
            .attributes
            .borrow_mut()
            .insert(key.into(), value.into());
    }

    /// Sets every attribute in `values`, leaving other attributes untouched.
    pub fn set_values(&self, values: Attributes) {
        self.notify();
        self.inner.attributes.borrow_mut().extend(values);
    }

    /// Removes an attribute, returning its previous value.
    pub fn unset(&self, key: &str) -> Option<AttributeValue> {
        self.notify();
        self.inner.attributes.borrow_mut().remove(key)
    }

    pub fn set_geometry(&self, geometry: Geometry) {
        self.set(GEOMETRY_KEY, geometry);
    }

    /// Edits the geometry stored under `key`.
    ///
    /// `edit` works on a copy that is written back afterwards, so it may read
    /// this feature's attributes. Returns `false` without notifying when `key`
    /// holds no geometry.
    pub fn update_geometry<F>(&self, key: &str, edit: F) -> bool
    where
        F: FnOnce(&mut Geometry),
    {
        let Some(mut geometry) = self.get(key).and_then(|v| v.as_geometry().cloned()) else {
            return false;
        };
        self.notify();
        edit(&mut geometry);
        self.inner
            .attributes
            .borrow_mut()
            .insert(key.to_string(), AttributeValue::Geometry(geometry));
        true
    }

    /// Registers a listener called before any attribute of this feature changes.
    pub fn on_before_change(&self, callback: impl Fn(&Feature) + 'static) -> Subscription {
        self.inner.before_change.on(callback)
    }

    /// Number of live before-change listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.before_change.size()
    }

    fn notify(&self) {
        self.inner.before_change.emit(self);
    }
}

impl Default for Feature {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Feature {}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("id", &self.inner.id)
            .field("attributes", &*self.inner.attributes.borrow())
            .finish()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Feature {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::with_attributes(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn identities_are_unique_and_stable() {
        let a = Feature::new();
        let b = Feature::new();
        assert_ne!(a.id(), b.id());
        let id = a.id();
        a.set("foo", "bar");
        assert_eq!(a.id(), id);
        assert_eq!(a.clone().id(), id);
    }

    #[test]
    fn listener_sees_value_before_change() {
        let f: Feature = [("foo", "bar")].into_iter().collect();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let _sub = f.on_before_change(move |feature| {
            *sink.borrow_mut() = feature.get("foo");
        });

        f.set("foo", "baz");

        assert_eq!(*seen.borrow(), Some(AttributeValue::from("bar")));
        assert_eq!(f.get("foo"), Some(AttributeValue::from("baz")));
    }

    #[test]
    fn every_mutation_notifies() {
        let f = Feature::with_geometry(Geometry::Point(Point::new(0.0, 0.0)));
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = f.on_before_change(move |_| c.set(c.get() + 1));

        f.set("a", 1.0);
        f.set_values(Attributes::from([("b".to_string(), true.into())]));
        f.unset("a");
        assert!(f.update_geometry(GEOMETRY_KEY, |g| g.translate(1.0, 1.0)));
        assert!(!f.update_geometry("missing", |g| g.translate(1.0, 1.0)));

        assert_eq!(count.get(), 4);
        assert_eq!(f.geometry(), Some(Geometry::Point(Point::new(1.0, 1.0))));
        assert_eq!(f.keys(), vec!["b".to_string(), GEOMETRY_KEY.to_string()]);
    }

    #[test]
    fn geometry_edit_can_read_other_attributes() {
        let f = Feature::with_geometry(Geometry::Point(Point::new(0.0, 0.0)));
        f.set("dx", 4.0);
        let reader = f.clone();
        assert!(f.update_geometry(GEOMETRY_KEY, |g| {
            let dx = reader.get("dx").and_then(|v| v.as_number()).unwrap_or(0.0);
            g.translate(dx, 0.0);
        }));
        assert_eq!(f.geometry(), Some(Geometry::Point(Point::new(4.0, 0.0))));
    }

    #[test]
    fn attribute_value_from_json() {
        let v: AttributeValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, AttributeValue::Number(3.0));
        let v: AttributeValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(v.as_text(), Some("x"));
        let v: AttributeValue =
            serde_json::from_str(r#"{"type":"Point","coordinates":{"x":1.0,"y":2.0}}"#).unwrap();
        assert_eq!(v.as_geometry(), Some(&Geometry::Point(Point::new(1.0, 2.0))));
    }
}
