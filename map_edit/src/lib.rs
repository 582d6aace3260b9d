//! Feature edit tracking and map overlays.
//!
//! The [`transaction`] module records inserts, updates and deletes made to a
//! [`source::VectorSource`] so they can be committed or rolled back as a
//! unit. The [`overlay`] module positions popups over a map and pans the view
//! to keep them visible.
//!
//! Everything here is single-threaded: features and sources are `Rc` handles
//! and notifications run synchronously inside the mutating call.

pub mod event;
pub mod feature;
pub mod geometry;
pub mod io;
pub mod overlay;
pub mod source;
pub mod transaction;
pub mod view;

pub use feature::{AttributeValue, Attributes, Feature, FeatureId};
pub use source::VectorSource;
pub use transaction::{ChangeSet, Transaction};
