use crate::feature::Feature;

/// Owned result of a transaction window, ready to be persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub inserts: Vec<Feature>,
    pub updates: Vec<Feature>,
    pub deletes: Vec<Feature>,
}

impl ChangeSet {
    /// Total number of changed features.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
