//! Change sets reported by an object store.

use std::hash::Hash;

use crate::collections::map::HashSet;

/// Identifiers an object store reports as touched in one change notification.
#[derive(Debug, Clone)]
pub struct StoreChanges<Id: Eq + Hash> {
    pub updated: HashSet<Id>,
    pub deleted: HashSet<Id>,
    pub refreshed: HashSet<Id>,
}

impl<Id: Eq + Hash> Default for StoreChanges<Id> {
    fn default() -> Self {
        Self {
            updated: HashSet::default(),
            deleted: HashSet::default(),
            refreshed: HashSet::default(),
        }
    }
}

impl<Id: Eq + Hash> StoreChanges<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updated(mut self, ids: impl IntoIterator<Item = Id>) -> Self {
        self.updated.extend(ids);
        self
    }

    pub fn deleted(mut self, ids: impl IntoIterator<Item = Id>) -> Self {
        self.deleted.extend(ids);
        self
    }

    pub fn refreshed(mut self, ids: impl IntoIterator<Item = Id>) -> Self {
        self.refreshed.extend(ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.deleted.is_empty() && self.refreshed.is_empty()
    }
}
