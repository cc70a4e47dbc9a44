//! Weak reference set for tracking controller observers.
//!
//! Entries are kept sorted by the address of the referenced allocation so
//! that insert, remove and membership checks are binary searches. Holding an
//! entry never keeps its target alive; dead entries are swept whenever the
//! live objects are collected.

use std::fmt;
use std::rc::{Rc, Weak};

/// Identity of an allocation, independent of any trait-object metadata.
fn address_of<T: ?Sized>(value: &T) -> usize {
    value as *const T as *const () as usize
}

/// A set of weak references ordered by target address.
pub struct WeakObserverSet<T: ?Sized> {
    /// Sorted array of (address, weak_ref) pairs.
    entries: Vec<(usize, Weak<T>)>,
}

impl<T: ?Sized> fmt::Debug for WeakObserverSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObserverSet")
            .field("entry_count", &self.entries.len())
            .field("alive_count", &self.count())
            .finish()
    }
}

impl<T: ?Sized> WeakObserverSet<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn search(&self, address: usize) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&address, |(addr, _)| *addr)
    }

    /// Adds `object` to the set. Inserting an object that is already present
    /// is a no-op.
    pub fn insert(&mut self, object: &Rc<T>) {
        let address = address_of(&**object);
        match self.search(address) {
            Ok(pos) => {
                // The address may belong to a dead allocation that was reused.
                if self.entries[pos].1.strong_count() == 0 {
                    self.entries[pos].1 = Rc::downgrade(object);
                }
            }
            Err(pos) => self.entries.insert(pos, (address, Rc::downgrade(object))),
        }
    }

    /// Removes `object` from the set, returning whether it was present.
    ///
    /// Lookup is by address, so any reference to the same allocation works.
    pub fn remove<U: ?Sized>(&mut self, object: &U) -> bool {
        match self.search(address_of(object)) {
            Ok(pos) => {
                self.entries.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns whether `object` is a live member of the set.
    pub fn contains<U: ?Sized>(&self, object: &U) -> bool {
        match self.search(address_of(object)) {
            Ok(pos) => self.entries[pos].1.strong_count() > 0,
            Err(_) => false,
        }
    }

    /// Number of live members.
    pub fn count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drops entries whose target has been destroyed.
    pub fn sweep(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        let swept = before - self.entries.len();
        if swept > 0 {
            log::trace!("swept {swept} dead observer entries");
        }
    }

    /// Strong references to every live member, sweeping dead entries first.
    ///
    /// Order follows target addresses and carries no meaning.
    pub fn all_objects(&mut self) -> Vec<Rc<T>> {
        self.sweep();
        self.entries
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }

    /// Like [`all_objects`](Self::all_objects) but leaves dead entries in place.
    pub fn iter_alive(&self) -> impl Iterator<Item = Rc<T>> + '_ {
        self.entries.iter().filter_map(|(_, weak)| weak.upgrade())
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl<T: ?Sized> Default for WeakObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
