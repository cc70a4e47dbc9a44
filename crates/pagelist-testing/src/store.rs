use std::cell::RefCell;

use pagelist_core::collections::map::HashMap;
use pagelist_core::{Identifiable, ObjectStore};

/// Object store backed by a map.
pub struct MemoryObjectStore<T: Identifiable> {
    objects: RefCell<HashMap<T::Id, T>>,
}

impl<T: Identifiable> Default for MemoryObjectStore<T> {
    fn default() -> Self {
        Self {
            objects: RefCell::new(HashMap::default()),
        }
    }
}

impl<T: Identifiable + Clone> MemoryObjectStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: impl IntoIterator<Item = T>) -> Self {
        let store = Self::new();
        store.extend(objects);
        store
    }

    pub fn insert(&self, object: T) -> Option<T> {
        self.objects.borrow_mut().insert(object.id(), object)
    }

    pub fn extend(&self, objects: impl IntoIterator<Item = T>) {
        self.objects
            .borrow_mut()
            .extend(objects.into_iter().map(|object| (object.id(), object)));
    }

    pub fn remove(&self, id: &T::Id) -> Option<T> {
        self.objects.borrow_mut().remove(id)
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl<T: Identifiable + Clone> ObjectStore<T> for MemoryObjectStore<T> {
    fn object(&self, id: &T::Id) -> Option<T> {
        self.objects.borrow().get(id).cloned()
    }
}

/// Minimal identifiable value for controller tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestRecord {
    pub id: u32,
    pub label: String,
}

impl TestRecord {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            label: format!("record {id}"),
        }
    }
}

impl Identifiable for TestRecord {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// Records with consecutive identifiers.
pub fn records(ids: std::ops::Range<u32>) -> Vec<TestRecord> {
    ids.map(TestRecord::new).collect()
}
