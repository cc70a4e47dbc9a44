//! Controller that tracks one object held in an object store.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::changes::StoreChanges;
use crate::controller::{ObservableController, StatefulController};
use crate::error::ControllerError;
use crate::observer::{ControllerObserver, ObserverList, ObserverRegistry};
use crate::paged::{Identifiable, ObjectStore};
use crate::state::ControllerState;

/// An [`ObservableController`] around a single object.
///
/// The controller starts `Loaded`. Store changes that touch the object, or
/// any of its related identifiers, re-announce `Loaded`; deleting the object
/// moves the controller into an error state.
pub struct ObjectController<T: Identifiable> {
    id: T::Id,
    object: RefCell<T>,
    related: Vec<T::Id>,
    store: Option<Rc<dyn ObjectStore<T>>>,
    state: RefCell<ControllerState>,
    observers: ObserverRegistry,
}

impl<T> ObjectController<T>
where
    T: Identifiable + Clone + 'static,
{
    pub fn new(object: T) -> Self {
        Self {
            id: object.id(),
            object: RefCell::new(object),
            related: Vec::new(),
            store: None,
            state: RefCell::new(ControllerState::Loaded),
            observers: ObserverRegistry::new(),
        }
    }

    /// Identifiers of other objects whose updates count as updates of this one.
    pub fn with_related(mut self, ids: impl IntoIterator<Item = T::Id>) -> Self {
        self.related.extend(ids);
        self
    }

    /// Store the object is re-read from when it changes.
    pub fn with_store(mut self, store: Rc<dyn ObjectStore<T>>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn id(&self) -> &T::Id {
        &self.id
    }

    pub fn object(&self) -> T {
        self.object.borrow().clone()
    }

    pub fn related(&self) -> &[T::Id] {
        &self.related
    }

    /// Applies one store notification. Checks run in order and the first one
    /// that matches decides the outcome: updated, then deleted, then
    /// refreshed.
    pub fn handle_store_changes(&self, changes: &StoreChanges<T::Id>) {
        if changes.updated.contains(&self.id)
            || self.related.iter().any(|id| changes.updated.contains(id))
        {
            self.reload();
            self.set_state(ControllerState::Loaded);
            return;
        }

        if changes.deleted.contains(&self.id) {
            log::debug!("observed object {:?} was deleted", self.id);
            self.set_state(ControllerState::Error(
                ControllerError::ObjectUnavailable(format!("{:?}", self.id)),
            ));
            return;
        }

        if changes.refreshed.contains(&self.id) {
            self.reload();
            self.set_state(ControllerState::Loaded);
        }
    }

    fn reload(&self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match store.object(&self.id) {
            Some(object) => *self.object.borrow_mut() = object,
            None => log::debug!("object {:?} missing from its store, keeping last value", self.id),
        }
    }
}

impl<T> StatefulController for ObjectController<T>
where
    T: Identifiable + Clone + 'static,
{
    fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    fn set_state(&self, state: ControllerState) {
        let from = self.state.replace(state.clone());
        self.observers.notify_state_change(self, &from, &state);
    }
}

impl<T> ObservableController for ObjectController<T>
where
    T: Identifiable + Clone + 'static,
{
    fn observers(&self) -> ObserverList {
        self.observers.snapshot()
    }

    fn add_observer(&self, observer: Rc<dyn ControllerObserver>) {
        self.observers.add(observer);
    }

    fn remove_observer(&self, observer: &dyn ControllerObserver) {
        self.observers.remove(observer);
    }
}

impl<T: Identifiable> fmt::Debug for ObjectController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectController")
            .field("id", &self.id)
            .field("related", &self.related)
            .field("state", &*self.state.borrow())
            .field("observers", &self.observers)
            .finish()
    }
}
