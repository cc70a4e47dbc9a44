//! List controller over an in-memory vector.

use std::cell::RefCell;
use std::rc::Rc;

use crate::controller::{ListController, ObservableController, StatefulController};
use crate::error::{ControllerError, Result};
use crate::observer::{ChangeType, ControllerObserver, ObserverList, ObserverRegistry};
use crate::state::ControllerState;

/// A [`ListController`] whose content lives entirely in memory.
///
/// Every mutation is applied synchronously and announced with its own
/// will / did / did-change bracket. Mutations at invalid indices fail with
/// [`ControllerError::IndexOutOfBounds`] and emit nothing.
pub struct ArrayListController<T> {
    items: RefCell<Vec<T>>,
    state: RefCell<ControllerState>,
    observers: ObserverRegistry,
}

impl<T> ArrayListController<T>
where
    T: Clone + PartialEq,
{
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items),
            state: RefCell::new(ControllerState::Loaded),
            observers: ObserverRegistry::new(),
        }
    }

    /// Snapshot of the current content.
    pub fn items(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn append(&self, item: T) {
        let index = {
            let mut items = self.items.borrow_mut();
            items.push(item);
            items.len() - 1
        };
        self.announce(ChangeType::Insert { at: index });
    }

    pub fn insert(&self, item: T, at: usize) -> Result<()> {
        {
            let mut items = self.items.borrow_mut();
            if at > items.len() {
                return Err(ControllerError::IndexOutOfBounds {
                    index: at,
                    len: items.len(),
                });
            }
            items.insert(at, item);
        }
        self.announce(ChangeType::Insert { at });
        Ok(())
    }

    pub fn remove(&self, at: usize) -> Result<T> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if at >= items.len() {
                return Err(ControllerError::IndexOutOfBounds {
                    index: at,
                    len: items.len(),
                });
            }
            items.remove(at)
        };
        self.announce(ChangeType::Delete { at });
        Ok(removed)
    }

    /// Moves the item at `from` so that it ends up at index `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            for index in [from, to] {
                if index >= len {
                    return Err(ControllerError::IndexOutOfBounds { index, len });
                }
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.announce(ChangeType::Move { from, to });
        Ok(())
    }

    /// Replaces the whole content.
    ///
    /// No structural events are emitted; observers learn about the reset
    /// through the transition to `Loaded` and re-read everything.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.borrow_mut() = items;
        self.set_state(ControllerState::Loaded);
    }

    fn announce(&self, change: ChangeType) {
        log::trace!("array controller change {change:?}");
        self.observers.notify_content_changes(self, [change]);
    }
}

impl<T> StatefulController for ArrayListController<T> {
    fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    fn set_state(&self, state: ControllerState) {
        let from = self.state.replace(state.clone());
        self.observers.notify_state_change(self, &from, &state);
    }
}

impl<T> ObservableController for ArrayListController<T> {
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

impl<T> ListController for ArrayListController<T>
where
    T: Clone + PartialEq,
{
    type Item = T;

    fn number_of_items(&self) -> usize {
        self.items.borrow().len()
    }

    fn item_at(&self, index: usize) -> Option<T> {
        self.items.borrow().get(index).cloned()
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.items.borrow().iter().position(|candidate| candidate == item)
    }

    fn state_at(&self, _index: usize) -> ControllerState {
        ControllerState::Loaded
    }
}

impl<T> std::fmt::Debug for ArrayListController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayListController")
            .field("len", &self.items.borrow().len())
            .field("state", &*self.state.borrow())
            .field("observers", &self.observers)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/array_tests.rs"]
mod tests;
