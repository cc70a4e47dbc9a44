//! Observer capabilities and the registry controllers notify through.
//!
//! There are two capabilities. Every observer implements
//! [`ControllerObserver`] and receives state transitions. Observers that also
//! implement [`ListControllerObserver`] advertise it through
//! [`ControllerObserver::as_list_observer`] and additionally receive the
//! structural change bracket. Observers are held weakly.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::controller::StatefulController;
use crate::state::ControllerState;
use crate::weak_set::WeakObserverSet;

/// A structural change inside a list controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Insert { at: usize },
    Delete { at: usize },
    Move { from: usize, to: usize },
    Update { at: usize },
}

pub trait ControllerObserver {
    fn controller_did_change_state(
        &self,
        controller: &dyn StatefulController,
        from: &ControllerState,
        to: &ControllerState,
    );

    /// Capability probe for structural notifications.
    ///
    /// List observers return `Some(self)`; the default opts out.
    fn as_list_observer(&self) -> Option<&dyn ListControllerObserver> {
        None
    }
}

pub trait ListControllerObserver: ControllerObserver {
    fn controller_will_change_content(&self, controller: &dyn StatefulController);

    fn controller_did_change(&self, controller: &dyn StatefulController, change: ChangeType);

    fn controller_did_change_content(&self, controller: &dyn StatefulController);
}

/// Snapshot of live observers taken before a notification pass.
pub type ObserverList = SmallVec<[Rc<dyn ControllerObserver>; 4]>;

/// Weakly held observers of one controller.
///
/// Every notification works on a snapshot taken up front and releases the
/// registry before calling out, so callbacks may add or remove observers, or
/// trigger nested notifications, without disturbing the pass in progress.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RefCell<WeakObserverSet<dyn ControllerObserver>>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observer_count", &self.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Rc<dyn ControllerObserver>) {
        self.observers.borrow_mut().insert(&observer);
    }

    pub fn remove(&self, observer: &dyn ControllerObserver) -> bool {
        self.observers.borrow_mut().remove(observer)
    }

    pub fn contains(&self, observer: &dyn ControllerObserver) -> bool {
        self.observers.borrow().contains(observer)
    }

    pub fn len(&self) -> usize {
        self.observers.borrow().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> ObserverList {
        self.observers.borrow_mut().all_objects().into_iter().collect()
    }

    pub fn notify_state_change(
        &self,
        controller: &dyn StatefulController,
        from: &ControllerState,
        to: &ControllerState,
    ) {
        for observer in self.snapshot() {
            observer.controller_did_change_state(controller, from, to);
        }
    }

    pub fn notify_will_change_content(&self, controller: &dyn StatefulController) {
        self.for_each_list_observer(|observer| observer.controller_will_change_content(controller));
    }

    pub fn notify_did(&self, controller: &dyn StatefulController, change: ChangeType) {
        self.for_each_list_observer(|observer| observer.controller_did_change(controller, change));
    }

    pub fn notify_did_change_content(&self, controller: &dyn StatefulController) {
        self.for_each_list_observer(|observer| observer.controller_did_change_content(controller));
    }

    /// Emits one complete bracket around `changes`.
    pub fn notify_content_changes(
        &self,
        controller: &dyn StatefulController,
        changes: impl IntoIterator<Item = ChangeType>,
    ) {
        self.notify_will_change_content(controller);
        for change in changes {
            self.notify_did(controller, change);
        }
        self.notify_did_change_content(controller);
    }

    fn for_each_list_observer(&self, mut f: impl FnMut(&dyn ListControllerObserver)) {
        for observer in self.snapshot() {
            if let Some(list_observer) = observer.as_list_observer() {
                f(list_observer);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/observer_tests.rs"]
mod tests;
