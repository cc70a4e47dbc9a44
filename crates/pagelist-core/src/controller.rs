//! Controller capabilities.
//!
//! A controller owns content plus a [`ControllerState`]. Everything takes
//! `&self`: controllers keep their data behind interior mutability and never
//! hold a borrow while an observer runs, so observers are free to read the
//! controller, or mutate it, from inside a callback.

use std::rc::Rc;

use crate::observer::{ControllerObserver, ObserverList};
use crate::state::ControllerState;

pub trait StatefulController {
    fn state(&self) -> ControllerState;

    /// Replaces the state and synchronously tells every observer.
    ///
    /// Each registered observer is notified exactly once with the
    /// `(previous, new)` pair of this call. An observer that calls `set_state`
    /// again starts a nested pass which runs to completion before the outer
    /// pass moves on to its next observer.
    fn set_state(&self, state: ControllerState);
}

pub trait ObservableController: StatefulController {
    fn observers(&self) -> ObserverList;

    fn add_observer(&self, observer: Rc<dyn ControllerObserver>);

    fn remove_observer(&self, observer: &dyn ControllerObserver);
}

pub trait ListController: ObservableController {
    type Item;

    fn number_of_items(&self) -> usize;

    /// The item at `index`, or `None` when it is out of range or not yet
    /// available.
    fn item_at(&self, index: usize) -> Option<Self::Item>;

    fn index_of(&self, item: &Self::Item) -> Option<usize>;

    /// Per-index state; `NotLoaded` for indices without an owner.
    fn state_at(&self, index: usize) -> ControllerState;

    fn is_empty(&self) -> bool {
        self.number_of_items() == 0
    }
}
