#![doc = r"Observable list controllers with lazily fetched, page-cached content."]

pub extern crate self as pagelist_core;

mod array;
mod changes;
pub mod collections;
mod controller;
mod error;
mod object;
mod observer;
pub mod paged;
pub mod platform;
pub mod runtime;
mod state;
mod weak_set;

pub use array::ArrayListController;
pub use changes::StoreChanges;
pub use controller::{ListController, ObservableController, StatefulController};
pub use error::{ControllerError, FetchError, Result};
pub use object::ObjectController;
pub use observer::{
    ChangeType, ControllerObserver, ListControllerObserver, ObserverList, ObserverRegistry,
};
pub use paged::{
    Identifiable, ObjectStore, PageFuture, PageResponse, PageSource, PagedListConfig,
    PagedListController,
};
pub use platform::RuntimeScheduler;
pub use runtime::{DefaultScheduler, Dispatcher, Runtime, RuntimeHandle, TaskHandle};
pub use state::ControllerState;
pub use weak_set::WeakObserverSet;
