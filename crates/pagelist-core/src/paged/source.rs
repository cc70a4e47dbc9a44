//! Collaborators a paged controller is built from.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;

use crate::error::FetchError;

/// Objects that carry a durable identifier independent of their position.
pub trait Identifiable {
    type Id: Clone + Eq + Hash + Debug + 'static;

    fn id(&self) -> Self::Id;
}

/// One page worth of results together with the size of the whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse<T> {
    pub total_count: usize,
    pub items: Vec<T>,
}

impl<T> PageResponse<T> {
    pub fn new(total_count: usize, items: Vec<T>) -> Self {
        Self { total_count, items }
    }
}

pub type PageFuture<T> = Pin<Box<dyn Future<Output = Result<PageResponse<T>, FetchError>> + 'static>>;

/// Asynchronous source of pages.
///
/// `get` starts a request for `size` items beginning at page `page` and
/// returns immediately. The future is polled on the controller's runtime.
pub trait PageSource<T> {
    fn get(&self, page: usize, size: usize) -> PageFuture<T>;
}

/// Synchronous lookup from identifier to materialized object.
///
/// Returning `None` is not an error; the slot simply reads as unavailable.
pub trait ObjectStore<T: Identifiable> {
    fn object(&self, id: &T::Id) -> Option<T>;
}
