//! Lazily fetched, page-cached list content.

mod config;
mod controller;
mod page;
mod source;

pub use config::PagedListConfig;
pub use controller::PagedListController;
pub use source::{Identifiable, ObjectStore, PageFuture, PageResponse, PageSource};
