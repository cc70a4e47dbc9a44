use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a page source.
///
/// Cheap to clone so that it can be stored in page and controller states and
/// handed to every completion waiting on the same fetch.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("{0}")]
    Message(String),

    #[error("{0}")]
    Source(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl FetchError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn new(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Arc::new(source))
    }
}

#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    #[error("fetch of page {page} failed: {cause}")]
    FetchFailed { page: usize, cause: FetchError },

    #[error("fetch of page {page} was superseded by a list reload")]
    Superseded { page: usize },

    #[error("runtime dropped before page {page} could be fetched")]
    RuntimeUnavailable { page: usize },

    #[error("page {page} is out of range ({page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("object {0} is no longer available")]
    ObjectUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
