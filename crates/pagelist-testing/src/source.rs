use std::cell::RefCell;

use futures::channel::oneshot;
use pagelist_core::{FetchError, PageFuture, PageResponse, PageSource};

type Reply<T> = oneshot::Sender<Result<PageResponse<T>, FetchError>>;

struct PendingRequest<T> {
    page: usize,
    reply: Reply<T>,
}

/// Page source whose requests stay outstanding until the test resolves them.
///
/// Resolving a request only completes the future; the controller applies the
/// result on the next drain of its runtime.
pub struct ManualPageSource<T> {
    requests: RefCell<Vec<(usize, usize)>>,
    pending: RefCell<Vec<PendingRequest<T>>>,
}

impl<T> Default for ManualPageSource<T> {
    fn default() -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        }
    }
}

impl<T> ManualPageSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(page, size)` pair ever requested, in order.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.borrow().clone()
    }

    /// Pages requested so far, in order.
    pub fn requested_pages(&self) -> Vec<usize> {
        self.requests.borrow().iter().map(|(page, _)| *page).collect()
    }

    /// Pages with an unresolved request, oldest first.
    pub fn pending_pages(&self) -> Vec<usize> {
        self.pending.borrow().iter().map(|request| request.page).collect()
    }

    /// Resolves the oldest outstanding request for `page`.
    ///
    /// Returns `false` when no such request exists or its future was dropped.
    pub fn respond(&self, page: usize, result: Result<PageResponse<T>, FetchError>) -> bool {
        let request = {
            let mut pending = self.pending.borrow_mut();
            match pending.iter().position(|request| request.page == page) {
                Some(position) => pending.remove(position),
                None => return false,
            }
        };
        request.reply.send(result).is_ok()
    }

    pub fn succeed(&self, page: usize, total_count: usize, items: Vec<T>) -> bool {
        self.respond(page, Ok(PageResponse::new(total_count, items)))
    }

    pub fn fail(&self, page: usize, message: &str) -> bool {
        self.respond(page, Err(FetchError::msg(message)))
    }
}

impl<T: 'static> PageSource<T> for ManualPageSource<T> {
    fn get(&self, page: usize, size: usize) -> PageFuture<T> {
        let (reply, response) = oneshot::channel();
        self.requests.borrow_mut().push((page, size));
        self.pending
            .borrow_mut()
            .push(PendingRequest { page, reply });
        Box::pin(async move {
            response
                .await
                .unwrap_or_else(|_| Err(FetchError::msg("request abandoned by the test")))
        })
    }
}
