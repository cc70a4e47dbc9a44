use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use web_time::Instant;

use super::config::PagedListConfig;
use super::page::PageLayout;
use super::source::{Identifiable, ObjectStore, PageResponse, PageSource};
use crate::changes::StoreChanges;
use crate::collections::map::HashMap;
use crate::controller::{ListController, ObservableController, StatefulController};
use crate::error::{ControllerError, FetchError};
use crate::observer::{ChangeType, ControllerObserver, ObserverList, ObserverRegistry};
use crate::runtime::RuntimeHandle;
use crate::state::ControllerState;

type FetchCompletion = Box<dyn FnOnce(Result<(), ControllerError>) + 'static>;

struct PagedInner<T: Identifiable> {
    source: Rc<dyn PageSource<T>>,
    store: Rc<dyn ObjectStore<T>>,
    runtime: RuntimeHandle,
    config: PagedListConfig,
    state: RefCell<ControllerState>,
    layout: RefCell<PageLayout<T::Id>>,
    /// Bumped by every `load_list`; responses tagged with an older value are
    /// dropped on arrival.
    generation: Cell<u64>,
    /// Completions waiting on the single outstanding request of each page.
    in_flight: RefCell<HashMap<usize, Vec<FetchCompletion>>>,
    observers: ObserverRegistry,
}

/// A [`ListController`] that fetches its content page by page.
///
/// The first fetch discovers the total count and lays out every page and
/// slot; later fetches fill in the identifiers of one page at a time. Items
/// are resolved lazily through the [`ObjectStore`] from those identifiers.
///
/// The controller is a cheap handle: clones share the same state. Requests
/// are spawned on the given runtime and their completions, including every
/// observer notification they cause, run when that runtime drains.
///
/// At most one request per page is outstanding. Fetching a page that is
/// already in flight attaches the completion to the outstanding request
/// instead of issuing another one.
pub struct PagedListController<T: Identifiable> {
    inner: Rc<PagedInner<T>>,
}

impl<T: Identifiable> Clone for PagedListController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PagedListController<T>
where
    T: Identifiable + 'static,
{
    pub fn new(
        source: Rc<dyn PageSource<T>>,
        store: Rc<dyn ObjectStore<T>>,
        runtime: RuntimeHandle,
    ) -> Self {
        Self::with_config(source, store, runtime, PagedListConfig::default())
    }

    pub fn with_config(
        source: Rc<dyn PageSource<T>>,
        store: Rc<dyn ObjectStore<T>>,
        runtime: RuntimeHandle,
        config: PagedListConfig,
    ) -> Self {
        let layout = PageLayout::new(config.items_per_page());
        Self {
            inner: Rc::new(PagedInner {
                source,
                store,
                runtime,
                config,
                state: RefCell::new(ControllerState::NotLoaded),
                layout: RefCell::new(layout),
                generation: Cell::new(0),
                in_flight: RefCell::new(HashMap::default()),
                observers: ObserverRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &PagedListConfig {
        &self.inner.config
    }

    pub fn page_size(&self) -> usize {
        self.inner.layout.borrow().page_size()
    }

    /// Total reported by the first successful fetch of this generation.
    pub fn total_count(&self) -> Option<usize> {
        self.inner.layout.borrow().total_count()
    }

    pub fn is_materialized(&self) -> bool {
        self.inner.layout.borrow().is_materialized()
    }

    pub fn page_count(&self) -> usize {
        self.inner.layout.borrow().page_count()
    }

    pub fn page_len(&self, page: usize) -> Option<usize> {
        let layout = self.inner.layout.borrow();
        if !layout.is_materialized() {
            return None;
        }
        layout.page(page).map(|page| page.len())
    }

    /// State of one page. Before materialization page 0 reports the state of
    /// the first fetch.
    pub fn page_state(&self, page: usize) -> ControllerState {
        self.inner
            .layout
            .borrow()
            .page(page)
            .map(|page| page.state.clone())
            .unwrap_or_default()
    }

    pub fn page_fetched_at(&self, page: usize) -> Option<Instant> {
        self.inner
            .layout
            .borrow()
            .page(page)
            .and_then(|page| page.fetched_at)
    }

    pub fn needs_refresh(&self, page: usize) -> bool {
        self.inner
            .layout
            .borrow()
            .page(page)
            .is_some_and(|page| page.needs_refresh)
    }

    /// Flags `page` as stale. The flag is informational; the next successful
    /// fetch of the page clears it. Returns whether the page exists.
    pub fn invalidate_page(&self, page: usize) -> bool {
        let mut layout = self.inner.layout.borrow_mut();
        if !layout.is_materialized() {
            return false;
        }
        match layout.page_mut(page) {
            Some(page) => {
                page.needs_refresh = true;
                true
            }
            None => false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn is_fetching(&self, page: usize) -> bool {
        self.inner.in_flight.borrow().contains_key(&page)
    }

    /// Discards every page and slot and fetches page 0 again.
    ///
    /// Completions still waiting on fetches of the discarded generation are
    /// invoked right away with [`ControllerError::Superseded`]; their
    /// responses are ignored when they eventually arrive.
    pub fn load_list(&self) {
        let inner = &self.inner;
        inner.runtime.assert_owner_thread();

        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);
        *inner.layout.borrow_mut() = PageLayout::new(inner.config.items_per_page());
        let superseded: Vec<(usize, Vec<FetchCompletion>)> =
            inner.in_flight.borrow_mut().drain().collect();

        log::debug!(
            "loading list, generation {generation}, superseding {} fetches",
            superseded.len()
        );
        for (page, waiters) in superseded {
            for waiter in waiters {
                waiter(Err(ControllerError::Superseded { page }));
            }
        }

        self.fetch_page(0, |result| {
            if let Err(error) = result {
                log::debug!("initial page did not load: {error}");
            }
        });
    }

    /// Fetches the page owning `index` if that page has never been requested.
    pub fn load(&self, index: usize) {
        let page = {
            let layout = self.inner.layout.borrow();
            match layout.page_for_index(index) {
                Some(page) if page.state.is_not_loaded() => page.number,
                _ => return,
            }
        };
        self.fetch_page(page, move |result| {
            if let Err(error) = result {
                log::debug!("load of index {index} failed: {error}");
            }
        });
    }

    /// Requests page `number` from the page source.
    ///
    /// Returns immediately; `completion` runs on the runtime once the
    /// response has been applied. Before the layout exists any request turns
    /// into the first fetch of page 0.
    pub fn fetch_page(
        &self,
        number: usize,
        completion: impl FnOnce(Result<(), ControllerError>) + 'static,
    ) {
        let inner = &self.inner;
        inner.runtime.assert_owner_thread();

        let first = {
            let layout = inner.layout.borrow();
            if layout.is_materialized() && number >= layout.page_count() {
                let page_count = layout.page_count();
                drop(layout);
                completion(Err(ControllerError::PageOutOfRange {
                    page: number,
                    page_count,
                }));
                return;
            }
            !layout.is_materialized()
        };
        let page = if first { 0 } else { number };
        if first && number != 0 {
            log::debug!("page {number} requested before the list exists, fetching page 0");
        }

        {
            let mut in_flight = inner.in_flight.borrow_mut();
            if let Some(waiters) = in_flight.get_mut(&page) {
                log::debug!("page {page} already in flight, joining the outstanding request");
                waiters.push(Box::new(completion));
                return;
            }
            in_flight.insert(page, vec![Box::new(completion) as FetchCompletion]);
        }

        {
            let mut layout = inner.layout.borrow_mut();
            let target = if first {
                Some(layout.bootstrap_page_mut())
            } else {
                layout.page_mut(page)
            };
            if let Some(target) = target {
                target.state = ControllerState::Loading;
            }
        }

        // Captured before observers run: one of them may reload the list.
        let generation = inner.generation.get();
        if first {
            self.set_state(ControllerState::Loading);
            if inner.generation.get() != generation {
                return;
            }
        }

        if !inner.runtime.is_alive() {
            log::warn!("runtime is gone, page {page} cannot be fetched");
            self.abandon_fetch(page, first, generation);
            return;
        }

        let size = inner.layout.borrow().page_size();
        log::debug!("fetching page {page} ({size} items), generation {generation}");
        let request = inner.source.get(page, size);
        let weak = Rc::downgrade(&self.inner);
        let spawned = inner.runtime.spawn_local(async move {
            let result = request.await;
            match weak.upgrade() {
                Some(inner) => PagedListController { inner }.complete_fetch(page, generation, result),
                None => log::debug!("controller dropped before page {page} arrived"),
            }
        });

        if spawned.is_none() {
            log::warn!("runtime went away while page {page} was being requested");
            self.abandon_fetch(page, first, generation);
        }
    }

    fn abandon_fetch(&self, page: usize, first: bool, generation: u64) {
        if self.inner.generation.get() != generation {
            return;
        }
        let waiters = self
            .inner
            .in_flight
            .borrow_mut()
            .remove(&page)
            .unwrap_or_default();
        self.fail_fetch(
            page,
            first,
            ControllerError::RuntimeUnavailable { page },
            waiters,
        );
    }

    /// Announces store-side updates of objects currently in the list.
    ///
    /// Only acts while the controller is `Loaded`; every updated identifier
    /// found in a slot becomes one `Update` inside a single bracket.
    pub fn handle_store_changes(&self, changes: &StoreChanges<T::Id>) {
        if changes.updated.is_empty() || !self.state().is_loaded() {
            return;
        }
        let mut indices: Vec<usize> = {
            let layout = self.inner.layout.borrow();
            changes
                .updated
                .iter()
                .filter_map(|id| layout.index_of(id))
                .collect()
        };
        if indices.is_empty() {
            return;
        }
        indices.sort_unstable();
        log::debug!("store updated {} visible items", indices.len());
        self.inner
            .observers
            .notify_content_changes(self, indices.into_iter().map(|at| ChangeType::Update { at }));
    }

    fn complete_fetch(
        &self,
        page: usize,
        generation: u64,
        result: Result<PageResponse<T>, FetchError>,
    ) {
        let inner = &self.inner;
        let current = inner.generation.get();
        if generation != current {
            log::debug!(
                "discarding page {page} from generation {generation}, list is at {current}"
            );
            return;
        }

        let waiters = inner
            .in_flight
            .borrow_mut()
            .remove(&page)
            .unwrap_or_default();
        let first = !inner.layout.borrow().is_materialized();

        let response = match result {
            Ok(response) => response,
            Err(cause) => {
                log::warn!("page {page} fetch failed: {cause}");
                self.fail_fetch(
                    page,
                    first,
                    ControllerError::FetchFailed { page, cause },
                    waiters,
                );
                return;
            }
        };

        let ids: Vec<T::Id> = response.items.iter().map(T::id).collect();
        let range = {
            let mut layout = inner.layout.borrow_mut();
            if first {
                layout.materialize(response.total_count);
            }
            layout.record(page, ids)
        };
        log::debug!("page {page} loaded into slots {range:?}");

        if first {
            self.set_state(ControllerState::Loaded);
        } else if self.state().is_loaded() {
            if !range.is_empty() {
                inner
                    .observers
                    .notify_content_changes(self, range.map(|at| ChangeType::Update { at }));
            }
        } else {
            log::debug!("page {page} loaded while the list is {}", self.state());
        }

        // An observer may have reloaded the list while being notified.
        let outcome = if inner.generation.get() == generation {
            Ok(())
        } else {
            Err(ControllerError::Superseded { page })
        };
        for waiter in waiters {
            waiter(outcome.clone());
        }
    }

    fn fail_fetch(
        &self,
        page: usize,
        first: bool,
        error: ControllerError,
        waiters: Vec<FetchCompletion>,
    ) {
        {
            let mut layout = self.inner.layout.borrow_mut();
            let target = if first {
                Some(layout.bootstrap_page_mut())
            } else {
                layout.page_mut(page)
            };
            if let Some(target) = target {
                target.state = ControllerState::Error(error.clone());
            }
        }
        if first {
            self.set_state(ControllerState::Error(error.clone()));
        }
        for waiter in waiters {
            waiter(Err(error.clone()));
        }
    }
}

impl<T> StatefulController for PagedListController<T>
where
    T: Identifiable + 'static,
{
    fn state(&self) -> ControllerState {
        self.inner.state.borrow().clone()
    }

    fn set_state(&self, state: ControllerState) {
        let from = self.inner.state.replace(state.clone());
        self.inner.observers.notify_state_change(self, &from, &state);
    }
}

impl<T> ObservableController for PagedListController<T>
where
    T: Identifiable + 'static,
{
    fn observers(&self) -> ObserverList {
        self.inner.observers.snapshot()
    }

    fn add_observer(&self, observer: Rc<dyn ControllerObserver>) {
        self.inner.observers.add(observer);
    }

    fn remove_observer(&self, observer: &dyn ControllerObserver) {
        self.inner.observers.remove(observer);
    }
}

impl<T> ListController for PagedListController<T>
where
    T: Identifiable + 'static,
{
    type Item = T;

    fn number_of_items(&self) -> usize {
        self.inner.layout.borrow().len()
    }

    fn item_at(&self, index: usize) -> Option<T> {
        let id = self.inner.layout.borrow().id_at(index).cloned()?;
        self.inner.store.object(&id)
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.inner.layout.borrow().index_of(&item.id())
    }

    fn state_at(&self, index: usize) -> ControllerState {
        self.inner
            .layout
            .borrow()
            .page_for_index(index)
            .map(|page| page.state.clone())
            .unwrap_or_default()
    }
}

impl<T: Identifiable> fmt::Debug for PagedListController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = self.inner.layout.borrow();
        f.debug_struct("PagedListController")
            .field("state", &*self.inner.state.borrow())
            .field("generation", &self.inner.generation.get())
            .field("total_count", &layout.total_count())
            .field("page_count", &layout.page_count())
            .field("in_flight", &self.inner.in_flight.borrow().len())
            .field("observers", &self.inner.observers)
            .finish()
    }
}
