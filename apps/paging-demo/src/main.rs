use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use pagelist_core::{
    ChangeType, ControllerObserver, ControllerState, FetchError, Identifiable, ListController,
    ListControllerObserver, ObjectStore, ObservableController, PageResponse, PagedListConfig,
    PagedListController, StatefulController, StoreChanges,
};
use pagelist_runtime_std::{StdRuntime, ThreadedPageSource};

const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_TOTAL: usize = 95;
const FETCH_LATENCY: Duration = Duration::from_millis(40);
const WAIT_LIMIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct Article {
    id: u64,
    title: String,
}

impl Identifiable for Article {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

/// Read-only catalog shared between the store and the fetch workers.
#[derive(Clone)]
struct Catalog {
    articles: Arc<Vec<Article>>,
}

impl Catalog {
    fn new(total: usize) -> Self {
        let articles = (0..total as u64)
            .map(|id| Article {
                id: 1000 + id,
                title: format!("Article #{id}"),
            })
            .collect();
        Self {
            articles: Arc::new(articles),
        }
    }

    fn fetch(&self, page: usize, size: usize) -> Result<PageResponse<Article>, FetchError> {
        thread::sleep(FETCH_LATENCY);
        let total = self.articles.len();
        let start = page.saturating_mul(size).min(total);
        let end = start.saturating_add(size).min(total);
        Ok(PageResponse::new(total, self.articles[start..end].to_vec()))
    }
}

impl ObjectStore<Article> for Catalog {
    fn object(&self, id: &u64) -> Option<Article> {
        let index = id.checked_sub(1000)? as usize;
        self.articles.get(index).cloned()
    }
}

struct LoggingObserver;

impl ControllerObserver for LoggingObserver {
    fn controller_did_change_state(
        &self,
        _controller: &dyn StatefulController,
        from: &ControllerState,
        to: &ControllerState,
    ) {
        log::info!("state: {from} -> {to}");
    }

    fn as_list_observer(&self) -> Option<&dyn ListControllerObserver> {
        Some(self)
    }
}

impl ListControllerObserver for LoggingObserver {
    fn controller_will_change_content(&self, _controller: &dyn StatefulController) {
        log::debug!("content changing");
    }

    fn controller_did_change(&self, _controller: &dyn StatefulController, change: ChangeType) {
        log::trace!("{change:?}");
    }

    fn controller_did_change_content(&self, _controller: &dyn StatefulController) {
        log::info!("content changed");
    }
}

fn parse_arg(position: usize, default: usize) -> anyhow::Result<usize> {
    match std::env::args().nth(position) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("argument {position} must be a non-negative integer, got {raw:?}")),
        None => Ok(default),
    }
}

fn run_until(runtime: &StdRuntime, what: &str, done: impl Fn() -> bool) -> anyhow::Result<()> {
    if !runtime.run_until(WAIT_LIMIT, done) {
        bail!("timed out waiting for {what}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "logging")]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let page_size = parse_arg(1, DEFAULT_PAGE_SIZE)?;
    let total = parse_arg(2, DEFAULT_TOTAL)?;

    let runtime = StdRuntime::new();

    let catalog = Catalog::new(total);
    let source = {
        let catalog = catalog.clone();
        ThreadedPageSource::new(move |page, size| catalog.fetch(page, size))
    };
    let controller = PagedListController::with_config(
        Rc::new(source),
        Rc::new(catalog),
        runtime.runtime_handle(),
        PagedListConfig::new(page_size),
    );
    let observer: Rc<dyn ControllerObserver> = Rc::new(LoggingObserver);
    controller.add_observer(observer.clone());

    controller.load_list();
    run_until(&runtime, "the first page", || {
        !controller.state().is_loading()
    })?;
    if let Some(error) = controller.state().error() {
        bail!("initial load failed: {error}");
    }
    log::info!(
        "{} items in {} pages of {}",
        controller.number_of_items(),
        controller.page_count(),
        controller.page_size()
    );

    // Scroll through the list, touching one index per page.
    for index in (0..controller.number_of_items()).step_by(controller.page_size()) {
        controller.load(index);
    }
    run_until(&runtime, "every page", || {
        (0..controller.page_count()).all(|page| !controller.page_state(page).is_loading())
    })?;

    let failed: Vec<usize> = (0..controller.page_count())
        .filter(|page| controller.page_state(*page).is_error())
        .collect();
    if !failed.is_empty() {
        log::warn!("pages {failed:?} failed to load");
    }

    if let Some(last) = controller.number_of_items().checked_sub(1) {
        if let Some(article) = controller.item_at(last) {
            log::info!("last item: {} ({})", article.title, article.id);
            controller.handle_store_changes(&StoreChanges::new().updated([article.id]));
        }
    }

    controller.remove_observer(observer.as_ref());
    Ok(())
}
