use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pagelist_core::{
    ChangeType, ControllerError, ControllerObserver, ControllerState, ListController,
    ObservableController, PagedListConfig, PagedListController, Runtime, StatefulController,
    StoreChanges,
};
use pagelist_testing::{
    records, ManualPageSource, MemoryObjectStore, RecordingObserver, StateRecorder, TestRecord,
};

type Outcomes = Rc<RefCell<Vec<Result<(), ControllerError>>>>;

struct Harness {
    runtime: Runtime,
    source: Rc<ManualPageSource<TestRecord>>,
    store: Rc<MemoryObjectStore<TestRecord>>,
    controller: PagedListController<TestRecord>,
    observer: Rc<RecordingObserver>,
    total: u32,
}

impl Harness {
    fn new(page_size: usize, total: u32) -> Self {
        let runtime = Runtime::default();
        let source = Rc::new(ManualPageSource::new());
        let store = Rc::new(MemoryObjectStore::with_objects(records(0..total)));
        let controller = PagedListController::with_config(
            source.clone(),
            store.clone(),
            runtime.handle(),
            PagedListConfig::new(page_size),
        );
        let observer = RecordingObserver::new();
        controller.add_observer(observer.clone());
        Self {
            runtime,
            source,
            store,
            controller,
            observer,
            total,
        }
    }

    /// Records the source would return for `page`.
    fn page(&self, page: usize) -> Vec<TestRecord> {
        let size = self.controller.page_size() as u32;
        let start = (page as u32 * size).min(self.total);
        let end = (start + size).min(self.total);
        records(start..end)
    }

    fn respond(&self, page: usize) {
        assert!(self.source.succeed(page, self.total as usize, self.page(page)));
        self.runtime.drain();
    }

    fn fail(&self, page: usize) {
        assert!(self.source.fail(page, "backend unavailable"));
        self.runtime.drain();
    }

    /// Loads the list and answers the first page.
    fn loaded(page_size: usize, total: u32) -> Self {
        let harness = Self::new(page_size, total);
        harness.controller.load_list();
        harness.respond(0);
        harness.observer.clear();
        harness
    }
}

fn outcomes() -> Outcomes {
    Rc::new(RefCell::new(Vec::new()))
}

fn recording(outcomes: &Outcomes) -> impl FnOnce(Result<(), ControllerError>) + 'static {
    let outcomes = outcomes.clone();
    move |result| outcomes.borrow_mut().push(result)
}

fn updates(range: std::ops::Range<usize>) -> Vec<ChangeType> {
    range.map(|at| ChangeType::Update { at }).collect()
}

#[test]
fn first_page_materializes_every_slot() {
    let harness = Harness::new(20, 45);
    harness.controller.load_list();

    assert_eq!(harness.source.requests(), vec![(0, 20)]);
    assert!(harness.controller.state().is_loading());
    assert_eq!(harness.controller.number_of_items(), 0);

    harness.respond(0);
    let controller = &harness.controller;

    assert_eq!(controller.number_of_items(), 45);
    assert_eq!(controller.page_count(), 3);
    let sizes: Vec<_> = (0..3).filter_map(|page| controller.page_len(page)).collect();
    assert_eq!(sizes, vec![20, 20, 5]);
    assert_eq!(controller.total_count(), Some(45));
    assert!(controller.state().is_loaded());

    assert_eq!(
        harness.observer.states(),
        vec![
            (ControllerState::NotLoaded, ControllerState::Loading),
            (ControllerState::Loading, ControllerState::Loaded),
        ]
    );
    assert!(harness.observer.brackets().is_empty());
}

#[test]
fn zero_page_size_requests_what_the_layout_holds() {
    let harness = Harness::new(0, 3);
    harness.controller.load_list();

    assert_eq!(harness.controller.page_size(), 1);
    assert_eq!(harness.source.requests(), vec![(0, 1)]);

    harness.respond(0);
    assert_eq!(harness.controller.page_count(), 3);
    assert_eq!(harness.controller.page_len(0), Some(1));
    assert_eq!(harness.controller.index_of(&TestRecord::new(0)), Some(0));
}

#[test]
fn first_page_slots_resolve_in_response_order() {
    let harness = Harness::loaded(20, 45);
    let controller = &harness.controller;

    for index in 0..20 {
        assert!(controller.state_at(index).is_loaded());
        assert_eq!(controller.item_at(index), Some(TestRecord::new(index as u32)));
    }
    assert_eq!(controller.item_at(20), None);
    assert!(controller.state_at(20).is_not_loaded());
    assert!(controller.state_at(45).is_not_loaded());
    assert_eq!(controller.item_at(45), None);
}

#[test]
fn empty_collection_has_one_empty_page() {
    let harness = Harness::loaded(20, 0);
    let controller = &harness.controller;

    assert_eq!(controller.number_of_items(), 0);
    assert!(controller.is_empty());
    assert_eq!(controller.page_count(), 1);
    assert_eq!(controller.page_len(0), Some(0));
    assert!(controller.page_state(0).is_loaded());
    assert!(controller.state().is_loaded());
}

#[test]
fn page_fetch_while_loaded_emits_one_update_bracket() {
    let harness = Harness::loaded(20, 45);
    let results = outcomes();

    harness.controller.fetch_page(1, recording(&results));
    assert_eq!(harness.source.requests().last(), Some(&(1, 20)));
    assert!(harness.controller.page_state(1).is_loading());
    assert!(harness.controller.state_at(25).is_loading());

    harness.respond(1);

    assert_eq!(harness.observer.brackets(), vec![updates(20..40)]);
    assert!(harness.observer.states().is_empty());
    assert!(matches!(results.borrow().as_slice(), [Ok(())]));
    for index in 20..40 {
        assert!(harness.controller.state_at(index).is_loaded());
        assert_eq!(
            harness.controller.item_at(index),
            Some(TestRecord::new(index as u32))
        );
    }
}

#[test]
fn short_last_page_updates_only_its_slots() {
    let harness = Harness::loaded(20, 45);
    harness.controller.fetch_page(2, |_| {});
    harness.respond(2);

    assert_eq!(harness.observer.brackets(), vec![updates(40..45)]);
    assert_eq!(harness.controller.item_at(44), Some(TestRecord::new(44)));
}

#[test]
fn short_response_leaves_trailing_slots_unresolved() {
    let harness = Harness::loaded(10, 30);
    harness.controller.fetch_page(1, |_| {});
    assert!(harness.source.succeed(1, 30, records(10..13)));
    harness.runtime.drain();

    assert_eq!(harness.controller.item_at(12), Some(TestRecord::new(12)));
    assert_eq!(harness.controller.item_at(13), None);
    assert!(harness.controller.state_at(13).is_loaded());
    assert_eq!(harness.observer.brackets(), vec![updates(10..20)]);
}

#[test]
fn failed_page_fetch_leaves_controller_state_alone() {
    let harness = Harness::loaded(20, 45);
    let results = outcomes();

    harness.controller.fetch_page(1, recording(&results));
    harness.fail(1);

    assert!(harness.controller.state().is_loaded());
    assert!(harness.controller.page_state(1).is_error());
    assert!(harness.controller.state_at(20).is_error());
    assert!(harness.controller.state_at(0).is_loaded());
    assert!(harness.observer.events().is_empty());
    assert!(matches!(
        results.borrow().as_slice(),
        [Err(ControllerError::FetchFailed { page: 1, .. })]
    ));
}

#[test]
fn failed_first_fetch_errors_controller_and_first_page() {
    let harness = Harness::new(20, 45);
    let results = outcomes();

    harness.controller.fetch_page(0, recording(&results));
    harness.fail(0);

    let state = harness.controller.state();
    assert!(state.is_error());
    assert!(matches!(
        state.error(),
        Some(ControllerError::FetchFailed { page: 0, .. })
    ));
    assert!(harness.controller.page_state(0).is_error());
    assert!(!harness.controller.is_materialized());
    assert_eq!(harness.controller.number_of_items(), 0);
    assert_eq!(results.borrow().len(), 1);
    assert!(results.borrow()[0].is_err());

    let targets: Vec<_> = harness.observer.states().into_iter().map(|(_, to)| to).collect();
    assert!(targets[0].is_loading());
    assert!(targets[1].is_error());
    assert_eq!(targets.len(), 2);
}

#[test]
fn failed_first_fetch_is_not_retried_until_reload() {
    let harness = Harness::new(20, 45);
    harness.controller.load_list();
    harness.fail(0);
    assert_eq!(harness.source.requests().len(), 1);

    harness.controller.load_list();
    harness.respond(0);

    assert!(harness.controller.state().is_loaded());
    assert_eq!(harness.controller.number_of_items(), 45);
    assert_eq!(harness.source.requests().len(), 2);
}

#[test]
fn page_request_before_first_load_fetches_page_zero() {
    let harness = Harness::new(20, 45);
    harness.controller.fetch_page(2, |_| {});

    assert_eq!(harness.source.requests(), vec![(0, 20)]);
    assert!(harness.controller.state().is_loading());

    harness.respond(0);
    assert_eq!(harness.controller.number_of_items(), 45);
    assert!(harness.controller.page_state(2).is_not_loaded());
}

#[test]
fn page_past_the_layout_is_rejected() {
    let harness = Harness::loaded(20, 45);
    let results = outcomes();

    harness.controller.fetch_page(3, recording(&results));

    assert!(matches!(
        results.borrow().as_slice(),
        [Err(ControllerError::PageOutOfRange { page: 3, page_count: 3 })]
    ));
    assert_eq!(harness.source.requests().len(), 1);
}

#[test]
fn load_fetches_the_owning_page_once() {
    let harness = Harness::loaded(20, 45);

    harness.controller.load(25);
    assert_eq!(harness.source.requested_pages(), vec![0, 1]);

    harness.controller.load(30);
    harness.controller.load(5);
    harness.controller.load(45);
    assert_eq!(harness.source.requested_pages(), vec![0, 1]);

    harness.respond(1);
    harness.controller.load(39);
    assert_eq!(harness.source.requested_pages(), vec![0, 1]);
}

#[test]
fn load_before_materialization_is_a_no_op() {
    let harness = Harness::new(20, 45);
    harness.controller.load(0);
    assert!(harness.source.requests().is_empty());
}

#[test]
fn concurrent_fetches_of_a_page_share_one_request() {
    let harness = Harness::loaded(20, 45);
    let results = outcomes();

    harness.controller.fetch_page(1, recording(&results));
    harness.controller.fetch_page(1, recording(&results));

    assert_eq!(harness.source.requested_pages(), vec![0, 1]);
    assert!(harness.controller.is_fetching(1));

    harness.respond(1);

    assert!(!harness.controller.is_fetching(1));
    assert!(matches!(results.borrow().as_slice(), [Ok(()), Ok(())]));
    assert_eq!(harness.observer.brackets().len(), 1);
}

#[test]
fn reload_supersedes_outstanding_fetches() {
    let harness = Harness::loaded(20, 45);
    let results = outcomes();

    harness.controller.fetch_page(1, recording(&results));
    harness.controller.load_list();

    assert!(matches!(
        results.borrow().as_slice(),
        [Err(ControllerError::Superseded { page: 1 })]
    ));
    assert_eq!(harness.controller.generation(), 2);
    assert_eq!(harness.controller.number_of_items(), 0);
    assert!(harness.controller.state().is_loading());

    // The old response still arrives; nothing of it may land.
    harness.respond(1);
    assert!(!harness.controller.is_materialized());
    assert!(harness.observer.brackets().is_empty());
    assert_eq!(results.borrow().len(), 1);

    harness.respond(0);
    assert_eq!(harness.controller.number_of_items(), 45);
    assert!(harness.controller.page_state(1).is_not_loaded());
    assert!(harness.controller.state().is_loaded());
}

#[test]
fn stale_first_page_is_discarded() {
    let harness = Harness::new(20, 45);
    harness.controller.load_list();
    harness.controller.load_list();
    assert_eq!(harness.source.pending_pages(), vec![0, 0]);

    assert!(harness.source.succeed(0, 10, records(0..10)));
    harness.runtime.drain();
    assert!(!harness.controller.is_materialized());
    assert!(harness.controller.state().is_loading());

    harness.respond(0);
    assert_eq!(harness.controller.total_count(), Some(45));
}

#[test]
fn index_of_matches_by_identifier() {
    let harness = Harness::loaded(20, 45);
    let lookup = TestRecord {
        id: 7,
        label: "renamed".into(),
    };

    assert_eq!(harness.controller.index_of(&lookup), Some(7));
    assert_eq!(harness.controller.index_of(&lookup), Some(7));
    assert_eq!(harness.controller.index_of(&TestRecord::new(30)), None);

    harness.controller.fetch_page(1, |_| {});
    harness.respond(1);
    assert_eq!(harness.controller.index_of(&TestRecord::new(30)), Some(30));
}

#[test]
fn unresolvable_identifier_reads_as_absent() {
    let harness = Harness::loaded(20, 45);
    harness.store.remove(&3);

    assert_eq!(harness.controller.item_at(3), None);
    assert!(harness.controller.state_at(3).is_loaded());
    assert_eq!(harness.controller.index_of(&TestRecord::new(3)), Some(3));
}

#[test]
#[should_panic(expected = "holds 5 slots")]
fn oversized_page_is_a_contract_violation() {
    let harness = Harness::loaded(20, 45);
    harness.controller.fetch_page(2, |_| {});
    harness.source.succeed(2, 45, records(40..46));
    harness.runtime.drain();
}

#[test]
fn store_updates_become_update_events() {
    let harness = Harness::loaded(20, 45);

    harness
        .controller
        .handle_store_changes(&StoreChanges::new().updated([12, 3, 25, 99]));

    assert_eq!(
        harness.observer.brackets(),
        vec![vec![ChangeType::Update { at: 3 }, ChangeType::Update { at: 12 }]]
    );
}

#[test]
fn store_changes_without_visible_items_are_silent() {
    let harness = Harness::loaded(20, 45);
    harness
        .controller
        .handle_store_changes(&StoreChanges::new().updated([30]).deleted([1]));
    assert!(harness.observer.events().is_empty());

    let loading = Harness::new(20, 45);
    loading.controller.load_list();
    loading.observer.clear();
    loading
        .controller
        .handle_store_changes(&StoreChanges::new().updated([1]));
    assert!(loading.observer.events().is_empty());
}

#[test]
fn invalidated_page_is_cleared_by_next_fetch() {
    let harness = Harness::loaded(20, 45);
    let first_fetch = harness.controller.page_fetched_at(0);
    assert!(first_fetch.is_some());

    assert!(harness.controller.invalidate_page(0));
    assert!(!harness.controller.invalidate_page(3));
    assert!(harness.controller.needs_refresh(0));
    assert!(!harness.controller.needs_refresh(1));

    harness.controller.fetch_page(0, |_| {});
    harness.respond(0);

    assert!(!harness.controller.needs_refresh(0));
    assert!(harness.controller.page_fetched_at(0) >= first_fetch);
    assert_eq!(harness.observer.brackets(), vec![updates(0..20)]);
}

#[test]
fn state_only_observers_never_see_brackets() {
    let harness = Harness::loaded(20, 45);
    let states = StateRecorder::new();
    harness.controller.add_observer(states.clone());

    harness.controller.fetch_page(1, |_| {});
    harness.respond(1);
    harness.controller.set_state(ControllerState::Loading);

    assert_eq!(
        states.transitions(),
        vec![(ControllerState::Loaded, ControllerState::Loading)]
    );
    assert_eq!(harness.observer.brackets().len(), 1);
}

#[test]
fn page_arriving_while_not_loaded_emits_no_bracket() {
    let harness = Harness::loaded(20, 45);
    harness.controller.fetch_page(1, |_| {});
    harness.controller.set_state(ControllerState::NotLoaded);
    harness.observer.clear();

    harness.respond(1);

    assert!(harness.observer.events().is_empty());
    assert!(harness.controller.page_state(1).is_loaded());
    assert!(harness.controller.state().is_not_loaded());
}

#[test]
fn dropped_observer_is_skipped() {
    let harness = Harness::loaded(20, 45);
    let transient = RecordingObserver::new();
    harness.controller.add_observer(transient.clone());
    assert_eq!(harness.controller.observers().len(), 2);

    drop(transient);
    harness.controller.fetch_page(1, |_| {});
    harness.respond(1);

    assert_eq!(harness.controller.observers().len(), 1);
    assert_eq!(harness.observer.brackets().len(), 1);
}

#[test]
fn fetch_without_a_runtime_fails_immediately() {
    let harness = Harness::new(20, 45);
    let results = outcomes();
    let Harness {
        runtime,
        controller,
        source,
        ..
    } = harness;
    drop(runtime);

    controller.fetch_page(0, recording(&results));

    assert!(matches!(
        controller.state().error(),
        Some(ControllerError::RuntimeUnavailable { page: 0 })
    ));
    assert!(matches!(
        results.borrow().as_slice(),
        [Err(ControllerError::RuntimeUnavailable { page: 0 })]
    ));
    assert!(!controller.is_fetching(0));
    assert!(source.requests().is_empty());
}

#[test]
fn response_after_controller_drop_is_ignored() {
    let harness = Harness::new(20, 45);
    harness.controller.load_list();
    let Harness {
        runtime,
        controller,
        source,
        ..
    } = harness;
    drop(controller);

    assert!(source.succeed(0, 45, records(0..20)));
    runtime.drain();
    assert!(!runtime.has_pending());
}

/// Reloads the list the first time it becomes loaded.
struct ReloadOnLoaded {
    controller: PagedListController<TestRecord>,
    fired: Cell<bool>,
}

impl ControllerObserver for ReloadOnLoaded {
    fn controller_did_change_state(
        &self,
        _controller: &dyn StatefulController,
        _from: &ControllerState,
        to: &ControllerState,
    ) {
        if to.is_loaded() && !self.fired.replace(true) {
            self.controller.load_list();
        }
    }
}

#[test]
fn reload_from_an_observer_supersedes_the_completing_fetch() {
    let harness = Harness::new(20, 45);
    let reloader = Rc::new(ReloadOnLoaded {
        controller: harness.controller.clone(),
        fired: Cell::new(false),
    });
    harness.controller.add_observer(reloader.clone());
    let generation = harness.controller.generation();
    let results = outcomes();

    harness.controller.fetch_page(0, recording(&results));
    harness.respond(0);

    assert!(reloader.fired.get());
    assert!(matches!(
        results.borrow().as_slice(),
        [Err(ControllerError::Superseded { page: 0 })]
    ));
    assert!(harness.controller.generation() > generation);
    assert!(!harness.controller.is_materialized());
    assert!(harness.controller.state().is_loading());
    assert_eq!(harness.source.requests(), vec![(0, 20), (0, 20)]);
    assert!(harness.controller.is_fetching(0));
}
