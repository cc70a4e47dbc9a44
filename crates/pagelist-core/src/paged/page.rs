//! Page and slot bookkeeping for the paged controller.
//!
//! The layout owns a flat vector of slots and a vector of pages. Pages refer
//! to their slots by index range and slots refer to their page by number, so
//! there is no shared ownership between the two.

use std::ops::Range;

use web_time::Instant;

use crate::state::ControllerState;

#[derive(Debug)]
pub(crate) struct Page {
    pub(crate) number: usize,
    pub(crate) slots: Range<usize>,
    pub(crate) state: ControllerState,
    /// Set by invalidation, cleared by the next successful fetch. Nothing
    /// refetches on its own account of it.
    pub(crate) needs_refresh: bool,
    pub(crate) fetched_at: Option<Instant>,
}

impl Page {
    fn new(number: usize, slots: Range<usize>) -> Self {
        Self {
            number,
            slots,
            state: ControllerState::NotLoaded,
            needs_refresh: false,
            fetched_at: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Debug)]
pub(crate) struct ItemSlot<Id> {
    pub(crate) page: usize,
    pub(crate) id: Option<Id>,
}

/// Pages and slots of one controller generation.
///
/// Before the first successful fetch the layout is unmaterialized: it has no
/// slots, and at most a placeholder page 0 whose only purpose is to carry the
/// state of that first fetch.
#[derive(Debug)]
pub(crate) struct PageLayout<Id> {
    page_size: usize,
    total_count: Option<usize>,
    pages: Vec<Page>,
    slots: Vec<ItemSlot<Id>>,
}

impl<Id: PartialEq> PageLayout<Id> {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            total_count: None,
            pages: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.total_count.is_some()
    }

    pub(crate) fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of real pages; zero until materialized.
    pub(crate) fn page_count(&self) -> usize {
        if self.is_materialized() {
            self.pages.len()
        } else {
            0
        }
    }

    /// Builds every page and slot for a collection of `total_count` items.
    ///
    /// All pages hold `page_size` slots except the last, which holds the
    /// remainder. An empty collection still gets one empty page.
    pub(crate) fn materialize(&mut self, total_count: usize) {
        let page_size = self.page_size;
        let page_count = total_count.div_ceil(page_size).max(1);
        let mut pages = Vec::with_capacity(page_count);
        let mut slots = Vec::with_capacity(total_count);

        for number in 0..page_count {
            let start = number * page_size;
            let end = (start + page_size).min(total_count);
            pages.push(Page::new(number, start..end));
            slots.extend((start..end).map(|_| ItemSlot {
                page: number,
                id: None,
            }));
        }

        log::debug!(
            "materialized {total_count} slots in {} pages of {page_size}",
            pages.len()
        );
        self.total_count = Some(total_count);
        self.pages = pages;
        self.slots = slots;
    }

    pub(crate) fn page(&self, number: usize) -> Option<&Page> {
        self.pages.get(number)
    }

    pub(crate) fn page_mut(&mut self, number: usize) -> Option<&mut Page> {
        self.pages.get_mut(number)
    }

    /// Page 0 before materialization, created on demand.
    pub(crate) fn bootstrap_page_mut(&mut self) -> &mut Page {
        debug_assert!(!self.is_materialized());
        if self.pages.is_empty() {
            self.pages.push(Page::new(0, 0..0));
        }
        &mut self.pages[0]
    }

    pub(crate) fn page_for_index(&self, index: usize) -> Option<&Page> {
        self.slots
            .get(index)
            .and_then(|slot| self.pages.get(slot.page))
    }

    pub(crate) fn id_at(&self, index: usize) -> Option<&Id> {
        self.slots.get(index).and_then(|slot| slot.id.as_ref())
    }

    pub(crate) fn index_of(&self, id: &Id) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.id.as_ref() == Some(id))
    }

    /// Stores the identifiers of a successful fetch of `number`, in order,
    /// and marks the page loaded. Returns the page's slot range.
    ///
    /// # Panics
    ///
    /// When `ids` holds more entries than the page has slots. That is a
    /// broken page source, not a runtime condition.
    pub(crate) fn record(&mut self, number: usize, ids: Vec<Id>) -> Range<usize> {
        let page = match self.pages.get_mut(number) {
            Some(page) => page,
            None => panic!("page {number} does not exist in the current layout"),
        };
        assert!(
            ids.len() <= page.len(),
            "page source returned {} items for page {number}, which holds {} slots",
            ids.len(),
            page.len()
        );

        let range = page.slots.clone();
        page.state = ControllerState::Loaded;
        page.needs_refresh = false;
        page.fetched_at = Some(Instant::now());

        for (slot, id) in self.slots[range.clone()].iter_mut().zip(ids) {
            slot.id = Some(id);
        }
        range
    }
}
