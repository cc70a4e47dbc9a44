/// Tuning for a [`PagedListController`](super::PagedListController).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagedListConfig {
    items_per_page: usize,
}

impl Default for PagedListConfig {
    fn default() -> Self {
        Self { items_per_page: 20 }
    }
}

impl PagedListConfig {
    /// Creates a config with the given page size, clamped to at least one.
    pub fn new(items_per_page: usize) -> Self {
        Self {
            items_per_page: items_per_page.max(1),
        }
    }

    /// Number of slots per page. Every page except possibly the last holds
    /// exactly this many. Default is 20.
    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn with_items_per_page(mut self, items_per_page: usize) -> Self {
        self.items_per_page = items_per_page.max(1);
        self
    }
}
