//! The cumulative, paginated collection of catalog items.
//!
//! Loading is split in phases so that no fetch ever borrows the store:
//! a `begin_*` call hands out a [PageRequest], the caller fetches the page
//! (see [crate::aggregator::fetch_page]) and hands the outcome back to
//! [CollectionStore::complete].
//!
//! Every request carries the generation it was issued in. A refresh starts a
//! new generation, so pages that were requested before it and arrive late
//! are discarded instead of resurrecting superseded data.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::CatalogClientError;
use crate::types::{CatalogItem, Page};

/// Default number of entries requested per index page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest number of entries requested per index page.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Pagination state of a [CollectionStore].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded (or the first page failed).
    Idle,
    /// Loading the first page, either initially or as a refresh.
    Loading,
    /// At rest, knowing whether upstream has another page.
    Ready { has_next: bool },
    /// Loading a page after the first.
    LoadingMore { page_number: u32 },
}

/// A page to fetch on behalf of a [CollectionStore].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
    generation: u64,
}

impl PageRequest {
    /// A request outside of any store, e.g. for one-off listings.
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What [CollectionStore::complete] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The page was merged into the collection.
    Applied,
    /// The page fetch failed; the collection is unchanged.
    Failed,
    /// The request belonged to a superseded generation and was ignored.
    Discarded,
}

#[derive(Debug)]
pub struct CollectionStore {
    items: Vec<CatalogItem>,
    ids: HashSet<u32>,
    state: LoadState,
    has_next: bool,
    last_page: u32,
    generation: u64,
    last_error: Option<Arc<CatalogClientError>>,
}

impl Default for CollectionStore {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
            state: LoadState::Idle,
            has_next: true,
            last_page: 0,
            generation: 0,
            last_error: None,
        }
    }
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the collection and re-arm pagination.
    ///
    /// Anything still in flight becomes stale.
    pub fn reset(&mut self) {
        self.clear();
        self.generation += 1;
    }

    /// Empty the collection and pagination state, keeping the generation.
    fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
        self.state = LoadState::Idle;
        self.has_next = true;
        self.last_page = 0;
        self.last_error = None;
    }

    /// Append a page of items, skipping ids that are already present.
    pub fn append_page(&mut self, items: Vec<CatalogItem>, has_next: bool) {
        for item in items {
            if self.ids.insert(item.id) {
                self.items.push(item);
            } else {
                trace!(id = item.id, name = %item.name, "skipping duplicate item");
            }
        }
        self.has_next = has_next;
    }

    /// The materialized collection, in load order.
    pub fn current(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn is_loading_more(&self) -> bool {
        matches!(self.state, LoadState::LoadingMore { .. })
    }

    pub fn has_more(&self) -> bool {
        self.has_next
    }

    pub fn last_error(&self) -> Option<&CatalogClientError> {
        self.last_error.as_deref()
    }

    /// Number of the last page merged into the collection.
    pub fn pages_loaded(&self) -> u32 {
        self.last_page
    }

    /// Request page 1 to replace the collection.
    ///
    /// Always proceeds, superseding any request in flight. The current items
    /// stay visible until the replacement arrives.
    pub fn begin_refresh(&mut self, page_size: u32) -> PageRequest {
        self.generation += 1;
        self.last_error = None;
        self.state = LoadState::Loading;
        debug!(generation = self.generation, "refreshing collection");
        PageRequest {
            page_number: 1,
            page_size,
            generation: self.generation,
        }
    }

    /// Request the page after the last loaded one.
    ///
    /// Returns `None` while a load is in flight or once upstream reported no
    /// further page.
    pub fn begin_next_page(&mut self, page_size: u32) -> Option<PageRequest> {
        match self.state {
            LoadState::Loading | LoadState::LoadingMore { .. } => {
                trace!(state = ?self.state, "load already in flight");
                return None;
            },
            LoadState::Ready { has_next: false } => return None,
            LoadState::Idle | LoadState::Ready { has_next: true } => {},
        }
        if !self.has_next {
            return None;
        }

        let page_number = self.last_page + 1;
        self.state = if page_number == 1 {
            LoadState::Loading
        } else {
            LoadState::LoadingMore { page_number }
        };
        self.last_error = None;
        Some(PageRequest {
            page_number,
            page_size,
            generation: self.generation,
        })
    }

    /// Merge the outcome of a request handed out by this store.
    pub fn complete(
        &mut self,
        request: PageRequest,
        outcome: Result<Page, CatalogClientError>,
    ) -> Completion {
        if request.generation != self.generation {
            debug!(
                page = request.page_number,
                request_generation = request.generation,
                generation = self.generation,
                "discarding stale page"
            );
            return Completion::Discarded;
        }

        match outcome {
            Ok(page) => {
                // the generation stays, pages requested after this one are
                // still current
                if page.page_number == 1 {
                    self.clear();
                }
                debug!(
                    page = page.page_number,
                    n_items = page.items.len(),
                    has_next = page.has_next,
                    "applying page"
                );
                self.append_page(page.items, page.has_next);
                self.last_page = page.page_number;
                self.state = LoadState::Ready {
                    has_next: self.has_next,
                };
                Completion::Applied
            },
            Err(err) => {
                warn!(page = request.page_number, error = %err, "failed to load page");
                self.last_error = Some(Arc::new(err));
                self.state = if self.items.is_empty() {
                    LoadState::Idle
                } else {
                    LoadState::Ready {
                        has_next: self.has_next,
                    }
                };
                Completion::Failed
            },
        }
    }
}
