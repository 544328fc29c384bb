//! The catalog as presented to a front end.
//!
//! A [CatalogSession] ties together the client, the collection store, the
//! favorites ledger and the debounced search term. It is the only owner of
//! that state and is mutated through `&mut self`; the only concurrency
//! involved is the detail fan-out of a page fetch and the debounce timer.
//!
//! Front ends that need to keep handling input while a page is loading can
//! use the split-phase [CatalogSession::begin_next_page] /
//! [CatalogSession::begin_refresh] and [CatalogSession::complete] instead of
//! the all-in-one `load_*` methods.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::aggregator::fetch_page;
use crate::client::ClientTrait;
use crate::debounce::{DEFAULT_SEARCH_DEBOUNCE, Debouncer};
use crate::error::CatalogClientError;
use crate::favorites::{FavoriteSet, FavoritesLedger, KeyValueStore};
use crate::query::{SortMode, query};
use crate::store::{CollectionStore, Completion, DEFAULT_PAGE_SIZE, LoadState, PageRequest};
use crate::types::{CatalogItem, DetailRecord, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub page_size: u32,
    pub search_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

#[derive(Debug)]
pub struct CatalogSession<C, S> {
    client: C,
    config: SessionConfig,
    store: CollectionStore,
    favorites: FavoritesLedger<S>,
    search_input: String,
    search: Debouncer<String>,
    sort_mode: SortMode,
}

impl<C, S> CatalogSession<C, S>
where
    C: ClientTrait,
    S: KeyValueStore,
{
    /// Create a session with an empty collection and the favorites stored in
    /// `storage`.
    pub fn new(client: C, storage: S, config: SessionConfig) -> Self {
        Self {
            client,
            config,
            store: CollectionStore::new(),
            favorites: FavoritesLedger::load(storage),
            search_input: String::new(),
            search: Debouncer::new(config.search_debounce, String::new()),
            sort_mode: SortMode::default(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    // region: loading

    /// Load the first page unless data is already loaded or a load is in
    /// flight.
    ///
    /// Returns `None` if nothing was requested.
    pub async fn load_first_page(&mut self) -> Option<Completion> {
        if !self.store.current().is_empty() || self.store.state() != LoadState::Idle {
            debug!(state = ?self.store.state(), "first page already requested");
            return None;
        }
        self.load_next_page().await
    }

    /// Load the page after the last loaded one.
    ///
    /// Returns `None` if a load is in flight or there is no further page.
    pub async fn load_next_page(&mut self) -> Option<Completion> {
        let request = self.begin_next_page()?;
        let outcome = fetch_page(&self.client, &request).await;
        Some(self.complete(request, outcome))
    }

    /// Reload page 1 and replace the collection with it.
    ///
    /// On failure the current collection stays in place.
    pub async fn refresh(&mut self) -> Completion {
        let request = self.begin_refresh();
        let outcome = fetch_page(&self.client, &request).await;
        self.complete(request, outcome)
    }

    pub fn begin_next_page(&mut self) -> Option<PageRequest> {
        self.store.begin_next_page(self.config.page_size)
    }

    pub fn begin_refresh(&mut self) -> PageRequest {
        self.store.begin_refresh(self.config.page_size)
    }

    /// Hand back the outcome of a request obtained from `begin_*`.
    pub fn complete(
        &mut self,
        request: PageRequest,
        outcome: Result<Page, CatalogClientError>,
    ) -> Completion {
        self.store.complete(request, outcome)
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn is_loading_more(&self) -> bool {
        self.store.is_loading_more()
    }

    pub fn has_more(&self) -> bool {
        self.store.has_more()
    }

    pub fn last_error(&self) -> Option<&CatalogClientError> {
        self.store.last_error()
    }

    pub fn pages_loaded(&self) -> u32 {
        self.store.pages_loaded()
    }

    /// Everything loaded so far, in load order.
    pub fn collection(&self) -> &[CatalogItem] {
        self.store.current()
    }

    // endregion

    // region: search and sort

    /// Update the search term.
    ///
    /// The visible items follow once the term has been stable for the
    /// configured debounce delay.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_input = term.into();
        self.search.push(self.search_input.clone());
    }

    /// Update the search term, bypassing the debounce delay.
    pub fn set_search_term_now(&mut self, term: impl Into<String>) {
        self.search_input = term.into();
        self.search.push_now(self.search_input.clone());
    }

    /// The search term as last entered.
    pub fn search_term(&self) -> &str {
        &self.search_input
    }

    /// The search term the visible items are currently filtered by.
    pub fn applied_search_term(&self) -> String {
        self.search.value()
    }

    /// Notified whenever a debounced search term is applied.
    pub fn search_updates(&self) -> watch::Receiver<String> {
        self.search.subscribe()
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// The loaded items matching the applied search term, in sort order.
    pub fn visible_items(&self) -> Vec<&CatalogItem> {
        query(self.store.current(), &self.search.value(), self.sort_mode)
    }

    // endregion

    // region: favorites

    /// Flip whether `id` is a favorite, returning the new membership.
    pub fn toggle_favorite(&mut self, id: u32) -> bool {
        self.favorites.toggle(id)
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.favorites.is_favorite(id)
    }

    pub fn favorites(&self) -> &FavoriteSet {
        self.favorites.favorites()
    }

    // endregion

    /// Fetch everything shown in the detail view of `name`.
    ///
    /// The species description is optional: if it can't be fetched the
    /// record is returned without flavor text.
    #[instrument(skip(self))]
    pub async fn detail(&self, name: &str) -> Result<DetailRecord, CatalogClientError> {
        let detail = self.client.fetch_detail_by_name(name).await?;

        let species = match detail.species.as_ref() {
            Some(species) => match self.client.fetch_species(&species.url).await {
                Ok(species) => Some(species),
                Err(e) => {
                    warn!(name, error = %e, "failed to fetch species, omitting flavor text");
                    None
                },
            },
            None => None,
        };

        Ok(DetailRecord::from_payloads(detail, species.as_ref()))
    }
}
