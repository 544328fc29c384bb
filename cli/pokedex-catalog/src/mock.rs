//! A catalog client serving canned responses.
//!
//! [MockClient] is used by tests throughout the workspace, and by the CLI when
//! [POKEDEX_CATALOG_MOCK_VAR] points at a JSON file of [MockResponses].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::client::ClientTrait;
use crate::error::CatalogClientError;
use crate::types::{DetailPayload, IndexEntry, IndexPage, IndexResponse, SpeciesPayload};

pub const POKEDEX_CATALOG_MOCK_VAR: &str = "POKEDEX_CATALOG_MOCK";

const MOCK_BASE_URL: &str = "https://pokeapi.test/api/v2";

// Shared between clones, so tests can seed or inspect a client they handed away.
type MockField<T> = Arc<Mutex<T>>;

/// Canned catalog data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockResponses {
    /// Index pages keyed by page number.
    #[serde(default)]
    pub index_pages: BTreeMap<u32, IndexResponse>,
    /// Detail payloads keyed by detail reference.
    #[serde(default)]
    pub details: BTreeMap<String, DetailPayload>,
    /// Species payloads keyed by species reference.
    #[serde(default)]
    pub species: BTreeMap<String, SpeciesPayload>,
}

#[derive(Debug, Error)]
pub enum MockDataError {
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// A catalog client that can be seeded with mock responses.
///
/// Requests for data that was not seeded fail with a 404 status.
#[derive(Debug, Default, Clone)]
pub struct MockClient {
    pub responses: MockField<MockResponses>,
    /// Artificial latency per reference, to shuffle completion order.
    pub delays: MockField<HashMap<String, Duration>>,
    /// Every reference or page requested, in request order.
    pub requests: MockField<Vec<String>>,
}

impl MockClient {
    pub fn new(responses: MockResponses) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Default::default()
        }
    }

    /// Create a mock client from a JSON file of [MockResponses].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MockDataError> {
        let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
        let responses: MockResponses =
            serde_json::from_str(&contents).map_err(MockDataError::ParseJson)?;
        Ok(Self::new(responses))
    }

    /// The reference a mocked index entry points at.
    pub fn detail_ref(name: &str) -> String {
        format!("{MOCK_BASE_URL}/pokemon/{name}/")
    }

    /// Append an index page listing the given names.
    ///
    /// The previously last page is updated to announce the new page.
    pub fn push_index_names(&mut self, names: &[&str]) -> u32 {
        let mut responses = self.responses.lock().expect("couldn't acquire mock lock");
        let page_number = responses.index_pages.len() as u32 + 1;
        if let Some(previous) = responses.index_pages.get_mut(&(page_number - 1)) {
            previous.next = Some(format!("{MOCK_BASE_URL}/pokemon?page={page_number}"));
        }
        responses.index_pages.insert(page_number, IndexResponse {
            count: None,
            next: None,
            previous: None,
            results: names
                .iter()
                .map(|name| IndexEntry {
                    name: name.to_string(),
                    detail_ref: Self::detail_ref(name),
                })
                .collect(),
        });
        page_number
    }

    /// Register the detail payload for an entry pushed with
    /// [MockClient::push_index_names].
    pub fn insert_detail(&mut self, payload: DetailPayload) {
        let detail_ref = Self::detail_ref(&payload.name);
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .details
            .insert(detail_ref, payload);
    }

    pub fn insert_species(&mut self, species_ref: impl Into<String>, payload: SpeciesPayload) {
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .species
            .insert(species_ref.into(), payload);
    }

    /// Make a page fail from now on.
    pub fn remove_index_page(&mut self, page_number: u32) -> Option<IndexResponse> {
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .index_pages
            .remove(&page_number)
    }

    /// Restore a page removed with [MockClient::remove_index_page].
    pub fn restore_index_page(&mut self, page_number: u32, response: IndexResponse) {
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .index_pages
            .insert(page_number, response);
    }

    pub fn set_delay(&mut self, detail_ref: impl Into<String>, delay: Duration) {
        self.delays
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(detail_ref.into(), delay);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    async fn record(&self, request: &str) {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .push(request.to_string());
        let delay = self
            .delays
            .lock()
            .expect("couldn't acquire mock lock")
            .get(request)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl ClientTrait for MockClient {
    async fn fetch_index_page(
        &self,
        page_number: u32,
        _page_size: u32,
    ) -> Result<IndexPage, CatalogClientError> {
        let request = format!("page:{page_number}");
        self.record(&request).await;
        let page = self
            .responses
            .lock()
            .expect("couldn't acquire mock lock")
            .index_pages
            .get(&page_number)
            .cloned();
        debug!(page_number, found = page.is_some(), "serving mock index page");
        page.map(IndexPage::from)
            .ok_or_else(|| CatalogClientError::not_found(request))
    }

    async fn fetch_detail(&self, detail_ref: &str) -> Result<DetailPayload, CatalogClientError> {
        self.record(detail_ref).await;
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .details
            .get(detail_ref)
            .cloned()
            .ok_or_else(|| CatalogClientError::not_found(detail_ref))
    }

    async fn fetch_detail_by_name(&self, name: &str) -> Result<DetailPayload, CatalogClientError> {
        let detail_ref = Self::detail_ref(&name.to_lowercase());
        self.fetch_detail(&detail_ref).await
    }

    async fn fetch_species(&self, species_ref: &str) -> Result<SpeciesPayload, CatalogClientError> {
        self.record(species_ref).await;
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .species
            .get(species_ref)
            .cloned()
            .ok_or_else(|| CatalogClientError::not_found(species_ref))
    }
}
