//! Paginated, searchable Pokédex catalog.
//!
//! This crate provides:
//! - an HTTP client for the upstream catalog API, plus a mock client
//! - concurrent resolution of index pages into [CatalogItem]s
//! - the cumulative collection with its pagination state
//! - filtering and sorting of the loaded collection
//! - persisted favorites
//! - a [CatalogSession] wiring all of the above for a front end
//!
//! ## Usage
//!
//! ```ignore
//! use pokedex_catalog::{CatalogClient, CatalogClientConfig, CatalogSession, FileStore};
//!
//! let client = CatalogClient::new(CatalogClientConfig::default())?;
//! let mut session = CatalogSession::new(client, FileStore::new(data_dir), Default::default());
//! session.load_first_page().await;
//! for item in session.visible_items() {
//!     println!("{} {}", item.display_id(), item.display_name());
//! }
//! ```

pub mod aggregator;
pub mod client;
mod config;
pub mod debounce;
mod error;
pub mod favorites;
pub mod mock;
pub mod query;
pub mod session;
pub mod store;
pub mod types;

pub use client::{CatalogClient, Client, ClientTrait, collect_with_limit, index_entries};
pub use config::{CatalogClientConfig, DEFAULT_CATALOG_URL};
pub use error::{CatalogClientError, FavoritesError};
pub use favorites::{FavoriteSet, FavoritesLedger, FileStore, KeyValueStore, MemoryStore};
pub use mock::{MockClient, POKEDEX_CATALOG_MOCK_VAR};
pub use query::{SortMode, query};
pub use session::{CatalogSession, SessionConfig};
pub use store::{CollectionStore, Completion, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest};
pub use types::{CatalogItem, DetailRecord, Page};
