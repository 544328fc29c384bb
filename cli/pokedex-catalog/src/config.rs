//! Configuration types for catalog client construction.

use std::collections::BTreeMap;

/// Base URL of the public PokeAPI.
pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2";

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL for the catalog API.
    // Using a URL here adds an extra trailing slash,
    // so just use a String.
    pub catalog_url: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// Override the default user agent.
    pub user_agent: Option<String>,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}
