use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use pokedex_catalog::{CatalogClient, Client, MockClient, POKEDEX_CATALOG_MOCK_VAR};
use tracing::debug;

use crate::config::Config;

/// Initialize the catalog client
///
/// - Initialize a mock client if `$POKEDEX_CATALOG_MOCK` points at a file of mock responses
/// - Initialize a real client otherwise
pub fn init_catalog_client(config: &Config) -> Result<Client> {
    if let Ok(path_str) = std::env::var(POKEDEX_CATALOG_MOCK_VAR) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = %path.display(), "using mock catalog client");
        let client = MockClient::from_file(&path)
            .with_context(|| format!("could not load mock data from {}", path.display()))?;
        return Ok(client.into());
    }

    debug!(catalog_url = %config.catalog_url, "using catalog client");
    let client = CatalogClient::new(config.client_config())
        .with_context(|| format!("invalid catalog url '{}'", config.catalog_url))?;
    Ok(client.into())
}
