use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use bpaf::Bpaf;
use pokedex_catalog::{Client, collect_with_limit, index_entries};
use tracing::{debug, instrument};

use crate::config::Config;

// Print the names of all entries in the catalog
#[derive(Debug, Bpaf, Clone)]
pub struct Names {
    /// Print at most <n> names
    #[bpaf(long, short('n'), argument("n"))]
    pub limit: Option<NonZeroUsize>,
}

impl Names {
    /// Only the index is fetched, entries are not resolved.
    #[instrument(name = "names", skip_all)]
    pub async fn handle(self, config: Config, client: Client) -> Result<()> {
        let entries = index_entries(&client, config.page_size);
        let entries = collect_with_limit(entries, self.limit)
            .await
            .context("could not list catalog entries")?;

        debug!(n_entries = entries.len(), "listed catalog entries");
        for entry in entries {
            println!("{}", entry.name);
        }
        Ok(())
    }
}
