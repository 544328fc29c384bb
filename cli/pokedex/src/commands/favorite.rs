use anyhow::Result;
use bpaf::Bpaf;
use futures::future::join_all;
use itertools::Itertools;
use pokedex_catalog::ClientTrait;
use pokedex_catalog::types::{format_id, pretty_name};
use tracing::{instrument, warn};

use super::Session;
use crate::utils::message;

// Mark or unmark an entry as favorite
#[derive(Debug, Bpaf, Clone)]
pub struct Favorite {
    /// Number of the entry
    #[bpaf(positional("id"))]
    pub id: u32,
}

impl Favorite {
    #[instrument(name = "favorite", skip_all, fields(id = self.id))]
    pub fn handle(self, mut session: Session) -> Result<()> {
        if session.toggle_favorite(self.id) {
            message::created(format!("Added {} to favorites", format_id(self.id)));
        } else {
            message::deleted(format!("Removed {} from favorites", format_id(self.id)));
        }
        Ok(())
    }
}

// List favorite entries
#[derive(Debug, Bpaf, Clone)]
pub struct Favorites {
    /// Print favorite ids as a JSON array
    #[bpaf(long)]
    pub json: bool,
}

impl Favorites {
    #[instrument(name = "favorites", skip_all)]
    pub async fn handle(self, session: Session) -> Result<()> {
        let favorites = session.favorites();

        if self.json {
            println!("{}", favorites.encode());
            return Ok(());
        }

        if favorites.is_empty() {
            message::plain("No favorites yet, add one with 'pokedex favorite <id>'");
            return Ok(());
        }

        let client = session.client();
        let lookups = favorites.iter().map(|id| async move {
            let name = match client.fetch_detail_by_name(&id.to_string()).await {
                Ok(detail) => pretty_name(&detail.name),
                Err(e) => {
                    warn!(id, error = %e, "could not look up favorite");
                    "<unknown>".to_string()
                },
            };
            format!("{:>5}  {name}", format_id(id))
        });

        println!("{}", join_all(lookups).await.into_iter().join("\n"));
        Ok(())
    }
}
