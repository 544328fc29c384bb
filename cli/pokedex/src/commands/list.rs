use std::fmt::{self, Display};

use anyhow::{Result, bail};
use bpaf::Bpaf;
use pokedex_catalog::{CatalogItem, FavoriteSet, SortMode};
use tracing::{debug, instrument};

use super::Session;
use crate::utils::message;

// List entries of the catalog
#[derive(Debug, Bpaf, Clone)]
pub struct List {
    /// Display entries as a JSON array
    #[bpaf(long)]
    pub json: bool,

    /// Load every page of the catalog
    #[bpaf(short, long)]
    pub all: bool,

    /// Number of pages to load
    #[bpaf(long, argument("pages"), fallback(1))]
    pub pages: u32,

    /// Only show entries whose name or number contains <term>
    #[bpaf(long, short, argument("term"))]
    pub search: Option<String>,

    /// Sort entries by 'name', 'type' or 'power'
    #[bpaf(long, argument("mode"), fallback(SortMode::ByName))]
    pub sort: SortMode,

    /// Only show favorites
    #[bpaf(long)]
    pub favorites: bool,
}

impl List {
    #[instrument(name = "list", skip_all, fields(all = self.all, pages = self.pages))]
    pub async fn handle(self, mut session: Session) -> Result<()> {
        if self.pages == 0 && !self.all {
            bail!("'--pages' must be at least 1");
        }

        session.load_first_page().await;
        while session.last_error().is_none()
            && session.has_more()
            && (self.all || session.pages_loaded() < self.pages)
        {
            if session.load_next_page().await.is_none() {
                break;
            }
        }

        if let Some(err) = session.last_error() {
            if session.collection().is_empty() {
                bail!("could not load the catalog: {err}");
            }
            message::warning(format!("not all pages could be loaded: {err}"));
        }
        debug!(n_items = session.collection().len(), "loaded catalog");

        session.set_sort_mode(self.sort);
        session.set_search_term_now(self.search.unwrap_or_default());

        let items = session
            .visible_items()
            .into_iter()
            .filter(|item| !self.favorites || session.is_favorite(item.id))
            .collect::<Vec<_>>();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        if items.is_empty() {
            message::plain("No entries found");
            return Ok(());
        }

        print!("{}", DisplayItems::new(&items, session.favorites()));
        if session.has_more() && !self.all {
            message::plain("Use '--pages' or '--all' to load more entries");
        }
        Ok(())
    }
}

/// Renders catalog items as a table.
pub(crate) struct DisplayItems<'a> {
    items: &'a [&'a CatalogItem],
    favorites: &'a FavoriteSet,
}

impl<'a> DisplayItems<'a> {
    pub(crate) fn new(items: &'a [&'a CatalogItem], favorites: &'a FavoriteSet) -> Self {
        Self { items, favorites }
    }
}

impl Display for DisplayItems<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .items
            .iter()
            .map(|item| item.name.len())
            .max()
            .unwrap_or_default();

        for item in self.items {
            let marker = if self.favorites.contains(item.id) {
                "*"
            } else {
                " "
            };
            writeln!(
                f,
                "{marker} {id:>5}  {name:<name_width$}  {power:>4}  {types}",
                id = item.display_id(),
                name = item.display_name(),
                power = item.power_score,
                types = item.type_tags.join("/"),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_table_with_favorites() {
        let items = [
            CatalogItem::new_mock(1, "bulbasaur", 64, &["grass", "poison"]),
            CatalogItem::new_mock(25, "pikachu", 112, &["electric"]),
        ];
        let refs = items.iter().collect::<Vec<_>>();
        let favorites = [25].into_iter().collect::<FavoriteSet>();

        let rendered = DisplayItems::new(&refs, &favorites).to_string();
        assert_eq!(
            rendered,
            concat!(
                "   #001  Bulbasaur    64  grass/poison\n",
                "*  #025  Pikachu     112  electric\n",
            )
        );
    }
}
