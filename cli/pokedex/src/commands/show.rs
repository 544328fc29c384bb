use std::fmt::{self, Display};

use anyhow::{Context, Result};
use bpaf::Bpaf;
use pokedex_catalog::DetailRecord;
use pokedex_catalog::types::{DEFAULT_STAT_MAX, format_id};
use tracing::instrument;

use super::Session;

const STAT_BAR_WIDTH: usize = 20;

// Show details about a single entry
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Print the entry as JSON
    #[bpaf(long)]
    pub json: bool,

    /// Name or number of the entry
    #[bpaf(positional("name"))]
    pub name: String,
}

impl Show {
    #[instrument(name = "show", skip_all, fields(name = %self.name))]
    pub async fn handle(self, session: Session) -> Result<()> {
        let record = session
            .detail(&self.name)
            .await
            .with_context(|| format!("could not find '{}'", self.name))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }

        let favorite = session.is_favorite(record.id);
        print!("{}", DisplayDetail { record: &record, favorite });
        Ok(())
    }
}

struct DisplayDetail<'a> {
    record: &'a DetailRecord,
    favorite: bool,
}

impl Display for DisplayDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record;
        let marker = if self.favorite { " *" } else { "" };

        writeln!(f, "{} {}{marker}", format_id(record.id), record.display_name())?;
        if !record.type_tags.is_empty() {
            writeln!(f, "Types:  {}", record.type_tags.join(", "))?;
        }
        writeln!(f, "Height: {:.1} m", record.height_meters())?;
        writeln!(f, "Weight: {:.1} kg", record.weight_kilograms())?;
        if let Some(artwork) = &record.artwork {
            writeln!(f, "Artwork: {artwork}")?;
        }
        if let Some(flavor_text) = &record.flavor_text {
            writeln!(f)?;
            writeln!(f, "{}", flavor_text.replace('\n', " "))?;
        }

        if !record.stats.is_empty() {
            writeln!(f)?;
            let name_width = record
                .stats
                .iter()
                .map(|stat| stat.name.len())
                .max()
                .unwrap_or_default();
            for stat in &record.stats {
                let filled =
                    (stat.fill_ratio(DEFAULT_STAT_MAX) * STAT_BAR_WIDTH as f64).round() as usize;
                writeln!(
                    f,
                    "{name:<name_width$}  {value:>3}  {bar}",
                    name = stat.name,
                    value = stat.base_value,
                    bar = "#".repeat(filled),
                )?;
            }
        }
        Ok(())
    }
}
