//! Filtering and sorting of the loaded collection.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CatalogItem;

/// Order in which query results are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Alphabetically by name.
    #[default]
    #[display("name")]
    ByName,
    /// Alphabetically by primary type, then by name.
    #[display("type")]
    ByType,
    /// Strongest first.
    #[display("power")]
    ByPower,
}

#[derive(Debug, Error)]
#[error("unknown sort mode '{0}', expected one of 'name', 'type' or 'power'")]
pub struct ParseSortModeError(String);

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "by-name" => Ok(SortMode::ByName),
            "type" | "by-type" => Ok(SortMode::ByType),
            "power" | "by-power" => Ok(SortMode::ByPower),
            _ => Err(ParseSortModeError(s.to_string())),
        }
    }
}

/// Select and order the items to present.
///
/// Items whose name (ignoring case) or decimal id contains the trimmed
/// search term are kept; a blank term keeps everything. The sort is stable,
/// so items that compare equal keep their collection order.
pub fn query<'a>(
    collection: &'a [CatalogItem],
    search_term: &str,
    sort_mode: SortMode,
) -> Vec<&'a CatalogItem> {
    let term = search_term.trim().to_lowercase();

    let mut selected = collection
        .iter()
        .filter(|item| term.is_empty() || matches_term(item, &term))
        .collect::<Vec<_>>();

    match sort_mode {
        SortMode::ByName => selected.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortMode::ByType => selected.sort_by(|a, b| {
            compare_names(a.primary_type().unwrap_or(""), b.primary_type().unwrap_or(""))
                .then_with(|| compare_names(&a.name, &b.name))
        }),
        SortMode::ByPower => selected.sort_by(|a, b| b.power_score.cmp(&a.power_score)),
    }

    selected
}

/// `term` must already be trimmed and lowercase.
fn matches_term(item: &CatalogItem, term: &str) -> bool {
    item.name.to_lowercase().contains(term) || item.id.to_string().contains(term)
}

/// Case-insensitive comparison with byte order as tie-break.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
