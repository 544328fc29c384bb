//! Catalog interaction types.
//!
//! The upstream API speaks in loosely typed JSON documents. The payload types
//! below mirror those documents closely, while [CatalogItem] and
//! [DetailRecord] are the domain records the rest of the crate works with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// Index pages
// ---------------------------------------------------------------------------

/// One entry of a paginated index response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    /// Reference to the detail document of this entry.
    #[serde(rename = "url")]
    pub detail_ref: String,
}

/// Raw response of `GET /pokemon?limit=..&offset=..`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<IndexEntry>,
}

/// The part of an index response the aggregator cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    pub results: Vec<IndexEntry>,
    pub has_next: bool,
}

impl From<IndexResponse> for IndexPage {
    fn from(response: IndexResponse) -> Self {
        Self {
            has_next: response.next.is_some(),
            results: response.results,
        }
    }
}

// ---------------------------------------------------------------------------
// Detail payloads
// ---------------------------------------------------------------------------

/// A `{ name, url }` pair as used throughout the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkSprites {
    #[serde(default)]
    pub front_default: Option<Url>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<Url>,
    #[serde(default)]
    pub back_default: Option<Url>,
    #[serde(default)]
    pub front_shiny: Option<Url>,
    /// Alternative sprite sets, keyed by provider (e.g. `official-artwork`).
    #[serde(default)]
    pub other: BTreeMap<String, ArtworkSprites>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(default)]
    pub slot: u32,
    #[serde(rename = "type")]
    pub type_: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSlot {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: NamedResource,
}

/// Raw response of a detail fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailPayload {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatSlot>,
    #[serde(default)]
    pub species: Option<NamedResource>,
}

impl DetailPayload {
    fn type_tags(&self) -> Vec<String> {
        self.types.iter().map(|slot| slot.type_.name.clone()).collect()
    }

    /// Create a minimal payload for testing.
    #[cfg(any(test, feature = "tests"))]
    pub fn new_mock(id: u32, name: &str, base_experience: u32, types: &[&str]) -> Self {
        DetailPayload {
            id,
            name: name.to_string(),
            base_experience: Some(base_experience),
            height: 7,
            weight: 69,
            sprites: Sprites {
                front_default: Url::parse(&format!("https://img.test/{id}.png")).ok(),
                back_default: Url::parse(&format!("https://img.test/back/{id}.png")).ok(),
                ..Default::default()
            },
            types: types
                .iter()
                .enumerate()
                .map(|(n, type_name)| TypeSlot {
                    slot: n as u32 + 1,
                    type_: NamedResource {
                        name: type_name.to_string(),
                        url: String::new(),
                    },
                })
                .collect(),
            stats: Vec::new(),
            species: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: NamedResource,
    #[serde(default)]
    pub version: Option<NamedResource>,
}

/// Raw response of a species fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesPayload {
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
}

impl SpeciesPayload {
    /// The first English flavor text, with form feeds replaced by spaces.
    pub fn english_flavor_text(&self) -> Option<String> {
        self.flavor_text_entries
            .iter()
            .find(|entry| entry.language.name == "en")
            .map(|entry| entry.flavor_text.replace('\u{c}', " "))
    }
}

// ---------------------------------------------------------------------------
// Catalog items and pages
// ---------------------------------------------------------------------------

/// A fully populated list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u32,
    pub name: String,
    pub primary_image: Option<Url>,
    pub secondary_image: Option<Url>,
    pub power_score: u32,
    pub type_tags: Vec<String>,
}

impl CatalogItem {
    /// Build an item from the index entry it was requested for and the
    /// detail payload that came back.
    ///
    /// The index name is the stable key of the item, the payload name is
    /// only used if the index entry has none.
    pub fn from_detail(entry: &IndexEntry, payload: DetailPayload) -> Self {
        let name = if entry.name.is_empty() {
            payload.name.clone()
        } else {
            entry.name.clone()
        };
        Self {
            id: payload.id,
            name,
            type_tags: payload.type_tags(),
            power_score: payload.base_experience.unwrap_or_default(),
            primary_image: payload.sprites.front_default,
            secondary_image: payload.sprites.back_default,
        }
    }

    /// The first type tag, used for theming and sorting.
    pub fn primary_type(&self) -> Option<&str> {
        self.type_tags.first().map(String::as_str)
    }

    /// "pikachu" -> "Pikachu"
    pub fn display_name(&self) -> String {
        pretty_name(&self.name)
    }

    /// 1 -> "#001", 25 -> "#025"
    pub fn display_id(&self) -> String {
        format_id(self.id)
    }

    #[cfg(any(test, feature = "tests"))]
    pub fn new_mock(id: u32, name: &str, power_score: u32, types: &[&str]) -> Self {
        let entry = IndexEntry {
            name: name.to_string(),
            detail_ref: format!("https://pokeapi.test/pokemon/{id}/"),
        };
        Self::from_detail(&entry, DetailPayload::new_mock(id, name, power_score, types))
    }
}

/// Capitalize the first letter of a name.
pub fn pretty_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format an id with leading zeros.
pub fn format_id(id: u32) -> String {
    format!("#{id:03}")
}

/// One page of catalog items, in index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_number: u32,
    pub items: Vec<CatalogItem>,
    pub has_next: bool,
}

// ---------------------------------------------------------------------------
// Detail records
// ---------------------------------------------------------------------------

/// Maximum value of a full stat bar.
pub const DEFAULT_STAT_MAX: u32 = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub base_value: u32,
}

impl Stat {
    /// Fraction of a bar of size `max` this stat fills, capped at `1.0`.
    pub fn fill_ratio(&self, max: u32) -> f64 {
        if max == 0 {
            return 1.0;
        }
        (self.base_value as f64 / max as f64).min(1.0)
    }
}

impl From<&StatSlot> for Stat {
    fn from(slot: &StatSlot) -> Self {
        Stat {
            name: slot.stat.name.replacen('-', " ", 1),
            base_value: slot.base_stat,
        }
    }
}

/// Everything the detail view shows about a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: u32,
    pub name: String,
    pub artwork: Option<Url>,
    pub form_images: Vec<Url>,
    pub type_tags: Vec<String>,
    pub height_decimeters: u32,
    pub weight_decigrams: u32,
    pub flavor_text: Option<String>,
    pub stats: Vec<Stat>,
}

impl DetailRecord {
    pub fn from_payloads(detail: DetailPayload, species: Option<&SpeciesPayload>) -> Self {
        let artwork = detail
            .sprites
            .other
            .get("official-artwork")
            .and_then(|artwork| artwork.front_default.clone())
            .or_else(|| detail.sprites.front_default.clone());

        let mut form_images: Vec<Url> = Vec::new();
        for image in [
            &detail.sprites.front_default,
            &detail.sprites.front_shiny,
            &detail.sprites.back_default,
        ]
        .into_iter()
        .flatten()
        {
            if !form_images.contains(image) {
                form_images.push(image.clone());
            }
        }

        Self {
            id: detail.id,
            type_tags: detail.type_tags(),
            stats: detail.stats.iter().map(Stat::from).collect(),
            name: detail.name,
            artwork,
            form_images,
            height_decimeters: detail.height,
            weight_decigrams: detail.weight,
            flavor_text: species.and_then(SpeciesPayload::english_flavor_text),
        }
    }

    pub fn display_name(&self) -> String {
        pretty_name(&self.name)
    }

    pub fn height_meters(&self) -> f64 {
        self.height_decimeters as f64 / 10.0
    }

    pub fn weight_kilograms(&self) -> f64 {
        self.weight_decigrams as f64 / 10.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn index_response_without_next_has_no_next_page() {
        let response: IndexResponse = serde_json::from_value(json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [
                { "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/" },
                { "name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon/2/" },
            ]
        }))
        .unwrap();
        let page = IndexPage::from(response);
        assert!(!page.has_next);
        assert_eq!(page.results[1].detail_ref, "https://pokeapi.co/api/v2/pokemon/2/");
    }

    #[test]
    fn catalog_item_from_detail_keeps_type_order_and_defaults_power() {
        let payload: DetailPayload = serde_json::from_value(json!({
            "id": 6,
            "name": "charizard",
            "base_experience": null,
            "sprites": {
                "front_default": "https://img.test/6.png",
                "back_default": null,
            },
            "types": [
                { "slot": 1, "type": { "name": "fire", "url": "" } },
                { "slot": 2, "type": { "name": "flying", "url": "" } },
            ],
        }))
        .unwrap();
        let entry = IndexEntry {
            name: "charizard".into(),
            detail_ref: "https://pokeapi.co/api/v2/pokemon/6/".into(),
        };

        let item = CatalogItem::from_detail(&entry, payload);
        assert_eq!(item.type_tags, vec!["fire".to_string(), "flying".to_string()]);
        assert_eq!(item.power_score, 0);
        assert_eq!(item.secondary_image, None);
        assert_eq!(item.primary_type(), Some("fire"));
    }

    #[test]
    fn display_helpers() {
        let item = CatalogItem::new_mock(25, "pikachu", 112, &["electric"]);
        assert_eq!(item.display_name(), "Pikachu");
        assert_eq!(item.display_id(), "#025");
        assert_eq!(format_id(1025), "#1025");
        assert_eq!(pretty_name(""), "");
    }

    #[test]
    fn detail_record_prefers_official_artwork_and_dedups_forms() {
        let detail: DetailPayload = serde_json::from_value(json!({
            "id": 1,
            "name": "bulbasaur",
            "height": 7,
            "weight": 69,
            "sprites": {
                "front_default": "https://img.test/1.png",
                "front_shiny": null,
                "back_default": "https://img.test/1.png",
                "other": {
                    "official-artwork": { "front_default": "https://img.test/art/1.png" }
                }
            },
            "stats": [
                { "base_stat": 65, "effort": 1, "stat": { "name": "special-attack", "url": "" } },
                { "base_stat": 45, "effort": 0, "stat": { "name": "hp", "url": "" } },
            ],
            "species": { "name": "bulbasaur", "url": "https://pokeapi.test/species/1/" }
        }))
        .unwrap();
        let species: SpeciesPayload = serde_json::from_value(json!({
            "flavor_text_entries": [
                { "flavor_text": "Une graine", "language": { "name": "fr", "url": "" } },
                { "flavor_text": "A strange seed was\u{c}planted", "language": { "name": "en", "url": "" } },
            ]
        }))
        .unwrap();

        let record = DetailRecord::from_payloads(detail, Some(&species));
        assert_eq!(
            record.artwork.as_ref().map(Url::as_str),
            Some("https://img.test/art/1.png")
        );
        assert_eq!(record.form_images.len(), 1);
        assert_eq!(record.flavor_text.as_deref(), Some("A strange seed was planted"));
        assert_eq!(record.stats[0].name, "special attack");
        assert_eq!(record.height_meters(), 0.7);
        assert_eq!(record.weight_kilograms(), 6.9);
    }

    #[test]
    fn detail_record_falls_back_to_front_sprite() {
        let record = DetailRecord::from_payloads(DetailPayload::new_mock(4, "charmander", 62, &[]), None);
        assert_eq!(
            record.artwork.as_ref().map(Url::as_str),
            Some("https://img.test/4.png")
        );
        assert_eq!(record.flavor_text, None);
        assert_eq!(record.form_images.len(), 2);
    }

    #[test]
    fn stat_fill_ratio_is_capped() {
        let stat = Stat {
            name: "attack".into(),
            base_value: 180,
        };
        assert_eq!(stat.fill_ratio(DEFAULT_STAT_MAX), 1.0);
        let stat = Stat {
            name: "hp".into(),
            base_value: 75,
        };
        assert_eq!(stat.fill_ratio(DEFAULT_STAT_MAX), 0.5);
    }
}
