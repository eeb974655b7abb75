//! Goods catalog — category-organized tracked items and their per-region series ids.
//!
//! The catalog is stored as a TOML config file: categories of goods, each
//! item carrying the provider-assigned series id for every region it is
//! tracked in. It is loaded once per run and never mutated; all lookup
//! structures are built from it by [`crate::index::CatalogIndex`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Geographic partition the catalog is tracked over.
///
/// The set is closed and known at build time; `ALL` fixes the order every
/// per-region operation iterates in. Serializes as a plain lowercase string
/// so it can key JSON and TOML maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    National,
    Northeast,
    Midwest,
    South,
    West,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::National,
        Region::Northeast,
        Region::Midwest,
        Region::South,
        Region::West,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::National => "national",
            Region::Northeast => "northeast",
            Region::Midwest => "midwest",
            Region::South => "south",
            Region::West => "west",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown region '{0}'")]
pub struct ParseRegionError(String);

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| ParseRegionError(s.to_string()))
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One tracked good: a stable key, display identity, and the provider
/// series id per region. An item with no series id for a region is simply
/// not requested for that region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub data_key: String,
    pub name: String,
    pub unit: String,
    pub series: BTreeMap<Region, String>,
}

/// A grouping of catalog items. Every item belongs to exactly one category
/// by construction (items are nested under their category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub items: Vec<CatalogItem>,
}

/// The complete goods catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize catalog: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(
        "duplicate series id '{series_id}' for region {region}: \
         claimed by both '{first}' and '{second}'"
    )]
    DuplicateSeriesId {
        region: Region,
        series_id: String,
        first: String,
        second: String,
    },

    #[error("duplicate data key '{0}' in catalog")]
    DuplicateDataKey(String),
}

impl Catalog {
    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a catalog from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the catalog to TOML.
    pub fn to_toml(&self) -> Result<String, CatalogError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Iterate all items across all categories, in catalog order.
    pub fn items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }

    /// Total number of tracked items.
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    /// Look up a category by id.
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Look up an item by data key.
    pub fn item(&self, data_key: &str) -> Option<&CatalogItem> {
        self.items().find(|i| i.data_key == data_key)
    }

    /// A small built-in grocery catalog tracking BLS average-price series.
    pub fn sample() -> Self {
        fn item(data_key: &str, name: &str, unit: &str, suffix: &str) -> CatalogItem {
            // BLS average-price series ids embed the area code after the
            // "APU" prefix: 0000 national, 0100 northeast, 0200 midwest,
            // 0300 south, 0400 west.
            let series = [
                (Region::National, "0000"),
                (Region::Northeast, "0100"),
                (Region::Midwest, "0200"),
                (Region::South, "0300"),
                (Region::West, "0400"),
            ]
            .into_iter()
            .map(|(region, area)| (region, format!("APU{area}{suffix}")))
            .collect();

            CatalogItem {
                data_key: data_key.into(),
                name: name.into(),
                unit: unit.into(),
                series,
            }
        }

        Catalog {
            categories: vec![
                Category {
                    id: "groceries".into(),
                    name: "Groceries".into(),
                    items: vec![
                        item("eggs", "Eggs, grade A, large", "dozen", "708111"),
                        item("milk", "Milk, fresh, whole", "gallon", "709112"),
                        item("bread", "Bread, white, pan", "lb.", "702111"),
                    ],
                },
                Category {
                    id: "energy".into(),
                    name: "Energy".into(),
                    items: vec![item(
                        "gas",
                        "Gasoline, unleaded regular",
                        "gallon",
                        "74714",
                    )],
                },
            ],
        }
    }
}
