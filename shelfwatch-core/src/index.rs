//! Catalog index — precomputed lookup structures built once per run.
//!
//! Replaces repeated linear scans over the catalog with two read-only
//! indices: the ordered series-id request list per region, and the reverse
//! map from (region, series id) to the owning item and category.

use crate::catalog::{Catalog, CatalogError, CatalogItem, Category, Region};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The item and category that own a series id within one region.
#[derive(Debug, Clone, Copy)]
pub struct SeriesOwner<'a> {
    pub item: &'a CatalogItem,
    pub category: &'a Category,
}

/// Read-only lookup structures over an immutable catalog.
///
/// Construction is deterministic: the same catalog always yields the same
/// series-id ordering (catalog iteration order).
#[derive(Debug)]
pub struct CatalogIndex<'a> {
    catalog: &'a Catalog,
    requests: BTreeMap<Region, Vec<&'a str>>,
    owners: HashMap<(Region, &'a str), SeriesOwner<'a>>,
}

impl<'a> CatalogIndex<'a> {
    /// Build the index, validating catalog invariants.
    ///
    /// A duplicate series id within one region or a duplicate data key is a
    /// fatal configuration error: resolving either to an arbitrary item
    /// would silently misattribute data.
    pub fn build(catalog: &'a Catalog) -> Result<Self, CatalogError> {
        let mut requests: BTreeMap<Region, Vec<&'a str>> = BTreeMap::new();
        let mut owners: HashMap<(Region, &'a str), SeriesOwner<'a>> = HashMap::new();
        let mut data_keys: HashSet<&'a str> = HashSet::new();

        for category in &catalog.categories {
            for item in &category.items {
                if !data_keys.insert(&item.data_key) {
                    return Err(CatalogError::DuplicateDataKey(item.data_key.clone()));
                }

                for (&region, series_id) in &item.series {
                    let owner = SeriesOwner { item, category };
                    if let Some(existing) =
                        owners.insert((region, series_id.as_str()), owner)
                    {
                        return Err(CatalogError::DuplicateSeriesId {
                            region,
                            series_id: series_id.clone(),
                            first: existing.item.data_key.clone(),
                            second: item.data_key.clone(),
                        });
                    }
                    requests.entry(region).or_default().push(series_id.as_str());
                }
            }
        }

        Ok(Self {
            catalog,
            requests,
            owners,
        })
    }

    /// The catalog this index was built from.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Ordered series ids to request for a region. Empty when no item
    /// defines a series id for it.
    pub fn series_ids(&self, region: Region) -> &[&'a str] {
        self.requests.get(&region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a returned series id to its owning item and category.
    pub fn owner(&self, region: Region, series_id: &str) -> Option<SeriesOwner<'a>> {
        self.owners.get(&(region, series_id)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn one_item_catalog(series: &[(Region, &str)]) -> Catalog {
        Catalog {
            categories: vec![Category {
                id: "c1".into(),
                name: "C1".into(),
                items: vec![CatalogItem {
                    data_key: "k1".into(),
                    name: "Item 1".into(),
                    unit: "each".into(),
                    series: series
                        .iter()
                        .map(|(r, s)| (*r, s.to_string()))
                        .collect(),
                }],
            }],
        }
    }

    #[test]
    fn request_lists_follow_catalog_order() {
        let catalog = Catalog::sample();
        let index = CatalogIndex::build(&catalog).unwrap();

        let national = index.series_ids(Region::National);
        assert_eq!(
            national,
            &[
                "APU0000708111",
                "APU0000709112",
                "APU0000702111",
                "APU000074714"
            ]
        );
    }

    #[test]
    fn reverse_map_resolves_owner() {
        let catalog = Catalog::sample();
        let index = CatalogIndex::build(&catalog).unwrap();

        let owner = index.owner(Region::West, "APU0400709112").unwrap();
        assert_eq!(owner.item.data_key, "milk");
        assert_eq!(owner.category.id, "groceries");

        assert!(index.owner(Region::West, "APU0000000000").is_none());
    }

    #[test]
    fn item_without_region_series_is_excluded() {
        let catalog = one_item_catalog(&[(Region::National, "S1")]);
        let index = CatalogIndex::build(&catalog).unwrap();

        assert_eq!(index.series_ids(Region::National), &["S1"]);
        assert!(index.series_ids(Region::South).is_empty());
    }

    #[test]
    fn duplicate_series_id_within_region_is_fatal() {
        let mut catalog = one_item_catalog(&[(Region::National, "S1")]);
        catalog.categories[0].items.push(CatalogItem {
            data_key: "k2".into(),
            name: "Item 2".into(),
            unit: "each".into(),
            series: BTreeMap::from([(Region::National, "S1".to_string())]),
        });

        match CatalogIndex::build(&catalog) {
            Err(CatalogError::DuplicateSeriesId {
                region,
                series_id,
                first,
                second,
            }) => {
                assert_eq!(region, Region::National);
                assert_eq!(series_id, "S1");
                assert_eq!(first, "k1");
                assert_eq!(second, "k2");
            }
            other => panic!("expected DuplicateSeriesId, got {other:?}"),
        }
    }

    #[test]
    fn same_series_id_in_different_regions_is_fine() {
        let catalog = one_item_catalog(&[(Region::National, "S1"), (Region::South, "S1")]);
        assert!(CatalogIndex::build(&catalog).is_ok());
    }

    #[test]
    fn duplicate_data_key_is_fatal() {
        let mut catalog = one_item_catalog(&[(Region::National, "S1")]);
        catalog.categories.push(Category {
            id: "c2".into(),
            name: "C2".into(),
            items: vec![CatalogItem {
                data_key: "k1".into(),
                name: "Item 1 again".into(),
                unit: "each".into(),
                series: BTreeMap::from([(Region::National, "S2".to_string())]),
            }],
        });

        assert!(matches!(
            CatalogIndex::build(&catalog),
            Err(CatalogError::DuplicateDataKey(k)) if k == "k1"
        ));
    }
}
