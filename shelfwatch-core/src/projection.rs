//! Projection composition — merging per-region results into the persisted views.
//!
//! Every projection of one run shares a single [`Metadata`] value. A region
//! that failed to fetch is simply absent from the input map and is omitted
//! from every view; composition never fails.

use crate::aggregate::{RegionAggregate, RegionResult};
use crate::catalog::{Catalog, Region};
use crate::series::{MonthKey, PricePoint, Trend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Earliest and latest month observed across the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub start: Option<MonthKey>,
    pub end: Option<MonthKey>,
}

/// Run metadata shared verbatim by every projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub last_updated: DateTime<Utc>,
    pub data_range: DataRange,
}

/// The national result as a single detailed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalProjection {
    pub metadata: Metadata,
    #[serde(flatten)]
    pub result: RegionResult,
}

/// Every fetched region's full result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalProjection {
    pub metadata: Metadata,
    pub regions: BTreeMap<Region, RegionResult>,
}

/// Lightweight view: just the latest value per item, per region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPricesProjection {
    pub metadata: Metadata,
    pub regions: BTreeMap<Region, BTreeMap<String, f64>>,
}

/// One category's current values and trends in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRegionView {
    pub current: BTreeMap<String, f64>,
    pub trends: BTreeMap<String, Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryView {
    pub name: String,
    pub regions: BTreeMap<Region, CategoryRegionView>,
}

/// Category-first view across regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesProjection {
    pub metadata: Metadata,
    pub categories: BTreeMap<String, CategoryView>,
}

/// One item's normalized series in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProjection {
    pub metadata: Metadata,
    pub region: Region,
    pub data_key: String,
    pub name: String,
    pub unit: String,
    pub series_id: String,
    pub points: Vec<PricePoint>,
}

/// Everything one run persists.
#[derive(Debug, Clone)]
pub struct ProjectionSet {
    pub catalog: Catalog,
    pub national: Option<NationalProjection>,
    pub regional: RegionalProjection,
    pub current_prices: CurrentPricesProjection,
    pub categories: CategoriesProjection,
    pub items: Vec<ItemProjection>,
}

impl ProjectionSet {
    /// Compose the projection set from whichever regions completed.
    pub fn compose(
        catalog: &Catalog,
        regions: BTreeMap<Region, RegionAggregate>,
        last_updated: DateTime<Utc>,
        per_item: bool,
    ) -> Self {
        let metadata = Metadata {
            last_updated,
            data_range: data_range(regions.values()),
        };

        let current_prices = CurrentPricesProjection {
            metadata,
            regions: regions
                .iter()
                .map(|(&region, agg)| (region, agg.result.current.clone()))
                .collect(),
        };

        let categories = compose_categories(catalog, &regions, metadata);

        let items = if per_item {
            compose_items(catalog, &regions, metadata)
        } else {
            Vec::new()
        };

        let results: BTreeMap<Region, RegionResult> = regions
            .into_iter()
            .map(|(region, agg)| (region, agg.result))
            .collect();

        let national = results
            .get(&Region::National)
            .cloned()
            .map(|result| NationalProjection { metadata, result });

        // `regional` keeps the national entry too; the detailed national
        // object is a convenience view of the same data.
        let regional = RegionalProjection {
            metadata,
            regions: results,
        };

        Self {
            catalog: catalog.clone(),
            national,
            regional,
            current_prices,
            categories,
            items,
        }
    }
}

fn data_range<'a>(aggregates: impl Iterator<Item = &'a RegionAggregate>) -> DataRange {
    let mut range: Option<(MonthKey, MonthKey)> = None;
    for agg in aggregates {
        if let Some((min, max)) = agg.months {
            range = Some(match range {
                None => (min, max),
                Some((lo, hi)) => (lo.min(min), hi.max(max)),
            });
        }
    }
    DataRange {
        start: range.map(|(lo, _)| lo),
        end: range.map(|(_, hi)| hi),
    }
}

fn compose_categories(
    catalog: &Catalog,
    regions: &BTreeMap<Region, RegionAggregate>,
    metadata: Metadata,
) -> CategoriesProjection {
    let categories = catalog
        .categories
        .iter()
        .map(|category| {
            let member_keys: Vec<&str> = category
                .items
                .iter()
                .map(|i| i.data_key.as_str())
                .collect();

            let region_views = regions
                .iter()
                .map(|(&region, agg)| {
                    let current = agg
                        .result
                        .categories
                        .get(&category.id)
                        .map(|rollup| rollup.items.clone())
                        .unwrap_or_default();
                    let trends = agg
                        .result
                        .trends
                        .iter()
                        .filter(|(key, _)| member_keys.contains(&key.as_str()))
                        .map(|(key, &trend)| (key.clone(), trend))
                        .collect();
                    (region, CategoryRegionView { current, trends })
                })
                .collect();

            (
                category.id.clone(),
                CategoryView {
                    name: category.name.clone(),
                    regions: region_views,
                },
            )
        })
        .collect();

    CategoriesProjection {
        metadata,
        categories,
    }
}

fn compose_items(
    catalog: &Catalog,
    regions: &BTreeMap<Region, RegionAggregate>,
    metadata: Metadata,
) -> Vec<ItemProjection> {
    let mut items = Vec::new();
    for (&region, agg) in regions {
        for (data_key, points) in &agg.item_series {
            // item_series keys come from the catalog index; a miss here
            // means the maps went out of sync, so skip rather than panic.
            let Some(item) = catalog.item(data_key) else {
                continue;
            };
            let Some(series_id) = item.series.get(&region) else {
                continue;
            };
            items.push(ItemProjection {
                metadata,
                region,
                data_key: data_key.clone(),
                name: item.name.clone(),
                unit: item.unit.clone(),
                series_id: series_id.clone(),
                points: points.clone(),
            });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_region;
    use crate::index::CatalogIndex;
    use crate::series::{RawPoint, RawSeries};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 6, 0, 0).unwrap()
    }

    fn aggregate(
        catalog: &Catalog,
        region: Region,
        series_id: &str,
        points: &[(&str, &str, &str)],
    ) -> RegionAggregate {
        let index = CatalogIndex::build(catalog).unwrap();
        let series = RawSeries {
            series_id: series_id.into(),
            data: points
                .iter()
                .map(|(year, period, value)| RawPoint {
                    year: year.to_string(),
                    period: period.to_string(),
                    value: value.to_string(),
                    calculations: None,
                })
                .collect(),
        };
        aggregate_region(region, &[series], &index)
    }

    #[test]
    fn all_projections_share_one_metadata() {
        let catalog = Catalog::sample();
        let regions = BTreeMap::from([
            (
                Region::National,
                aggregate(&catalog, Region::National, "APU0000708111", &[("2024", "M03", "3.45")]),
            ),
            (
                Region::West,
                aggregate(&catalog, Region::West, "APU0400708111", &[("2023", "M11", "3.20")]),
            ),
        ]);

        let set = ProjectionSet::compose(&catalog, regions, fixed_now(), true);

        let meta = set.regional.metadata;
        assert_eq!(set.national.as_ref().unwrap().metadata, meta);
        assert_eq!(set.current_prices.metadata, meta);
        assert_eq!(set.categories.metadata, meta);
        for item in &set.items {
            assert_eq!(item.metadata, meta);
        }

        // Range spans both regions' observations.
        assert_eq!(meta.data_range.start.unwrap().to_string(), "2023-11");
        assert_eq!(meta.data_range.end.unwrap().to_string(), "2024-03");
    }

    #[test]
    fn failed_region_is_omitted_everywhere() {
        let catalog = Catalog::sample();
        // "south" never made it into the map: its fetch failed upstream.
        let regions = BTreeMap::from([
            (
                Region::National,
                aggregate(&catalog, Region::National, "APU0000708111", &[("2024", "M03", "3.45")]),
            ),
            (
                Region::West,
                aggregate(&catalog, Region::West, "APU0400708111", &[("2024", "M03", "3.60")]),
            ),
        ]);

        let set = ProjectionSet::compose(&catalog, regions, fixed_now(), false);

        let fetched: Vec<Region> = set.regional.regions.keys().copied().collect();
        assert_eq!(fetched, [Region::National, Region::West]);
        assert!(!set.current_prices.regions.contains_key(&Region::South));
        for view in set.categories.categories.values() {
            assert!(!view.regions.contains_key(&Region::South));
        }
    }

    #[test]
    fn national_projection_is_omitted_when_national_failed() {
        let catalog = Catalog::sample();
        let regions = BTreeMap::from([(
            Region::West,
            aggregate(&catalog, Region::West, "APU0400708111", &[("2024", "M03", "3.60")]),
        )]);

        let set = ProjectionSet::compose(&catalog, regions, fixed_now(), false);
        assert!(set.national.is_none());
        assert!(set.regional.regions.contains_key(&Region::West));
    }

    #[test]
    fn per_item_projections_carry_item_identity() {
        let catalog = Catalog::sample();
        let regions = BTreeMap::from([(
            Region::South,
            aggregate(&catalog, Region::South, "APU0300709112", &[("2024", "M03", "3.89")]),
        )]);

        let set = ProjectionSet::compose(&catalog, regions, fixed_now(), true);
        assert_eq!(set.items.len(), 1);
        let item = &set.items[0];
        assert_eq!(item.region, Region::South);
        assert_eq!(item.data_key, "milk");
        assert_eq!(item.unit, "gallon");
        assert_eq!(item.series_id, "APU0300709112");
        assert_eq!(item.points[0].value, 3.89);

        // And none at all when disabled.
        let regions = BTreeMap::from([(
            Region::South,
            aggregate(&catalog, Region::South, "APU0300709112", &[("2024", "M03", "3.89")]),
        )]);
        let set = ProjectionSet::compose(&catalog, regions, fixed_now(), false);
        assert!(set.items.is_empty());
    }

    #[test]
    fn projections_round_trip_through_json() {
        let catalog = Catalog::sample();
        let regions = BTreeMap::from([(
            Region::National,
            aggregate(&catalog, Region::National, "APU0000708111", &[("2024", "M03", "3.45"), ("2024", "M02", "3.31")]),
        )]);

        let set = ProjectionSet::compose(&catalog, regions, fixed_now(), false);

        let national = set.national.unwrap();
        let json = serde_json::to_string(&national).unwrap();
        let back: NationalProjection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, national);

        let json = serde_json::to_string(&set.regional).unwrap();
        let back: RegionalProjection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set.regional);

        let json = serde_json::to_string(&set.categories).unwrap();
        let back: CategoriesProjection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set.categories);
    }

    #[test]
    fn empty_run_still_composes() {
        let catalog = Catalog::sample();
        let set = ProjectionSet::compose(&catalog, BTreeMap::new(), fixed_now(), true);
        assert!(set.national.is_none());
        assert!(set.regional.regions.is_empty());
        assert!(set.items.is_empty());
        assert_eq!(set.regional.metadata.data_range.start, None);
    }
}
