//! Region aggregation — one region's raw API response to a [`RegionResult`].
//!
//! Each returned series is resolved against the catalog index, normalized,
//! and folded into four views: the current value per item (head of the
//! descending sort), the per-item trend, the month-keyed historical matrix
//! (materialized ascending), and the category rollup. Per-series problems
//! are absorbed with a diagnostic; they never abort the region.

use crate::catalog::Region;
use crate::index::CatalogIndex;
use crate::series::{normalize_series, MonthKey, PricePoint, RawSeries, Trend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One row of the historical matrix: every item's value observed in one
/// month. Values flatten into the row object, keyed by data key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRow {
    pub month: MonthKey,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Current values of one category's items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRollup {
    pub name: String,
    pub items: BTreeMap<String, f64>,
}

/// The derived views for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionResult {
    /// Latest observed value per item.
    pub current: BTreeMap<String, f64>,
    /// One-month change per item, where the provider supplied calculations.
    pub trends: BTreeMap<String, Trend>,
    /// One row per month present in any series, ascending by month.
    pub historical: Vec<HistoricalRow>,
    /// Current values grouped by category. Every configured category has an
    /// entry, even when no series data matched.
    pub categories: BTreeMap<String, CategoryRollup>,
}

/// A region's result plus the working data later stages still need: the
/// normalized per-item point vectors (for per-item projections) and the
/// observed month range (for run metadata).
#[derive(Debug, Clone)]
pub struct RegionAggregate {
    pub result: RegionResult,
    pub item_series: BTreeMap<String, Vec<PricePoint>>,
    pub months: Option<(MonthKey, MonthKey)>,
    pub unmatched: Vec<String>,
}

/// Fold one region's returned series into a [`RegionAggregate`].
pub fn aggregate_region(
    region: Region,
    series: &[RawSeries],
    index: &CatalogIndex<'_>,
) -> RegionAggregate {
    let mut current = BTreeMap::new();
    let mut trends = BTreeMap::new();
    let mut monthly: BTreeMap<MonthKey, BTreeMap<String, f64>> = BTreeMap::new();
    let mut item_series = BTreeMap::new();
    let mut months: Option<(MonthKey, MonthKey)> = None;
    let mut unmatched = Vec::new();

    // Shell entries for every configured category, present even when no
    // series data matched.
    let mut categories: BTreeMap<String, CategoryRollup> = index
        .catalog()
        .categories
        .iter()
        .map(|c| {
            (
                c.id.clone(),
                CategoryRollup {
                    name: c.name.clone(),
                    items: BTreeMap::new(),
                },
            )
        })
        .collect();

    for raw in series {
        let Some(owner) = index.owner(region, &raw.series_id) else {
            // The API may return series outside the current catalog, e.g.
            // after catalog edits.
            warn!(%region, series_id = %raw.series_id, "skipping series with no catalog owner");
            unmatched.push(raw.series_id.clone());
            continue;
        };

        let points = match normalize_series(&raw.data) {
            Ok(points) => points,
            Err(err) => {
                warn!(%region, series_id = %raw.series_id, %err, "skipping series that failed normalization");
                continue;
            }
        };

        let data_key = &owner.item.data_key;

        if let Some(head) = points.first() {
            current.insert(data_key.clone(), head.value);
            if let Some(trend) = head.trend {
                trends.insert(data_key.clone(), trend);
            }
            if let Some(rollup) = categories.get_mut(&owner.category.id) {
                rollup.items.insert(data_key.clone(), head.value);
            }
        }

        for point in &points {
            monthly
                .entry(point.month)
                .or_default()
                .insert(data_key.clone(), point.value);
            months = Some(match months {
                None => (point.month, point.month),
                Some((min, max)) => (min.min(point.month), max.max(point.month)),
            });
        }

        item_series.insert(data_key.clone(), points);
    }

    // BTreeMap iteration gives the ascending order the historical matrix
    // wants, the reverse of the per-series ordering "current" was read from.
    let historical = monthly
        .into_iter()
        .map(|(month, values)| HistoricalRow { month, values })
        .collect();

    RegionAggregate {
        result: RegionResult {
            current,
            trends,
            historical,
            categories,
        },
        item_series,
        months,
        unmatched,
    }
}
