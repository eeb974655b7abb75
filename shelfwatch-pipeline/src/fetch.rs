//! Fetch orchestration — the sequential per-region loop.
//!
//! Regions are processed strictly one after another, in [`Region::ALL`]
//! order, to bound load on the upstream provider and keep diagnostics
//! deterministic. Under the default skip policy a failing region is
//! recorded and the loop continues; the other regions are independent and
//! a partial dataset still has value.

use crate::config::FailurePolicy;
use crate::source::{PriceSource, SourceError, YearWindow};
use shelfwatch_core::{aggregate_region, CatalogIndex, Region, RegionAggregate};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Progress callback for the per-region fetch loop.
pub trait FetchProgress: Send {
    /// Called before a region's request is sent.
    fn on_region_start(&self, region: Region, index: usize, total: usize);

    /// Called when a region completes; `Ok` carries the returned series count.
    fn on_region_complete(
        &self,
        region: Region,
        index: usize,
        total: usize,
        result: &Result<usize, SourceError>,
    );

    /// Called when the whole loop is done.
    fn on_run_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_region_start(&self, region: Region, index: usize, total: usize) {
        println!("[{}/{}] Fetching {region}...", index + 1, total);
    }

    fn on_region_complete(
        &self,
        region: Region,
        _index: usize,
        _total: usize,
        result: &Result<usize, SourceError>,
    ) {
        match result {
            Ok(count) => println!("  OK: {region} ({count} series)"),
            Err(e) => println!("  FAIL: {region}: {e}"),
        }
    }

    fn on_run_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nFetch complete: {succeeded}/{total} regions succeeded, {failed} failed");
    }
}

/// No-op progress reporter.
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn on_region_start(&self, _: Region, _: usize, _: usize) {}
    fn on_region_complete(&self, _: Region, _: usize, _: usize, _: &Result<usize, SourceError>) {}
    fn on_run_complete(&self, _: usize, _: usize, _: usize) {}
}

/// Per-region results of one fetch loop.
pub struct FetchOutcome {
    pub regions: BTreeMap<Region, RegionAggregate>,
    pub failures: Vec<(Region, SourceError)>,
}

/// A region failure surfaced under [`FailurePolicy::Abort`].
#[derive(Debug, Error)]
#[error("region {region} fetch failed: {source}")]
pub struct RegionFetchError {
    pub region: Region,
    #[source]
    pub source: SourceError,
}

/// Fetch and aggregate every configured region, sequentially.
///
/// Regions whose request list is empty are skipped without a request.
pub fn fetch_regions(
    source: &dyn PriceSource,
    index: &CatalogIndex<'_>,
    window: YearWindow,
    policy: FailurePolicy,
    progress: &dyn FetchProgress,
) -> Result<FetchOutcome, RegionFetchError> {
    let requested: Vec<Region> = Region::ALL
        .into_iter()
        .filter(|&region| !index.series_ids(region).is_empty())
        .collect();
    let total = requested.len();

    let mut regions = BTreeMap::new();
    let mut failures: Vec<(Region, SourceError)> = Vec::new();

    for (i, region) in requested.into_iter().enumerate() {
        let series_ids = index.series_ids(region);
        progress.on_region_start(region, i, total);

        let result = source.fetch(region, series_ids, window);
        let summary = result.as_ref().map(Vec::len).map_err(SourceError::clone);
        progress.on_region_complete(region, i, total, &summary);

        match result {
            Ok(series) => {
                debug!(%region, series = series.len(), "aggregating region");
                regions.insert(region, aggregate_region(region, &series, index));
            }
            Err(e) => {
                warn!(%region, %e, "region fetch failed");
                if policy == FailurePolicy::Abort {
                    return Err(RegionFetchError { region, source: e });
                }
                failures.push((region, e));
            }
        }
    }

    let failed = failures.len();
    progress.on_run_complete(regions.len(), failed, total);

    Ok(FetchOutcome { regions, failures })
}
