//! The end-to-end pipeline run.
//!
//! Build the catalog index once, fetch and aggregate each region
//! sequentially, compose the projection set under one metadata value, and
//! persist everything. A process-local guard serializes invocations: a
//! scheduled run and a manually triggered one must not interleave writes
//! against the same store keys. Cross-process locking is out of scope.

use crate::config::PipelineConfig;
use crate::fetch::{fetch_regions, FetchProgress, RegionFetchError};
use crate::sink::{persist_projections, SinkError};
use crate::source::PriceSource;
use crate::store::ObjectStore;
use chrono::{DateTime, Datelike, Utc};
use shelfwatch_core::projection::ProjectionSet;
use shelfwatch_core::{Catalog, CatalogError, CatalogIndex, Region};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    RegionFailed(#[from] RegionFetchError),

    #[error(transparent)]
    Persistence(#[from] SinkError),

    #[error("another pipeline run is already in progress")]
    AlreadyRunning,
}

/// What one successful run did.
#[derive(Debug)]
pub struct RunReport {
    pub last_updated: DateTime<Utc>,
    pub regions_fetched: Vec<Region>,
    pub regions_failed: Vec<(Region, String)>,
    pub objects_written: Vec<String>,
}

static RUN_ACTIVE: AtomicBool = AtomicBool::new(false);

struct RunGuard;

impl RunGuard {
    fn claim() -> Option<Self> {
        RUN_ACTIVE
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
            .then_some(RunGuard)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        RUN_ACTIVE.store(false, Ordering::Release);
    }
}

/// Execute one full aggregation run.
pub fn run_pipeline(
    source: &dyn PriceSource,
    store: &dyn ObjectStore,
    catalog: &Catalog,
    config: &PipelineConfig,
    progress: &dyn FetchProgress,
) -> Result<RunReport, PipelineError> {
    let _guard = RunGuard::claim().ok_or(PipelineError::AlreadyRunning)?;

    let index = CatalogIndex::build(catalog)?;

    let last_updated = Utc::now();
    let window = config.year_window(last_updated.year());
    info!(
        source = source.name(),
        store = store.name(),
        items = catalog.item_count(),
        start = window.start,
        end = window.end,
        "starting aggregation run"
    );

    let outcome = fetch_regions(source, &index, window, config.on_region_failure, progress)?;

    let regions_fetched: Vec<Region> = outcome.regions.keys().copied().collect();
    let regions_failed: Vec<(Region, String)> = outcome
        .failures
        .iter()
        .map(|(region, e)| (*region, e.to_string()))
        .collect();

    let set = ProjectionSet::compose(
        catalog,
        outcome.regions,
        last_updated,
        config.per_item_projections,
    );
    let objects_written = persist_projections(store, &set)?;

    info!(
        regions = regions_fetched.len(),
        failed = regions_failed.len(),
        objects = objects_written.len(),
        "aggregation run complete"
    );

    Ok(RunReport {
        last_updated,
        regions_fetched,
        regions_failed,
        objects_written,
    })
}
