//! Persistence sink — writes the projection set to the store.
//!
//! Keys are fixed and versionless: they are a contract with downstream
//! readers. Writes are attempted independently — one failing key never
//! prevents the others — but any failure makes the overall run fail once
//! every key has been attempted. Nothing is rolled back: readers may see a
//! mix of old and new projections after a partial failure.

use crate::store::{ObjectStore, PutOptions};
use serde::Serialize;
use shelfwatch_core::projection::ProjectionSet;
use thiserror::Error;
use tracing::warn;

pub const CONTENT_TYPE_JSON: &str = "application/json";

// The catalog changes on deploys only; price snapshots change every run.
const CACHE_CATALOG: &str = "public, max-age=86400";
const CACHE_SNAPSHOT: &str = "public, max-age=3600";

pub const KEY_CATALOG: &str = "config.json";
pub const KEY_NATIONAL: &str = "national/latest.json";
pub const KEY_REGIONAL: &str = "regional/latest.json";
pub const KEY_CURRENT_PRICES: &str = "current_prices.json";
pub const KEY_CATEGORIES: &str = "categories/latest.json";

/// Store key of one item's per-region series object.
pub fn item_key(region: shelfwatch_core::Region, data_key: &str) -> String {
    format!("{region}/{data_key}.json")
}

/// One or more projection writes failed after all keys were attempted.
#[derive(Debug, Error)]
#[error(
    "{} of {attempted} projection writes failed (first: {})",
    .failures.len(),
    .failures
        .first()
        .map(|(key, reason)| format!("{key}: {reason}"))
        .unwrap_or_default()
)]
pub struct SinkError {
    pub attempted: usize,
    pub failures: Vec<(String, String)>,
}

/// Serialize and write every projection in the set.
///
/// Returns the keys written, in write order.
pub fn persist_projections(
    store: &dyn ObjectStore,
    set: &ProjectionSet,
) -> Result<Vec<String>, SinkError> {
    let mut written = Vec::new();
    let mut failures = Vec::new();
    let mut attempted = 0;

    let mut write = |key: String, cache_control: &str, body: Result<Vec<u8>, serde_json::Error>| {
        attempted += 1;
        let result = body.map_err(|e| e.to_string()).and_then(|bytes| {
            store
                .put(
                    &key,
                    &bytes,
                    &PutOptions {
                        content_type: CONTENT_TYPE_JSON,
                        cache_control,
                    },
                )
                .map_err(|e| e.to_string())
        });
        match result {
            Ok(()) => written.push(key),
            Err(reason) => {
                warn!(key = %key, %reason, "projection write failed");
                failures.push((key, reason));
            }
        }
    };

    fn body<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(value)
    }

    write(KEY_CATALOG.into(), CACHE_CATALOG, body(&set.catalog));
    if let Some(national) = &set.national {
        write(KEY_NATIONAL.into(), CACHE_SNAPSHOT, body(national));
    }
    write(KEY_REGIONAL.into(), CACHE_SNAPSHOT, body(&set.regional));
    write(
        KEY_CURRENT_PRICES.into(),
        CACHE_SNAPSHOT,
        body(&set.current_prices),
    );
    write(KEY_CATEGORIES.into(), CACHE_SNAPSHOT, body(&set.categories));
    for item in &set.items {
        write(
            item_key(item.region, &item.data_key),
            CACHE_SNAPSHOT,
            body(item),
        );
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(SinkError {
            attempted,
            failures,
        })
    }
}
