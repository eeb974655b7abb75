//! Shelfwatch pipeline — fetch orchestration, object-store sinks, and the
//! end-to-end aggregation run.
//!
//! The [`source::PriceSource`] trait seams the statistics API (the BLS
//! public timeseries endpoint in production, a scripted mock in tests), and
//! [`store::ObjectStore`] seams the blob store. Everything between —
//! sequential per-region fetching, aggregation, composition, persistence —
//! is driven by [`run::run_pipeline`].

pub mod bls;
pub mod config;
pub mod fetch;
pub mod run;
pub mod sink;
pub mod source;
pub mod store;

pub use bls::BlsSource;
pub use config::{FailurePolicy, PipelineConfig};
pub use fetch::{fetch_regions, FetchOutcome, FetchProgress, SilentProgress, StdoutProgress};
pub use run::{run_pipeline, PipelineError, RunReport};
pub use sink::persist_projections;
pub use source::{PriceSource, SourceError, YearWindow};
pub use store::{FsStore, MemoryStore, ObjectStore, PutOptions, StoreError};
