//! Price-source trait and structured error types.
//!
//! The PriceSource trait abstracts over the statistics API so the
//! orchestrator can be driven by the real HTTP client or a scripted mock.

use shelfwatch_core::{RawSeries, Region};
use thiserror::Error;

/// Inclusive year range of a series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

/// Errors from one region's fetch. There is no retry layer: a failure is
/// surfaced to the orchestrator, which decides whether the run continues.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("missing API registration key: set {0}")]
    MissingCredentials(&'static str),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("provider rejected the request: {0}")]
    Rejected(String),

    #[error("response parse failed: {0}")]
    MalformedResponse(String),
}

/// A source of price-index series data.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch all requested series for one region over a year window.
    fn fetch(
        &self,
        region: Region,
        series_ids: &[&str],
        window: YearWindow,
    ) -> Result<Vec<RawSeries>, SourceError>;
}
