//! BLS public timeseries API client.
//!
//! One JSON POST per region against the v2 timeseries endpoint. Success is
//! a two-level contract: the HTTP status must be 2xx AND the body's
//! `status` field must be `REQUEST_SUCCEEDED` — a 200 carrying any other
//! status is a logical failure.

use crate::config::PipelineConfig;
use crate::source::{PriceSource, SourceError, YearWindow};
use serde::{Deserialize, Serialize};
use shelfwatch_core::{RawSeries, Region};
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";
const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";

/// Environment variable holding the BLS API registration key.
pub const API_KEY_ENV: &str = "SHELFWATCH_BLS_KEY";

#[derive(Debug, Serialize)]
struct SeriesRequest<'a> {
    seriesid: &'a [&'a str],
    startyear: String,
    endyear: String,
    #[serde(rename = "registrationKey")]
    registration_key: &'a str,
    calculations: bool,
    annualaverage: bool,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "Results", default)]
    results: Option<ResultsEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    series: Vec<RawSeries>,
}

/// Client for the BLS public timeseries API.
pub struct BlsSource {
    client: reqwest::blocking::Client,
    registration_key: String,
    calculations: bool,
    annual_average: bool,
}

impl BlsSource {
    pub fn new(
        registration_key: impl Into<String>,
        calculations: bool,
        annual_average: bool,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            registration_key: registration_key.into(),
            calculations,
            annual_average,
        }
    }

    /// Build a client with the registration key from the environment
    /// (`.env` supported) and request flags from the config.
    pub fn from_env(config: &PipelineConfig) -> Result<Self, SourceError> {
        dotenvy::dotenv().ok();
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| SourceError::MissingCredentials(API_KEY_ENV))?;
        Ok(Self::new(key, config.calculations, config.annual_average))
    }
}

impl PriceSource for BlsSource {
    fn name(&self) -> &str {
        "bls_timeseries_v2"
    }

    fn fetch(
        &self,
        region: Region,
        series_ids: &[&str],
        window: YearWindow,
    ) -> Result<Vec<RawSeries>, SourceError> {
        let request = SeriesRequest {
            seriesid: series_ids,
            startyear: window.start.to_string(),
            endyear: window.end.to_string(),
            registration_key: &self.registration_key,
            calculations: self.calculations,
            annualaverage: self.annual_average,
        };

        debug!(
            %region,
            series = series_ids.len(),
            start = window.start,
            end = window.end,
            "requesting series batch"
        );

        let response = self
            .client
            .post(BASE_URL)
            .json(&request)
            .send()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status.as_u16()));
        }

        let body: SeriesResponse = response
            .json()
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))?;

        if body.status != REQUEST_SUCCEEDED {
            let message = body.message.unwrap_or(body.status);
            return Err(SourceError::Rejected(message));
        }

        let results = body.results.ok_or_else(|| {
            SourceError::MalformedResponse("succeeded response carries no Results".into())
        })?;

        Ok(results.series)
    }
}
