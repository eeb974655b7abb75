//! Series normalization — raw provider points to ordered observations.
//!
//! The provider returns points as stringly-typed (year, period, value)
//! triples in no guaranteed order. Normalization derives a typed month key
//! for every point, parses values, and sorts most-recent-first so the head
//! of the result is the current observation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// One raw series as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    #[serde(rename = "seriesID")]
    pub series_id: String,
    #[serde(default)]
    pub data: Vec<RawPoint>,
}

/// One raw observation as returned by the provider. Everything is a string
/// on the wire; nothing is trusted until normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub year: String,
    pub period: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculations: Option<RawCalculations>,
}

/// Provider-computed change figures, keyed by span in months ("1", "3",
/// "6", "12"). Only the one-month span feeds the trend view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCalculations {
    #[serde(default)]
    pub net_changes: BTreeMap<String, String>,
    #[serde(default)]
    pub pct_changes: BTreeMap<String, String>,
}

/// Canonical month identifier, ordered chronologically.
///
/// Renders as zero-padded `YYYY-MM`, so lexicographic order of the rendered
/// form agrees with `Ord` — consumers may sort either representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (0..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Derive a key from the provider's (year, period) pair. Periods are
    /// month codes `"M01"`..`"M12"`; anything else (annual averages are
    /// never requested) has no month key.
    pub fn from_wire(year: &str, period: &str) -> Option<Self> {
        let year = year.parse::<i32>().ok()?;
        let month = period.strip_prefix('M')?.parse::<u32>().ok()?;
        Self::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Error)]
#[error("malformed month key '{0}'")]
pub struct ParseMonthKeyError(String);

impl FromStr for MonthKey {
    type Err = ParseMonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| ParseMonthKeyError(s.into()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| ParseMonthKeyError(s.into()))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| ParseMonthKeyError(s.into()))?;
        Self::new(year, month).ok_or_else(|| ParseMonthKeyError(s.into()))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Net and percentage change versus the prior period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub net_change: f64,
    pub percent_change: f64,
}

/// A normalized observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub month: MonthKey,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("malformed period '{period}' (year '{year}')")]
    MalformedPeriod { year: String, period: String },
}

/// Normalize one series' raw points: derive month keys, parse values, sort
/// most-recent-first.
///
/// A period that does not parse fails the whole series — without a month
/// key the point cannot be ordered, which is a provider contract violation.
/// A value that does not parse drops only that point, with a warning.
pub fn normalize_series(points: &[RawPoint]) -> Result<Vec<PricePoint>, SeriesError> {
    let mut normalized = Vec::with_capacity(points.len());

    for point in points {
        let month = MonthKey::from_wire(&point.year, &point.period).ok_or_else(|| {
            SeriesError::MalformedPeriod {
                year: point.year.clone(),
                period: point.period.clone(),
            }
        })?;

        let value = match parse_value(&point.value) {
            Some(v) => v,
            None => {
                warn!(month = %month, value = %point.value, "dropping point with malformed value");
                continue;
            }
        };

        normalized.push(PricePoint {
            month,
            value,
            trend: point.calculations.as_ref().and_then(|c| parse_trend(c, month)),
        });
    }

    // Stable sort: equal months keep wire order.
    normalized.sort_by(|a, b| b.month.cmp(&a.month));
    Ok(normalized)
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// The one-month span of the provider's change figures. An unparseable
/// span drops only the trend, never the point.
fn parse_trend(calculations: &RawCalculations, month: MonthKey) -> Option<Trend> {
    let net = calculations.net_changes.get("1").and_then(|v| parse_value(v));
    let pct = calculations.pct_changes.get("1").and_then(|v| parse_value(v));
    match (net, pct) {
        (Some(net_change), Some(percent_change)) => Some(Trend {
            net_change,
            percent_change,
        }),
        _ => {
            debug!(month = %month, "calculations present but one-month span did not parse");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(year: &str, period: &str, value: &str) -> RawPoint {
        RawPoint {
            year: year.into(),
            period: period.into(),
            value: value.into(),
            calculations: None,
        }
    }

    #[test]
    fn normalization_orders_most_recent_first() {
        let points = [
            raw("2024", "M01", "10"),
            raw("2024", "M03", "12"),
            raw("2023", "M12", "9"),
        ];

        let normalized = normalize_series(&points).unwrap();
        assert_eq!(normalized[0].value, 12.0);
        assert_eq!(normalized[0].month.to_string(), "2024-03");

        let months: Vec<String> = normalized.iter().rev().map(|p| p.month.to_string()).collect();
        assert_eq!(months, ["2023-12", "2024-01", "2024-03"]);
    }

    #[test]
    fn malformed_period_fails_the_series() {
        let points = [raw("2024", "M01", "10"), raw("2024", "Q1", "11")];
        assert!(matches!(
            normalize_series(&points),
            Err(SeriesError::MalformedPeriod { period, .. }) if period == "Q1"
        ));
    }

    #[test]
    fn annual_average_period_is_malformed() {
        // M13 is the annual-average pseudo-period; the request disables it,
        // so its presence is a contract violation.
        let points = [raw("2024", "M13", "10")];
        assert!(normalize_series(&points).is_err());
    }

    #[test]
    fn malformed_value_drops_only_that_point() {
        let points = [
            raw("2024", "M01", "10"),
            raw("2024", "M02", "-"),
            raw("2024", "M03", "not a number"),
        ];

        let normalized = normalize_series(&points).unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].value, 10.0);
    }

    #[test]
    fn trend_comes_from_one_month_span() {
        let mut point = raw("2024", "M03", "12");
        point.calculations = Some(RawCalculations {
            net_changes: BTreeMap::from([
                ("1".to_string(), "0.5".to_string()),
                ("12".to_string(), "2.0".to_string()),
            ]),
            pct_changes: BTreeMap::from([("1".to_string(), "4.3".to_string())]),
        });

        let normalized = normalize_series(&[point]).unwrap();
        let trend = normalized[0].trend.unwrap();
        assert_eq!(trend.net_change, 0.5);
        assert_eq!(trend.percent_change, 4.3);
    }

    #[test]
    fn unparseable_trend_is_dropped_point_survives() {
        let mut point = raw("2024", "M03", "12");
        point.calculations = Some(RawCalculations {
            net_changes: BTreeMap::from([("1".to_string(), "n/a".to_string())]),
            pct_changes: BTreeMap::from([("1".to_string(), "4.3".to_string())]),
        });

        let normalized = normalize_series(&[point]).unwrap();
        assert_eq!(normalized[0].value, 12.0);
        assert!(normalized[0].trend.is_none());
    }

    #[test]
    fn month_key_renders_zero_padded() {
        let key = MonthKey::from_wire("2023", "M01").unwrap();
        assert_eq!(key.to_string(), "2023-01");
        assert_eq!(key, "2023-01".parse().unwrap());
    }

    #[test]
    fn month_key_year_boundary_orders_correctly() {
        let dec = MonthKey::from_wire("2023", "M12").unwrap();
        let jan = MonthKey::from_wire("2024", "M01").unwrap();
        assert!(dec < jan);
        assert!(dec.to_string() < jan.to_string());
    }

    #[test]
    fn month_key_serde_is_a_string() {
        let key = MonthKey::new(2024, 3).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2024-03\"");
        let back: MonthKey = serde_json::from_str("\"2024-03\"").unwrap();
        assert_eq!(back, key);
    }

    proptest! {
        /// Lexicographic order of the rendered key agrees with `Ord`, and
        /// distinct (year, month) pairs never collide.
        #[test]
        fn rendered_order_matches_chronological_order(
            y1 in 1900..2100i32, m1 in 1..=12u32,
            y2 in 1900..2100i32, m2 in 1..=12u32,
        ) {
            let a = MonthKey::new(y1, m1).unwrap();
            let b = MonthKey::new(y2, m2).unwrap();
            prop_assert_eq!(a.cmp(&b), a.to_string().cmp(&b.to_string()));
            prop_assert_eq!(a == b, (y1, m1) == (y2, m2));
        }
    }
}
