//! Maps free-form question text to an [`Intent`].
//!
//! Matching is a case-insensitive substring search over [`RULES`], checked
//! top to bottom; the first rule with any matching keyword wins.

use serde::Serialize;
use std::fmt;

use crate::error::QueryError;
use crate::source::TaxiClass;

/// What a question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", content = "class", rename_all = "snake_case")]
pub enum Intent {
    TotalRides,
    TopPickupLocations,
    AverageFare,
    PeakHours,
    FilterByClass(TaxiClass),
    Unrecognized,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::TotalRides => f.write_str("total_rides"),
            Intent::TopPickupLocations => f.write_str("top_pickup_locations"),
            Intent::AverageFare => f.write_str("average_fare"),
            Intent::PeakHours => f.write_str("peak_hours"),
            Intent::FilterByClass(class) => write!(f, "filter_by_class:{class}"),
            Intent::Unrecognized => f.write_str("unrecognized"),
        }
    }
}

/// Keyword groups in priority order. `fhvhv` must stay above `fhv`.
pub static RULES: &[(&[&str], Intent)] = &[
    (&["how many taxi rides"], Intent::TotalRides),
    (
        &["most pickups", "top 5 pickup locations", "busiest locations"],
        Intent::TopPickupLocations,
    ),
    (&["average fare"], Intent::AverageFare),
    (&["peak hours"], Intent::PeakHours),
    (&["green taxi"], Intent::FilterByClass(TaxiClass::Green)),
    (&["yellow taxi"], Intent::FilterByClass(TaxiClass::Yellow)),
    (&["fhvhv"], Intent::FilterByClass(TaxiClass::Fhvhv)),
    (&["fhv"], Intent::FilterByClass(TaxiClass::Fhv)),
];

/// Classifies `text` against [`RULES`].
pub fn route(text: &str) -> Intent {
    let text = text.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(*k)))
        .map_or(Intent::Unrecognized, |(_, intent)| *intent)
}

/// Rejects blank input, then routes it.
pub fn classify(text: &str) -> Result<Intent, QueryError> {
    if text.trim().is_empty() {
        return Err(QueryError::EmptyQuery);
    }
    Ok(route(text))
}
