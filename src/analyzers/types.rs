//! Result payloads produced by the aggregation engine.

use serde::Serialize;
use std::fmt;

/// Maximum number of entries in a ranking.
pub const TOP_N: usize = 5;

/// Outcome of one aggregation.
///
/// `Error` is a reported condition (usually a missing column) and is never
/// interchangeable with an empty or zero result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationResult {
    Count { value: u64 },
    /// `(location id, rides)`, most rides first.
    Ranking { entries: Vec<(i64, u64)> },
    Scalar { value: f64, unit: String },
    /// `(hour of day, rides)`, busiest hour first.
    GroupedRanking { entries: Vec<(u32, u64)> },
    Error { reason: String },
}

impl AggregationResult {
    pub fn count(value: u64) -> Self {
        AggregationResult::Count { value }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        AggregationResult::Error {
            reason: reason.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AggregationResult::Error { .. })
    }
}

impl fmt::Display for AggregationResult {
    /// One-line summary, used for the conversation transcript and query log.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationResult::Count { value } => write!(f, "{value} rides"),
            AggregationResult::Ranking { entries } if entries.is_empty() => {
                f.write_str("no pickup locations")
            }
            AggregationResult::Ranking { entries } => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(id, n)| format!("location {id}: {n}"))
                    .collect();
                f.write_str(&parts.join(", "))
            }
            AggregationResult::Scalar { value, unit } => write!(f, "{unit}{value:.2}"),
            AggregationResult::GroupedRanking { entries } if entries.is_empty() => {
                f.write_str("no pickup times")
            }
            AggregationResult::GroupedRanking { entries } => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(hour, n)| format!("{hour:02}:00: {n}"))
                    .collect();
                f.write_str(&parts.join(", "))
            }
            AggregationResult::Error { reason } => write!(f, "error: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_error_are_distinct() {
        assert_ne!(AggregationResult::count(0), AggregationResult::error("x"));
        assert!(AggregationResult::error("x").is_error());
        assert!(!AggregationResult::count(0).is_error());
    }

    #[test]
    fn test_summary() {
        let scalar = AggregationResult::Scalar {
            value: 12.5,
            unit: "$".into(),
        };
        assert_eq!(scalar.to_string(), "$12.50");
        let hours = AggregationResult::GroupedRanking {
            entries: vec![(8, 3), (17, 2)],
        };
        assert_eq!(hours.to_string(), "08:00: 3, 17:00: 2");
    }

    #[test]
    fn test_json_is_tagged() {
        let json = serde_json::to_value(AggregationResult::count(6)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "count", "value": 6}));
    }
}
