//! Presentation of query responses: terminal text, JSON, and a CSV query log.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::AggregationResult;
use crate::pipeline::{Reply, Response};
use crate::router::Intent;

/// Width of the longest bar in rendered charts.
const BAR_WIDTH: u64 = 40;

/// One row of the query log.
#[derive(Debug, Serialize)]
pub struct QueryRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub intent: Option<String>,
    pub status: String,
    pub summary: String,
    pub warnings: usize,
}

impl QueryRecord {
    pub fn from_response(query: &str, response: &Response) -> Self {
        let intent = match &response.reply {
            Reply::Answer { intent, .. } => Some(intent.to_string()),
            _ => None,
        };
        QueryRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            intent,
            status: response.reply.status().to_string(),
            summary: response.reply.transcript(),
            warnings: response.warnings.len(),
        }
    }
}

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max);
    "#".repeat(len as usize)
}

fn render_rows(out: &mut String, header: (&str, &str), rows: &[(String, u64)]) {
    let max = rows.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let _ = writeln!(out, "{:<12} {:>10}", header.0, header.1);
    for (label, count) in rows {
        let _ = writeln!(out, "{label:<12} {count:>10}  {}", bar(*count, max));
    }
}

/// Renders an aggregation result as plain text with an ASCII bar chart for
/// rankings. Errors are marked so they never read like empty data.
pub fn render_result(intent: Intent, result: &AggregationResult) -> String {
    let mut out = String::new();
    match result {
        AggregationResult::Count { value } => match intent {
            Intent::FilterByClass(class) => {
                let _ = writeln!(out, "{class} rides: {value}");
            }
            _ => {
                let _ = writeln!(out, "Total rides: {value}");
            }
        },
        AggregationResult::Scalar { value, unit } => {
            let _ = writeln!(out, "Average fare: {unit}{value:.2}");
        }
        AggregationResult::Ranking { entries } if entries.is_empty() => {
            let _ = writeln!(out, "No pickup locations in the data.");
        }
        AggregationResult::Ranking { entries } => {
            let rows: Vec<_> = entries
                .iter()
                .map(|(id, n)| (id.to_string(), *n))
                .collect();
            render_rows(&mut out, ("PULocationID", "rides"), &rows);
        }
        AggregationResult::GroupedRanking { entries } if entries.is_empty() => {
            let _ = writeln!(out, "No pickup times in the data.");
        }
        AggregationResult::GroupedRanking { entries } => {
            let rows: Vec<_> = entries
                .iter()
                .map(|(hour, n)| (format!("{hour:02}:00"), *n))
                .collect();
            render_rows(&mut out, ("hour", "rides"), &rows);
        }
        AggregationResult::Error { reason } => {
            let _ = writeln!(out, "[warning] cannot answer: {reason}");
        }
    }
    out
}

/// Renders a full response, warnings first.
pub fn render(response: &Response) -> String {
    let mut out = String::new();
    for warning in &response.warnings {
        let _ = writeln!(out, "[warning] {warning}");
    }

    match &response.reply {
        Reply::Answer { intent, result } => out.push_str(&render_result(*intent, result)),
        Reply::NoData | Reply::EmptyQuery | Reply::Unrecognized => {
            let _ = writeln!(out, "[warning] {}", response.reply.transcript());
        }
        Reply::Chat { content } => {
            let _ = writeln!(out, "{content}");
        }
        Reply::ChatUnavailable { content } => {
            let _ = writeln!(out, "[warning] {content}");
        }
    }
    out
}

/// Logs a response as pretty-printed JSON.
pub fn print_json(response: &Response) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

/// Appends a [`QueryRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &QueryRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending query log record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TaxiClass;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn answer(result: AggregationResult) -> Response {
        Response {
            reply: Reply::Answer {
                intent: Intent::TotalRides,
                result,
            },
            warnings: vec![],
        }
    }

    #[test]
    fn test_zero_count_and_error_render_differently() {
        let zero = render(&answer(AggregationResult::count(0)));
        let error = render(&answer(AggregationResult::error("VendorID not found")));

        assert_eq!(zero, "Total rides: 0\n");
        assert!(error.starts_with("[warning]"));
        assert!(error.contains("VendorID not found"));
    }

    #[test]
    fn test_ranking_has_bars() {
        let text = render_result(
            Intent::TopPickupLocations,
            &AggregationResult::Ranking {
                entries: vec![(132, 10), (48, 5)],
            },
        );
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("132"));
        assert!(lines[1].ends_with(&"#".repeat(40)));
        assert!(lines[2].ends_with(&"#".repeat(20)));
    }

    #[test]
    fn test_empty_ranking_is_not_a_warning() {
        let text = render_result(
            Intent::TopPickupLocations,
            &AggregationResult::Ranking { entries: vec![] },
        );
        assert!(!text.contains("[warning]"));
    }

    #[test]
    fn test_hours_are_formatted() {
        let text = render_result(
            Intent::PeakHours,
            &AggregationResult::GroupedRanking {
                entries: vec![(7, 2)],
            },
        );
        assert!(text.contains("07:00"));
    }

    #[test]
    fn test_warnings_are_listed() {
        let response = Response {
            reply: Reply::NoData,
            warnings: vec!["source unavailable: /a.csv".into()],
        };
        let text = render(&response);
        assert!(text.starts_with("[warning] source unavailable: /a.csv\n"));
        assert!(text.contains("No trip data"));
    }

    #[test]
    fn test_class_count_is_labelled_by_class() {
        let response = Response {
            reply: Reply::Answer {
                intent: Intent::FilterByClass(TaxiClass::Yellow),
                result: AggregationResult::count(3),
            },
            warnings: vec![],
        };
        assert_eq!(render(&response), "yellow rides: 3\n");
    }

    #[test]
    fn test_json_payload_shape() {
        let response = answer(AggregationResult::count(3));
        print_json(&response).unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["reply"]["status"], "answer");
        assert_eq!(json["reply"]["intent"]["intent"], "total_rides");
        assert_eq!(json["reply"]["result"]["kind"], "count");
        assert_eq!(json["reply"]["result"]["value"], 3);
        assert_eq!(json["warnings"], serde_json::json!([]));
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("taxi_query_test_log.csv");
        let _ = fs::remove_file(&path);

        let response = answer(AggregationResult::count(6));
        let record = QueryRecord::from_response("how many taxi rides", &response);
        append_record(&path, &record).unwrap();
        append_record(&path, &record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,query,intent,status"));
        assert!(lines[1].contains("total_rides,ok,6 rides"));

        fs::remove_file(&path).unwrap();
    }
}
