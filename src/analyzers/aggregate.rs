use std::collections::HashMap;

use chrono::Timelike;

use crate::analyzers::types::{AggregationResult, TOP_N};
use crate::analyzers::utility::{mean, round_to, top_n};
use crate::source::TaxiClass;
use crate::table::TripTable;

pub const PICKUP_LOCATION: &str = "PULocationID";
pub const FARE_AMOUNT: &str = "fare_amount";
pub const VENDOR_ID: &str = "VendorID";

/// Every pickup timestamp spelling across taxi classes.
pub static PICKUP_TIMESTAMP_COLUMNS: &[&str] = &[
    "tpep_pickup_datetime",
    "lpep_pickup_datetime",
    "pickup_datetime",
];

/// How a taxi class is told apart in the unified table.
///
/// Yellow and green rows are identified by `VendorID` (1 and 2), a rule
/// carried over from the source data rather than the TLC data dictionary.
/// FHV records have no usable `VendorID`, so those classes fall back to
/// the file each row was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDiscriminant {
    VendorId(i64),
    Provenance(TaxiClass),
}

impl ClassDiscriminant {
    pub fn for_class(class: TaxiClass) -> Self {
        match class {
            TaxiClass::Yellow => ClassDiscriminant::VendorId(1),
            TaxiClass::Green => ClassDiscriminant::VendorId(2),
            TaxiClass::Fhv | TaxiClass::Fhvhv => ClassDiscriminant::Provenance(class),
        }
    }
}

/// Number of rows in the table.
pub fn total_rides(table: &TripTable) -> AggregationResult {
    AggregationResult::count(table.len() as u64)
}

/// The five pickup zones with the most rides. Ties go to the lower zone id.
pub fn top_pickup_locations(table: &TripTable) -> AggregationResult {
    let Some(column) = table.column(PICKUP_LOCATION) else {
        return AggregationResult::error(format!("{PICKUP_LOCATION} not found"));
    };

    let mut counts: HashMap<i64, u64> = HashMap::new();
    for id in column.iter().filter_map(|v| v.as_i64()) {
        *counts.entry(id).or_default() += 1;
    }

    AggregationResult::Ranking {
        entries: top_n(counts, TOP_N),
    }
}

/// Mean fare over non-null values, rounded to cents.
pub fn average_fare(table: &TripTable) -> AggregationResult {
    let Some(column) = table.column(FARE_AMOUNT) else {
        return AggregationResult::error(format!("{FARE_AMOUNT} not found"));
    };

    let fares: Vec<f64> = column.iter().filter_map(|v| v.as_f64()).collect();
    match mean(&fares) {
        Some(avg) => AggregationResult::Scalar {
            value: round_to(avg, 2),
            unit: "$".to_string(),
        },
        None => AggregationResult::error("no fare data"),
    }
}

/// The five busiest pickup hours, summed over every timestamp column
/// present. Hours are read from the stored wall-clock time as-is.
pub fn peak_hours(table: &TripTable) -> AggregationResult {
    let columns: Vec<_> = PICKUP_TIMESTAMP_COLUMNS
        .iter()
        .filter_map(|name| table.column(name))
        .collect();
    if columns.is_empty() {
        return AggregationResult::error("pickup timestamp column not found");
    }

    let mut counts = [0u64; 24];
    for ts in columns
        .iter()
        .flat_map(|c| c.iter())
        .filter_map(|v| v.as_timestamp())
    {
        counts[ts.hour() as usize] += 1;
    }

    let per_hour = (0u32..24)
        .zip(counts)
        .filter(|(_, count)| *count > 0);

    AggregationResult::GroupedRanking {
        entries: top_n(per_hour, TOP_N),
    }
}

/// Number of rows belonging to `class`.
pub fn count_by_class(table: &TripTable, class: TaxiClass) -> AggregationResult {
    match ClassDiscriminant::for_class(class) {
        ClassDiscriminant::VendorId(vendor) => {
            let Some(column) = table.column(VENDOR_ID) else {
                return AggregationResult::error(format!("{VENDOR_ID} not found"));
            };
            let n = column
                .iter()
                .filter(|v| v.as_i64() == Some(vendor))
                .count();
            AggregationResult::count(n as u64)
        }
        ClassDiscriminant::Provenance(class) => {
            if table.origins().iter().all(|o| o.class.is_none()) {
                return AggregationResult::error("source provenance not available");
            }
            let n = (0..table.len())
                .filter(|&row| table.row_origin(row).and_then(|o| o.class) == Some(class))
                .count();
            AggregationResult::count(n as u64)
        }
    }
}
