//! Aggregation engine: one pure function per intent over a [`TripTable`].
//!
//! A missing column is reported as [`AggregationResult::Error`], never as a
//! zero or empty result.

pub mod aggregate;
pub mod types;
pub mod utility;

pub use types::AggregationResult;

use crate::router::Intent;
use crate::table::TripTable;

/// Runs the aggregation for `intent`. Returns `None` for
/// [`Intent::Unrecognized`], which has nothing to compute.
pub fn execute(intent: Intent, table: &TripTable) -> Option<AggregationResult> {
    let result = match intent {
        Intent::TotalRides => aggregate::total_rides(table),
        Intent::TopPickupLocations => aggregate::top_pickup_locations(table),
        Intent::AverageFare => aggregate::average_fare(table),
        Intent::PeakHours => aggregate::peak_hours(table),
        Intent::FilterByClass(class) => aggregate::count_by_class(table, class),
        Intent::Unrecognized => return None,
    };
    Some(result)
}
