//! Gap detection against the expected sampling grid.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::grid::TimeGrid;

// ---

/// Grid timestamps that no primary row carries, in ascending order.
///
/// Matching is exact. A series with zero or one rows has no gaps because
/// its grid holds at most the single observed instant.
pub fn detect_gaps(present: &BTreeSet<DateTime<Utc>>, grid: &TimeGrid) -> Vec<DateTime<Utc>> {
    // ---
    if present.len() < 2 {
        return Vec::new();
    }

    grid.iter().filter(|ts| !present.contains(ts)).collect()
}
