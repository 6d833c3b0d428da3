//! Synthetic placeholder rows for detected gaps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::Reading;

// ---

/// Merge one synthetic reading per gap into `primary`, sorted by timestamp.
///
/// `primary` must be sorted and free of duplicate timestamps, and `gaps` must be
/// disjoint from it (which [`super::detect_gaps`] guarantees). Carried columns on
/// a synthetic row are copied from the closest earlier primary row.
pub fn insert_synthetic(
    primary: Vec<Reading>,
    gaps: &[DateTime<Utc>],
    params: &[String],
) -> Vec<Reading> {
    // ---
    if gaps.is_empty() {
        return primary;
    }

    let synthetic: Vec<Reading> = gaps
        .iter()
        .map(|&ts| {
            trace!("inserting synthetic row at {}", ts);
            Reading::synthetic(ts, params, carried_before(&primary, ts))
        })
        .collect();

    let mut merged = primary;
    merged.reserve(synthetic.len());
    merged.extend(synthetic);
    merged.sort_by_key(|r| r.timestamp);
    merged
}

fn carried_before(primary: &[Reading], ts: DateTime<Utc>) -> BTreeMap<String, String> {
    // ---
    let idx = primary.partition_point(|r| r.timestamp < ts);
    let source = match idx {
        0 => primary.first(),
        i => primary.get(i - 1),
    };
    source.map(|r| r.carried.clone()).unwrap_or_default()
}
