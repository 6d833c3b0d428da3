//! Gap-fill pipeline: grid -> gaps -> synthetic rows -> secondary patch.
//!
//! Each stage is a pure function of its inputs. `main.rs` only sees [`run`]
//! and the types re-exported here (EMBP gateway).

use std::collections::BTreeSet;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::{Reading, Record, SecondaryObservation};

mod fill;
mod gaps;
mod grid;
mod patch;
mod report;

pub use fill::insert_synthetic;
pub use gaps::detect_gaps;
pub use grid::TimeGrid;
pub use patch::{patch_series, SecondaryIndex};
pub use report::RunReport;

// ---

/// Clean the primary series against the expected grid and patch it from the
/// secondary source.
///
/// Returns the final series, strictly increasing in timestamp, together with
/// the run counters.
pub fn run(
    primary: Vec<Record>,
    secondary: Vec<Record>,
    params: &[String],
    interval: Duration,
) -> (Vec<Reading>, RunReport) {
    // ---
    let mut report = RunReport {
        primary_rows: primary.len(),
        secondary_rows: secondary.len(),
        ..RunReport::default()
    };

    if primary.is_empty() {
        info!("Primary series is empty, nothing to clean");
        report.record_output(&[], params);
        return (Vec::new(), report);
    }

    // Step 1: order and de-duplicate the primary rows
    debug!("pipeline - Step 1");
    let mut readings: Vec<Reading> = primary.into_iter().map(Reading::from).collect();
    readings.sort_by_key(|r| r.timestamp);
    let before = readings.len();
    readings.dedup_by_key(|r| r.timestamp);
    report.duplicates_dropped = before - readings.len();
    if report.duplicates_dropped > 0 {
        warn!(
            "Dropped {} primary rows with duplicate timestamps",
            report.duplicates_dropped
        );
    }

    // Step 2: find grid slots with no reading
    debug!("pipeline - Step 2");
    let present: BTreeSet<_> = readings.iter().map(|r| r.timestamp).collect();
    let gaps = TimeGrid::spanning(present.iter().copied(), interval)
        .map(|grid| detect_gaps(&present, &grid))
        .unwrap_or_default();
    report.gaps_inserted = gaps.len();
    info!("Detected {} missing intervals", gaps.len());

    // Step 3: synthesize placeholders
    debug!("pipeline - Step 3");
    let mut series = insert_synthetic(readings, &gaps, params);

    // Step 4: patch from the secondary source
    debug!("pipeline - Step 4");
    let index = SecondaryIndex::build(
        secondary
            .into_iter()
            .map(SecondaryObservation::from)
            .collect(),
    );
    report.secondary_duplicates = index.duplicates();
    let stats = patch_series(&mut series, &index, params);
    report.readings_patched = stats.readings;
    report.values_patched = stats.values;
    info!(
        "Patched {} readings ({} values) from {} secondary observations",
        stats.readings,
        stats.values,
        index.len()
    );

    report.record_output(&series, params);
    (series, report)
}
