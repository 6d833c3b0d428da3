//! Secondary-source patching of sentinel and missing values.
//!
//! Lookup is by exact timestamp only. If the SIM relay and the primary logger
//! disagree on the clock, rows simply do not match and keep their sentinels.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{is_unfilled, Origin};
use crate::{Reading, SecondaryObservation};

// ---

/// Secondary observations keyed by timestamp. The first observation for a
/// timestamp wins; later duplicates are counted and ignored.
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    by_time: HashMap<DateTime<Utc>, SecondaryObservation>,
    duplicates: usize,
}

impl SecondaryIndex {
    // ---
    pub fn build(observations: Vec<SecondaryObservation>) -> Self {
        // ---
        let mut index = SecondaryIndex::default();
        for obs in observations {
            if index.by_time.contains_key(&obs.timestamp) {
                index.duplicates += 1;
                continue;
            }
            index.by_time.insert(obs.timestamp, obs);
        }
        if index.duplicates > 0 {
            warn!(
                "Secondary source has {} duplicate timestamps; keeping the first of each",
                index.duplicates
            );
        }
        index
    }

    pub fn get(&self, ts: &DateTime<Utc>) -> Option<&SecondaryObservation> {
        self.by_time.get(ts)
    }

    pub fn len(&self) -> usize {
        self.by_time.len()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// What a patch pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchStats {
    /// Readings that had at least one value replaced in this pass.
    pub readings: usize,
    /// Individual parameter values replaced.
    pub values: usize,
}

/// Replace unfilled values in `series` with non-sentinel values observed by the
/// secondary source at the same instant.
///
/// Only readings that gain a value are tagged [`Origin::Patched`]; the tag is
/// never removed. Running this twice changes nothing the second time, since
/// every value written is non-sentinel.
pub fn patch_series(
    series: &mut [Reading],
    secondary: &SecondaryIndex,
    params: &[String],
) -> PatchStats {
    // ---
    let mut stats = PatchStats::default();

    for reading in series.iter_mut() {
        let Some(obs) = secondary.get(&reading.timestamp) else {
            continue;
        };

        let mut replaced = 0;
        for param in reading.unfilled_params(params) {
            let candidate = obs.values.get(param).copied().flatten();
            if is_unfilled(candidate) {
                continue;
            }
            reading.values.insert(param.to_string(), candidate);
            replaced += 1;
        }

        if replaced > 0 {
            debug!(
                "patched {} value(s) at {} ({} -> patched)",
                replaced,
                reading.timestamp,
                reading.origin.as_str()
            );
            reading.origin = Origin::Patched;
            stats.readings += 1;
            stats.values += replaced;
        }
    }

    stats
}
