//! Counters gathered while cleaning one series.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::is_unfilled;
use crate::Reading;

// ---

/// Summary of a single run, logged at the end and optionally written as JSON.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    // ---
    pub primary_rows: usize,
    pub secondary_rows: usize,
    pub duplicates_dropped: usize,
    pub secondary_duplicates: usize,
    pub gaps_inserted: usize,
    pub readings_patched: usize,
    pub values_patched: usize,
    /// Parameter -> number of values still sentinel or missing in the output.
    pub unresolved: BTreeMap<String, usize>,
    pub output_rows: usize,
}

impl RunReport {
    // ---
    /// Fill in the output-side counters from the final series.
    pub fn record_output(&mut self, series: &[Reading], params: &[String]) {
        // ---
        self.output_rows = series.len();
        self.unresolved = params
            .iter()
            .map(|p| {
                let n = series.iter().filter(|r| is_unfilled(r.value(p))).count();
                (p.clone(), n)
            })
            .collect();
    }

    pub fn log(&self) {
        // ---
        info!("Run summary:");
        info!("  primary rows       : {}", self.primary_rows);
        info!("  secondary rows     : {}", self.secondary_rows);
        info!("  duplicates dropped : {}", self.duplicates_dropped);
        info!("  secondary dups     : {}", self.secondary_duplicates);
        info!("  gaps inserted      : {}", self.gaps_inserted);
        info!(
            "  readings patched   : {} ({} values)",
            self.readings_patched, self.values_patched
        );
        for (param, count) in &self.unresolved {
            info!("  unresolved {:<8}: {}", param, count);
        }
        info!("  output rows        : {}", self.output_rows);
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        // ---
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write run report '{}'", path.display()))?;
        info!("Run report written to {}", path.display());
        Ok(())
    }
}
