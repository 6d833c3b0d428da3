//! Writes the cleaned series as CSV.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::{format_timestamp, SENTINEL};
use crate::Reading;

// ---

/// Column order of the output file.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    // ---
    pub time_column: String,
    pub params: Vec<String>,
    pub carried: Vec<String>,
    /// Append an `origin` column with each reading's provenance.
    pub provenance: bool,
}

impl OutputLayout {
    fn header(&self) -> Vec<&str> {
        // ---
        let mut cols = vec![self.time_column.as_str()];
        cols.extend(self.params.iter().map(String::as_str));
        cols.extend(self.carried.iter().map(String::as_str));
        if self.provenance {
            cols.push("origin");
        }
        cols
    }

    fn row(&self, reading: &Reading) -> Vec<String> {
        // ---
        let mut fields = Vec::with_capacity(self.params.len() + self.carried.len() + 2);
        fields.push(format_timestamp(&reading.timestamp));
        fields.extend(self.params.iter().map(|p| format_value(reading.value(p))));
        fields.extend(
            self.carried
                .iter()
                .map(|c| reading.carried.get(c).cloned().unwrap_or_default()),
        );
        if self.provenance {
            fields.push(reading.origin.as_str().to_string());
        }
        fields
    }
}

/// Write `series` to `path`, replacing it only once the whole file is written.
pub fn write_series(path: &Path, series: &[Reading], layout: &OutputLayout) -> Result<()> {
    // ---
    let staging = staging_path(path);

    let written = write_to(&staging, series, layout);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }

    std::fs::rename(&staging, path).with_context(|| {
        format!(
            "Failed to move '{}' into place at '{}'",
            staging.display(),
            path.display()
        )
    })?;

    info!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

fn write_to(path: &Path, series: &[Reading], layout: &OutputLayout) -> Result<()> {
    // ---
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create '{}'", path.display()))?;

    writer.write_record(layout.header())?;
    for reading in series {
        writer.write_record(layout.row(reading))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush '{}'", path.display()))?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    // ---
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "update.csv".to_string());
    path.with_file_name(format!(".{name}.partial"))
}

/// Whole numbers keep one decimal (`0.0`, `5.0`); missing values are empty.
/// Every sentinel, `-0` included, is written as `0.0`.
fn format_value(value: Option<f64>) -> String {
    // ---
    match value {
        None => String::new(),
        Some(v) if v.is_nan() => String::new(),
        Some(v) if v == SENTINEL => format!("{SENTINEL:.1}"),
        Some(v) if v.fract() == 0.0 && v.is_finite() => format!("{v:.1}"),
        Some(v) => v.to_string(),
    }
}
