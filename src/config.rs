//! Configuration loader for the `sensor-gapfill` batch tool.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). File paths, column names and the sampling cadence
//! all live here so the pipeline itself never touches `env::var`.
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use chrono::Duration;

use crate::io::{OutputLayout, SourceLayout};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional boolean environment variable with a default value.
macro_rules! parse_env_bool {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| parse_bool(&v))
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable, treating blank as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

const DEFAULT_PARAMS: &str = "p,rh,temp,temp_soil";
const DEFAULT_INTERVAL_SECS: u32 = 360;

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the whole run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Primary sensor export (CSV).
    pub primary_csv: PathBuf,

    /// SIM-relayed export used for patching; patching is skipped when unset.
    pub secondary_csv: Option<PathBuf>,

    /// Cleaned output file.
    pub output_csv: PathBuf,

    /// Timestamp column in the primary export (also used for the output).
    pub time_column: String,

    /// Timestamp column in the secondary export.
    pub secondary_time_column: String,

    /// Numeric parameters that are gap-filled and patched.
    pub params: Vec<String>,

    /// Text columns copied through from the primary export.
    pub carry_columns: Vec<String>,

    /// Expected sampling cadence in seconds.
    pub interval_secs: u32,

    /// Whether the output carries an `origin` column.
    pub emit_provenance: bool,

    /// Optional JSON run report.
    pub report_json: Option<PathBuf>,

    /// Optional SVG chart of the output.
    pub plot_svg: Option<PathBuf>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `PRIMARY_CSV` – primary sensor export (`.csv` or `.xlsx`)
///
/// Optional:
/// - `SECONDARY_CSV` – SIM-relayed export, `.csv` or `.xlsx` (default: none, no patching)
/// - `OUTPUT_CSV` – cleaned output (default: `update.csv`)
/// - `TIME_COLUMN` – timestamp column (default: `time`)
/// - `SECONDARY_TIME_COLUMN` – secondary timestamp column (default: `TIME_COLUMN`)
/// - `TRACKED_PARAMS` – comma separated parameters (default: `p,rh,temp,temp_soil`)
/// - `CARRY_COLUMNS` – comma separated pass-through columns (default: none)
/// - `SAMPLE_INTERVAL_SECS` – cadence in seconds (default: 360)
/// - `EMIT_PROVENANCE` – add an `origin` column (default: false)
/// - `REPORT_JSON` – write the run report here (default: none)
/// - `PLOT_SVG` – render a chart here (default: none)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let primary_csv = PathBuf::from(require_env!("PRIMARY_CSV"));
    let secondary_csv = optional_env!("SECONDARY_CSV").map(PathBuf::from);
    let output_csv =
        PathBuf::from(optional_env!("OUTPUT_CSV").unwrap_or_else(|| "update.csv".to_string()));

    let time_column = optional_env!("TIME_COLUMN")
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "time".to_string());
    let secondary_time_column = optional_env!("SECONDARY_TIME_COLUMN")
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| time_column.clone());

    let params = parse_list(&env::var("TRACKED_PARAMS").unwrap_or_else(|_| DEFAULT_PARAMS.into()));
    if params.is_empty() {
        bail!("TRACKED_PARAMS must name at least one parameter");
    }
    let carry_columns = parse_list(&env::var("CARRY_COLUMNS").unwrap_or_default());

    let interval_secs = parse_env_u32!("SAMPLE_INTERVAL_SECS", DEFAULT_INTERVAL_SECS);
    if interval_secs == 0 {
        bail!("SAMPLE_INTERVAL_SECS must be greater than zero");
    }

    let emit_provenance = parse_env_bool!("EMIT_PROVENANCE", false);
    let report_json = optional_env!("REPORT_JSON").map(PathBuf::from);
    let plot_svg = optional_env!("PLOT_SVG").map(PathBuf::from);

    Ok(Config {
        primary_csv,
        secondary_csv,
        output_csv,
        time_column,
        secondary_time_column,
        params,
        carry_columns,
        interval_secs,
        emit_provenance,
        report_json,
        plot_svg,
    })
}

impl Config {
    // ---
    pub fn interval(&self) -> Duration {
        Duration::seconds(i64::from(self.interval_secs))
    }

    pub fn primary_layout(&self) -> SourceLayout {
        // ---
        SourceLayout {
            label: "primary".to_string(),
            time_column: self.time_column.clone(),
            params: self.params.clone(),
            carried: self.carry_columns.clone(),
        }
    }

    pub fn secondary_layout(&self) -> SourceLayout {
        // ---
        SourceLayout {
            label: "secondary".to_string(),
            time_column: self.secondary_time_column.clone(),
            params: self.params.clone(),
            carried: Vec::new(),
        }
    }

    /// Layout for re-reading the emitted file (used by the chart).
    pub fn cleaned_layout(&self) -> SourceLayout {
        // ---
        SourceLayout {
            label: "cleaned".to_string(),
            time_column: self.time_column.clone(),
            params: self.params.clone(),
            carried: Vec::new(),
        }
    }

    pub fn output_layout(&self) -> OutputLayout {
        // ---
        OutputLayout {
            time_column: self.time_column.clone(),
            params: self.params.clone(),
            carried: self.carry_columns.clone(),
            provenance: self.emit_provenance,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  PRIMARY_CSV           : {}", self.primary_csv.display());
        tracing::info!("  SECONDARY_CSV         : {}", show(&self.secondary_csv));
        tracing::info!("  OUTPUT_CSV            : {}", self.output_csv.display());
        tracing::info!("  TIME_COLUMN           : {}", self.time_column);
        tracing::info!("  SECONDARY_TIME_COLUMN : {}", self.secondary_time_column);
        tracing::info!("  TRACKED_PARAMS        : {}", self.params.join(","));
        tracing::info!("  CARRY_COLUMNS         : {}", self.carry_columns.join(","));
        tracing::info!("  SAMPLE_INTERVAL_SECS  : {}", self.interval_secs);
        tracing::info!("  EMIT_PROVENANCE       : {}", self.emit_provenance);
        tracing::info!("  REPORT_JSON           : {}", show(&self.report_json));
        tracing::info!("  PLOT_SVG              : {}", show(&self.plot_svg));
    }
}

/// Split a comma separated list, dropping blanks and repeated names.
fn parse_list(raw: &str) -> Vec<String> {
    // ---
    let mut out: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn parse_bool(raw: &str) -> Result<bool> {
    // ---
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("expected true/false, got '{}'", other)),
    }
}
