//! Application entry point for the `sensor-gapfill` batch tool.
//!
//! This binary runs one cleaning pass over a 6-minute IoT sensor export:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Loading the primary and (optional) SIM-relayed exports (CSV or `.xlsx`)
//! - Inserting synthetic rows for missing sampling intervals
//! - Patching sentinel/missing values from the secondary export
//! - Writing the cleaned series (default `update.csv`)
//! - Optionally writing a JSON run report and an SVG chart
//!
//! # Environment Variables
//! - `PRIMARY_CSV` (**required**) – primary sensor export
//! - `SECONDARY_CSV` (optional) – SIM-relayed export used for patching
//! - `GAPFILL_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `GAPFILL_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the full list. This module follows the Explicit Module
//! Boundary Pattern (EMBP) by delegating configuration parsing to `config`,
//! file handling to `io` and the cleaning algorithm to `pipeline`.
use std::env;

use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod io;
mod models;
mod pipeline;

// Imported here so pipeline/*.rs and io/*.rs depend on their parent module
// (main.rs) rather than on models.rs directly.
pub use models::{Reading, Record, SecondaryObservation};

// ---

fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    // Step 1: load both exports; nothing is written if either fails
    tracing::debug!("main - Step 1");
    let primary = io::load_records(&cfg.primary_csv, &cfg.primary_layout())?;
    let secondary = match &cfg.secondary_csv {
        Some(path) => io::load_records(path, &cfg.secondary_layout())?,
        None => {
            tracing::info!("No SECONDARY_CSV configured, patching skipped");
            Vec::new()
        }
    };

    // Step 2: gap-fill and patch
    tracing::debug!("main - Step 2");
    let (series, report) = pipeline::run(primary, secondary, &cfg.params, cfg.interval());

    // Step 3: emit
    tracing::debug!("main - Step 3");
    io::write_series(&cfg.output_csv, &series, &cfg.output_layout())?;
    report.log();
    if let Some(path) = &cfg.report_json {
        report.write_json(path)?;
    }

    // Step 4: optional chart of what was just written
    if let Some(svg) = &cfg.plot_svg {
        tracing::debug!("main - Step 4");
        io::render_svg(&cfg.output_csv, svg, &cfg.cleaned_layout())?;
    }

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `GAPFILL_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `GAPFILL_LOG_LEVEL` env var
///
/// Logs go to stderr so stdout stays free for the caller. Call once at
/// startup before any tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("GAPFILL_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to GAPFILL_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("GAPFILL_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
