//! File adapters around the pipeline: CSV or `.xlsx` in, CSV out, optional
//! SVG chart.
//!
//! EMBP gateway: `main.rs` talks to these re-exports only.

use std::path::PathBuf;

use thiserror::Error;

mod emitter;
mod loader;
mod plot;
mod workbook;

pub use emitter::{write_series, OutputLayout};
pub use loader::load_records;
pub use plot::render_svg;

// ---

/// Which columns to read from one export.
#[derive(Debug, Clone)]
pub struct SourceLayout {
    // ---
    /// Name used in log lines ("primary", "secondary").
    pub label: String,
    pub time_column: String,
    /// Required numeric columns.
    pub params: Vec<String>,
    /// Optional pass-through columns.
    pub carried: Vec<String>,
}

/// Fatal problems with a source export. Every variant names the file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("'{}': unsupported file format, expected .csv or .xlsx", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{}': required column '{column}' not found in header", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("'{}' line {line}: cannot parse timestamp '{value}'", path.display())]
    BadTimestamp {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("'{}' line {line}: column '{column}' is not numeric: '{value}'", path.display())]
    BadValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("'{}' line {line}: malformed CSV: {source}", path.display())]
    Csv {
        path: PathBuf,
        line: u64,
        source: csv::Error,
    },

    #[error("cannot read workbook '{}': {source}", path.display())]
    Workbook {
        path: PathBuf,
        source: calamine::XlsxError,
    },

    #[error("'{}': first worksheet has no header row", path.display())]
    EmptyWorkbook { path: PathBuf },
}
