//! Loader for the primary and secondary exports, CSV or `.xlsx`.
//!
//! The whole file is read into memory and the handle dropped before the
//! pipeline starts. Any malformed row aborts the load.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use super::{workbook, SourceError, SourceLayout};
use crate::models::Values;
use crate::Record;

// ---

/// Naive layouts accepted after RFC 3339 fails; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Header plus data rows, each tagged with its 1-based line in the source.
#[derive(Debug)]
pub(super) struct RawTable {
    pub headers: StringRecord,
    pub rows: Vec<(u64, StringRecord)>,
}

/// Resolved column positions for one file.
struct Columns {
    time: usize,
    params: Vec<(String, usize)>,
    carried: Vec<(String, usize)>,
}

enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    fn of(path: &Path) -> Result<Self, SourceError> {
        // ---
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(SourceError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Load every row of `path` as a [`Record`], in file order.
///
/// `.csv` files are read directly; `.xlsx` files through their first worksheet.
/// Any other extension is rejected.
pub fn load_records(path: &Path, layout: &SourceLayout) -> Result<Vec<Record>, SourceError> {
    // ---
    let table = match SourceFormat::of(path)? {
        SourceFormat::Csv => read_csv(path)?,
        SourceFormat::Xlsx => workbook::read_first_sheet(path)?,
    };
    records_from_table(path, layout, table)
}

/// Load a file known to be CSV regardless of its name.
pub(super) fn load_csv(path: &Path, layout: &SourceLayout) -> Result<Vec<Record>, SourceError> {
    // ---
    let table = read_csv(path)?;
    records_from_table(path, layout, table)
}

fn records_from_table(
    path: &Path,
    layout: &SourceLayout,
    table: RawTable,
) -> Result<Vec<Record>, SourceError> {
    // ---
    info!(
        "{} header ({}): {}",
        layout.label,
        path.display(),
        table.headers.iter().collect::<Vec<_>>().join(", ")
    );

    let columns = resolve_columns(path, &table.headers, layout)?;
    let records = table
        .rows
        .iter()
        .map(|(line, row)| parse_row(path, *line, row, &columns))
        .collect::<Result<Vec<_>, _>>()?;

    report_counts(layout, &records);
    Ok(records)
}

fn read_csv(path: &Path) -> Result<RawTable, SourceError> {
    // ---
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| SourceError::Csv {
            path: path.to_path_buf(),
            line: 1,
            source,
        })?
        .clone();

    let mut rows = Vec::new();
    let mut row = StringRecord::new();
    loop {
        let line = reader.position().line();
        match reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(source) => {
                return Err(SourceError::Csv {
                    path: path.to_path_buf(),
                    line,
                    source,
                })
            }
        }
        let line = row.position().map(|p| p.line()).unwrap_or(line);
        rows.push((line, row.clone()));
    }

    Ok(RawTable { headers, rows })
}

fn resolve_columns(
    path: &Path,
    headers: &StringRecord,
    layout: &SourceLayout,
) -> Result<Columns, SourceError> {
    // ---
    let find = |name: &str| -> Result<usize, SourceError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SourceError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };

    let time = find(&layout.time_column)?;
    let params = layout
        .params
        .iter()
        .map(|p| find(p).map(|idx| (p.clone(), idx)))
        .collect::<Result<Vec<_>, _>>()?;

    // Carried columns are optional metadata; absent ones are skipped
    let carried = layout
        .carried
        .iter()
        .filter_map(|c| headers.iter().position(|h| h == c).map(|idx| (c.clone(), idx)))
        .collect::<Vec<_>>();
    if carried.len() < layout.carried.len() {
        debug!(
            "{}: {} of {} carried columns present",
            layout.label,
            carried.len(),
            layout.carried.len()
        );
    }

    Ok(Columns {
        time,
        params,
        carried,
    })
}

fn parse_row(
    path: &Path,
    line: u64,
    row: &StringRecord,
    columns: &Columns,
) -> Result<Record, SourceError> {
    // ---
    let raw_time = row.get(columns.time).unwrap_or("");
    let timestamp = parse_timestamp(raw_time).ok_or_else(|| SourceError::BadTimestamp {
        path: path.to_path_buf(),
        line,
        value: raw_time.to_string(),
    })?;

    let mut values = Values::new();
    for (name, idx) in &columns.params {
        let raw = row.get(*idx).unwrap_or("");
        let value = parse_value(raw).map_err(|_| SourceError::BadValue {
            path: path.to_path_buf(),
            line,
            column: name.clone(),
            value: raw.to_string(),
        })?;
        values.insert(name.clone(), value);
    }

    let carried: BTreeMap<String, String> = columns
        .carried
        .iter()
        .map(|(name, idx)| (name.clone(), row.get(*idx).unwrap_or("").to_string()))
        .collect();

    Ok(Record {
        timestamp,
        values,
        carried,
    })
}

/// Parse an export timestamp. Offsets are normalized to UTC; naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Spreadsheet exports often use a space separator with an offset
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Empty and `NaN` cells are missing; anything else must be a number.
fn parse_value(raw: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    // ---
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some)
}

/// Log the row count and non-empty cells per tracked and carried column.
fn report_counts(layout: &SourceLayout, records: &[Record]) {
    // ---
    info!("{}: {} rows loaded", layout.label, records.len());
    for (column, present) in column_counts(layout, records) {
        info!("{}: column '{}' has {} values", layout.label, column, present);
    }
}

/// Non-empty cells per column, tracked parameters first. Carried columns
/// missing from the header are skipped.
fn column_counts(layout: &SourceLayout, records: &[Record]) -> Vec<(String, usize)> {
    // ---
    let mut counts: Vec<(String, usize)> = layout
        .params
        .iter()
        .map(|param| {
            let present = records
                .iter()
                .filter(|r| r.values.get(param).copied().flatten().is_some())
                .count();
            (param.clone(), present)
        })
        .collect();

    for column in &layout.carried {
        if records.first().is_some_and(|r| !r.carried.contains_key(column)) {
            continue;
        }
        let present = records
            .iter()
            .filter(|r| r.carried.get(column).is_some_and(|v| !v.is_empty()))
            .count();
        counts.push((column.clone(), present));
    }
    counts
}
