//! `.xlsx` exports. Only the first worksheet is read; its first row is the
//! header, and every cell is turned into the same text the CSV path sees.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use csv::StringRecord;
use tracing::debug;

use super::loader::RawTable;
use super::SourceError;
use crate::models::format_timestamp;

// ---

/// Read the first worksheet of `path`. Row numbers are 1-based sheet rows.
pub(super) fn read_first_sheet(path: &Path) -> Result<RawTable, SourceError> {
    // ---
    let workbook_err = |source: XlsxError| SourceError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook: Xlsx<_> = open_workbook(path).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?
        .map_err(workbook_err)?;

    let first_row = range.start().map_or(0, |(row, _)| u64::from(row));
    let mut rows = range
        .rows()
        .enumerate()
        .map(|(i, cells)| (first_row + i as u64 + 1, cells));

    let headers: StringRecord = match rows.next() {
        Some((_, cells)) => cells.iter().map(cell_text).collect(),
        None => {
            return Err(SourceError::EmptyWorkbook {
                path: path.to_path_buf(),
            })
        }
    };

    // Trailing blank rows are common in exported sheets
    let rows: Vec<(u64, StringRecord)> = rows
        .filter(|(_, cells)| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|(line, cells)| (line, cells.iter().map(cell_text).collect()))
        .collect();

    debug!("{}: {} worksheet rows", path.display(), rows.len());
    Ok(RawTable { headers, rows })
}

/// Text form of a cell. Date cells become canonical UTC timestamps.
fn cell_text(cell: &Data) -> String {
    // ---
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) => s.trim().to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|naive| format_timestamp(&naive.and_utc()))
            .unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}
