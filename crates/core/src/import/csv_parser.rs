//! Delimited-text reading for CSV uploads and pasted spreadsheet cells.
//!
//! Both readers share one pass: records are split with the `csv` crate
//! (RFC-4180 quoting, flexible field counts), the first non-blank record
//! becomes the header row, and every data row is reshaped to the header
//! width with a warning when it had to be padded or truncated.

use csv::ReaderBuilder;
use log::{debug, warn};

use super::import_errors::ImportError;
use super::import_model::{RawRow, RowWarning, SourceRows};

const UTF8_BOM: char = '\u{feff}';

/// Reads comma-separated text whose first non-empty line is the header row.
pub fn read_csv(text: &str) -> Result<SourceRows, ImportError> {
    read_delimited(text, b',')
}

/// Reads text pasted from a spreadsheet.
///
/// Excel and Google Sheets put tabs between cells, so a tab anywhere in the
/// first non-empty line selects tab as the separator; otherwise comma.
pub fn read_pasted(text: &str) -> Result<SourceRows, ImportError> {
    let delimiter = detect_paste_delimiter(text);
    debug!(
        "Pasted input delimiter: {}",
        if delimiter == b'\t' { "tab" } else { "comma" }
    );
    read_delimited(text, delimiter)
}

fn detect_paste_delimiter(text: &str) -> u8 {
    let first_line = strip_bom(text)
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

pub(crate) fn read_delimited(text: &str, delimiter: u8) -> Result<SourceRows, ImportError> {
    let records = split_records(text, delimiter);
    let header_index = records
        .iter()
        .position(|record| !is_blank_record(record))
        .ok_or(ImportError::EmptyInput)?;
    Ok(rows_from_records(records, header_index))
}

/// Splits text into records of raw cells. Blank lines are dropped by the
/// `csv` reader; rows consisting only of empty cells are kept here and
/// filtered by `rows_from_records`.
pub(crate) fn split_records(text: &str, delimiter: u8) -> Vec<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(strip_bom(text).as_bytes());

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => records.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => warn!("Skipping unreadable record {}: {}", idx + 1, e),
        }
    }
    records
}

pub(crate) fn is_blank_record(record: &[String]) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

/// Builds `SourceRows` from split records, using `records[header_index]` as
/// the header row and everything after it as data.
pub(crate) fn rows_from_records(records: Vec<Vec<String>>, header_index: usize) -> SourceRows {
    let mut iter = records.into_iter().skip(header_index);
    let headers = normalize_headers(iter.next().unwrap_or_default());
    let width = headers.len();

    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    for mut cells in iter.filter(|record| !is_blank_record(record)) {
        let row_index = rows.len();
        if cells.len() < width {
            warnings.push(RowWarning {
                row_index,
                message: format!(
                    "Row has {} columns, expected {}. Missing columns left empty.",
                    cells.len(),
                    width
                ),
            });
            cells.resize(width, String::new());
        } else if cells.len() > width {
            warnings.push(RowWarning {
                row_index,
                message: format!(
                    "Row has {} columns, expected {}. Extra columns ignored.",
                    cells.len(),
                    width
                ),
            });
            cells.truncate(width);
        }
        rows.push(RawRow::from_pairs(headers.iter().cloned().zip(cells)));
    }

    if !warnings.is_empty() {
        warn!("{} row(s) did not match the header width", warnings.len());
    }

    SourceRows {
        headers,
        rows,
        warnings,
    }
}

/// Trims header cells, names blank ones `ColumnN` and suffixes repeats so
/// every header is a distinct key.
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, cell) in raw.into_iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("Column{}", idx + 1),
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while headers.contains(&candidate) {
            candidate = format!("{} ({})", base, n);
            n += 1;
        }
        headers.push(candidate);
    }
    headers
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(UTF8_BOM).unwrap_or(text)
}
