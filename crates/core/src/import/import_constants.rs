//! Diagnostic messages attached to import records.
//!
//! These strings are shown verbatim in the preview table, so changing one
//! is a user-visible change.

/// Symbol is empty or does not look like a ticker (1-5 letters, optional share class).
pub const MSG_INVALID_SYMBOL: &str = "Invalid symbol format";

/// Shares cell is empty, non-numeric, zero or negative.
pub const MSG_INVALID_SHARES: &str = "Shares must be a positive number";

/// Cost basis cell is empty, non-numeric, zero or negative.
pub const MSG_INVALID_COST_BASIS: &str = "Cost basis must be a positive number";

/// Purchase date matches no accepted format, or lies after the reference date.
pub const MSG_INVALID_PURCHASE_DATE: &str = "Invalid or future purchase date";

/// Current price was supplied but is unusable. The price is refreshed from
/// market data after import, so this only downgrades the row to a warning.
pub const MSG_CURRENT_PRICE_IGNORED: &str = "Current price ignored; will be fetched";

/// An earlier row in the same session already holds this symbol.
pub const MSG_DUPLICATE_SYMBOL: &str = "Duplicate symbol: consider consolidating positions";

/// Prefix for the short-circuit message emitted when a required field has no column.
pub const MSG_REQUIRED_COLUMN_PREFIX: &str = "Required column not mapped: ";

/// Builds the message for an unmapped required field.
pub fn required_column_message(field: &str) -> String {
    format!("{}{}", MSG_REQUIRED_COLUMN_PREFIX, field)
}

/// Default maximum number of data rows accepted in one import.
pub const DEFAULT_MAX_IMPORT_ROWS: usize = 10_000;

/// Default maximum size of the raw import text, in bytes (10 MB).
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

/// Confidence for a case-insensitive exact header match.
pub const CONFIDENCE_EXACT: f64 = 1.0;

/// Confidence for a case-insensitive substring header match.
pub const CONFIDENCE_SUBSTRING: f64 = 0.6;

/// Confidence reported for an unmapped field.
pub const CONFIDENCE_NONE: f64 = 0.0;
