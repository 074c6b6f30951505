//! Row validation and normalization.
//!
//! Every row is checked on its own against the resolved column mapping.
//! The only cross-row rule is duplicate detection, which looks at the
//! symbols of earlier rows and nothing else, so a problem in one row can
//! never change the outcome of another.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

use super::import_constants::{
    required_column_message, MSG_CURRENT_PRICE_IGNORED, MSG_DUPLICATE_SYMBOL,
    MSG_INVALID_COST_BASIS, MSG_INVALID_PURCHASE_DATE, MSG_INVALID_SHARES, MSG_INVALID_SYMBOL,
};
use super::import_model::{CanonicalField, ColumnMapping, ImportRecord, RawRow};
use crate::constants::{DECIMAL_PRECISION, ISO_DATE_FORMAT};

lazy_static! {
    /// 1-5 letters, optionally followed by a share class: `BRK.B`, `RDS.A`.
    static ref SYMBOL_REGEX: Regex =
        Regex::new(r"^[A-Z]{1,5}(\.[A-Z]{1,2})?$").expect("Invalid regex pattern");
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

// =============================================================================
// Field parsing
// =============================================================================

/// Trims and uppercases a raw symbol.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn is_valid_symbol(symbol: &str) -> bool {
    SYMBOL_REGEX.is_match(symbol)
}

/// Parses a share quantity: plain decimals, comma thousands separators and
/// scientific notation.
pub fn parse_quantity(raw: &str) -> Option<Decimal> {
    parse_number(raw, false)
}

/// Parses a money amount. Like [`parse_quantity`], and also accepts one
/// leading currency symbol (`$1,250.00`, `-$3`).
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    parse_number(raw, true)
}

fn parse_number(raw: &str, allow_currency: bool) -> Option<Decimal> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }
    if allow_currency {
        if let Some(rest) = s.strip_prefix(CURRENCY_SYMBOLS) {
            s = rest.trim_start();
        }
    }

    let digits = strip_thousands_separators(s)?;
    let value = Decimal::from_str(&digits)
        .or_else(|_| Decimal::from_scientific(&digits))
        .ok()?;
    // A nonzero value must not round to zero and slip past the sign checks.
    let rounded = value.round_dp(DECIMAL_PRECISION);
    if rounded.is_zero() && !value.is_zero() {
        debug!("Rejecting '{}': below {} decimal places", raw.trim(), DECIMAL_PRECISION);
        return None;
    }
    Some(if negative { -rounded } else { rounded })
}

/// Removes comma thousands separators, rejecting commas that do not sit
/// between groups of exactly three digits (`12,5` is not a number here).
fn strip_thousands_separators(s: &str) -> Option<String> {
    if !s.contains(',') {
        return Some(s.to_string());
    }
    let integer_part = s.split(['.', 'e', 'E']).next().unwrap_or("");
    let mut groups = integer_part.split(',');
    let head = groups.next().unwrap_or("");
    let head_ok = !head.is_empty() && head.len() <= 3 && head.chars().all(|c| c.is_ascii_digit());
    let tail_ok = groups.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()));
    let rest = &s[integer_part.len()..];
    if head_ok && tail_ok && !rest.contains(',') {
        Some(s.replace(',', ""))
    } else {
        None
    }
}

/// Parses a purchase date.
///
/// Accepted, in order: ISO `YYYY-MM-DD` (optionally followed by a time),
/// `YYYY/MM/DD`, `MM/DD/YYYY` and `DD-MM-YYYY`. For the last two the
/// day and month swap when only the swapped reading is a valid month.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // chrono's `%Y` takes a one or two digit year, so `24-03-15` would
    // read as year 24 without this guard.
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    let year_part = date_part.split(['-', '/']).next().unwrap_or("");
    if year_part.len() == 4 && year_part.chars().all(|c| c.is_ascii_digit()) {
        for fmt in [ISO_DATE_FORMAT, "%Y/%m/%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
                return Some(date);
            }
        }
    }

    if let Some((a, b, year)) = split_day_month_year(s, '/') {
        // MM/DD/YYYY unless the first part can only be a day.
        let (month, day) = if a > 12 && b <= 12 { (b, a) } else { (a, b) };
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some((a, b, year)) = split_day_month_year(s, '-') {
        // DD-MM-YYYY unless the second part can only be a day.
        let (day, month) = if b > 12 && a <= 12 { (b, a) } else { (a, b) };
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

fn split_day_month_year(s: &str, sep: char) -> Option<(u32, u32, i32)> {
    let parts: Vec<&str> = s.split(sep).collect();
    let &[a, b, year] = parts.as_slice() else {
        return None;
    };
    let short = |p: &str| (1..=2).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit());
    if !short(a) || !short(b) || year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((a.parse().ok()?, b.parse().ok()?, year.parse().ok()?))
}

// =============================================================================
// Validation
// =============================================================================

/// Validates one row under `mapping`. `today` is the reference date for
/// the future-date check; it is never read from the clock here.
///
/// When a required field has no column the row short-circuits to an error
/// carrying one message per missing field, and no field is parsed.
pub fn validate_row(
    row: &RawRow,
    mapping: &ColumnMapping,
    row_index: usize,
    today: NaiveDate,
) -> ImportRecord {
    let mut record = ImportRecord::new(row_index);

    let missing = mapping.missing_required();
    if !missing.is_empty() {
        for field in missing {
            record.push_error(required_column_message(field.as_str()));
        }
        return record;
    }

    // A mapped column missing from this row reads as an empty cell.
    let cell = |field: CanonicalField| mapping.header_for(field).map(|h| row.get(h).unwrap_or(""));

    record.symbol = normalize_symbol(cell(CanonicalField::Symbol).unwrap_or(""));
    if !is_valid_symbol(&record.symbol) {
        record.push_error(MSG_INVALID_SYMBOL);
    }

    match cell(CanonicalField::Shares).and_then(parse_quantity) {
        Some(shares) if shares > Decimal::ZERO => record.shares = Some(shares),
        _ => record.push_error(MSG_INVALID_SHARES),
    }

    match cell(CanonicalField::CostBasis).and_then(parse_amount) {
        Some(cost) if cost > Decimal::ZERO => record.cost_basis = Some(cost),
        _ => record.push_error(MSG_INVALID_COST_BASIS),
    }

    match cell(CanonicalField::PurchaseDate).and_then(parse_date) {
        Some(date) if date <= today => record.purchase_date = Some(date),
        _ => record.push_error(MSG_INVALID_PURCHASE_DATE),
    }

    if let Some(raw) = cell(CanonicalField::CurrentPrice).filter(|v| !v.trim().is_empty()) {
        match parse_amount(raw) {
            Some(price) if price > Decimal::ZERO => record.current_price = Some(price),
            _ => record.push_warning(MSG_CURRENT_PRICE_IGNORED),
        }
    }

    record.sector = cell(CanonicalField::Sector)
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string);

    record.notes = cell(CanonicalField::Notes)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    record
}

/// Flags `record` as a duplicate if an earlier row already holds its symbol.
/// Error records are left untouched.
pub(crate) fn check_duplicate<'a, I>(record: &mut ImportRecord, earlier_symbols: I)
where
    I: IntoIterator<Item = &'a str>,
{
    if record.is_error() || record.symbol.is_empty() {
        return;
    }
    let symbol = record.symbol.to_uppercase();
    if earlier_symbols
        .into_iter()
        .any(|s| !s.is_empty() && s.to_uppercase() == symbol)
    {
        record.push_warning(MSG_DUPLICATE_SYMBOL);
    }
}

/// Validates every row in order and applies duplicate detection.
///
/// Always returns exactly one record per row, in row order.
pub fn validate_rows(
    rows: &[RawRow],
    mapping: &ColumnMapping,
    today: NaiveDate,
) -> Vec<ImportRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let records: Vec<ImportRecord> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut record = validate_row(row, mapping, idx, today);
            let symbol = record.symbol.to_uppercase();
            if !record.is_error() && !symbol.is_empty() && seen.contains(&symbol) {
                record.push_warning(MSG_DUPLICATE_SYMBOL);
            }
            if !symbol.is_empty() {
                seen.insert(symbol);
            }
            record
        })
        .collect();

    debug!("Validated {} rows", records.len());
    records
}
