//! Header-name heuristics for mapping input columns to canonical fields.

use log::debug;

use super::import_constants::{CONFIDENCE_EXACT, CONFIDENCE_SUBSTRING};
use super::import_model::{CanonicalField, ColumnMapping};

// ============================================================================
// Header Detection Patterns (priority order, case-insensitive)
// ============================================================================

const SYMBOL_EXACT: &[&str] = &["symbol", "ticker", "ticker symbol", "stock symbol"];
const SYMBOL_SUBSTRING: &[&str] = &["symbol", "ticker", "instrument", "fund name"];

const SHARES_EXACT: &[&str] = &["shares", "quantity", "qty", "units"];
const SHARES_SUBSTRING: &[&str] = &["shares", "quantity", "qty", "share balance"];

const COST_BASIS_EXACT: &[&str] = &[
    "cost basis",
    "price",
    "average cost",
    "avg cost",
    "cost per share",
    "purchase price",
];
const COST_BASIS_SUBSTRING: &[&str] = &["cost", "price paid", "average price", "purchase price"];

const PURCHASE_DATE_EXACT: &[&str] = &["purchase date", "date", "date acquired", "trade date"];
const PURCHASE_DATE_SUBSTRING: &[&str] = &["date", "acquired"];

const CURRENT_PRICE_EXACT: &[&str] = &["current price", "last price", "market price"];
const CURRENT_PRICE_SUBSTRING: &[&str] = &["current price", "last price", "market price"];

const SECTOR_EXACT: &[&str] = &["sector", "industry"];
const SECTOR_SUBSTRING: &[&str] = &["sector", "industry"];

const NOTES_EXACT: &[&str] = &["notes", "note", "comment"];
const NOTES_SUBSTRING: &[&str] = &["note", "comment", "memo", "description"];

struct FieldPatterns {
    field: CanonicalField,
    exact: &'static [&'static str],
    substring: &'static [&'static str],
}

const FIELD_PATTERNS: &[FieldPatterns] = &[
    FieldPatterns {
        field: CanonicalField::Symbol,
        exact: SYMBOL_EXACT,
        substring: SYMBOL_SUBSTRING,
    },
    FieldPatterns {
        field: CanonicalField::Shares,
        exact: SHARES_EXACT,
        substring: SHARES_SUBSTRING,
    },
    FieldPatterns {
        field: CanonicalField::CostBasis,
        exact: COST_BASIS_EXACT,
        substring: COST_BASIS_SUBSTRING,
    },
    FieldPatterns {
        field: CanonicalField::PurchaseDate,
        exact: PURCHASE_DATE_EXACT,
        substring: PURCHASE_DATE_SUBSTRING,
    },
    FieldPatterns {
        field: CanonicalField::CurrentPrice,
        exact: CURRENT_PRICE_EXACT,
        substring: CURRENT_PRICE_SUBSTRING,
    },
    FieldPatterns {
        field: CanonicalField::Sector,
        exact: SECTOR_EXACT,
        substring: SECTOR_SUBSTRING,
    },
    FieldPatterns {
        field: CanonicalField::Notes,
        exact: NOTES_EXACT,
        substring: NOTES_SUBSTRING,
    },
];

/// Lowercase with spaces, underscores and other separators removed, so
/// `Cost Basis`, `cost_basis` and `costBasis` compare equal.
fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn exact_match(header: &str, pattern: &str) -> bool {
    header.trim().eq_ignore_ascii_case(pattern) || compact(header) == compact(pattern)
}

fn substring_match(header: &str, pattern: &str) -> bool {
    header.trim().to_lowercase().contains(pattern) || compact(header).contains(&compact(pattern))
}

/// Infers which header supplies each canonical field.
///
/// Fields are resolved in canonical order. For each field the exact patterns
/// are tried first, then the substring patterns, each in priority order; a
/// header taken by an earlier field is not considered again.
pub fn infer_mapping(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new(headers.to_vec());
    let mut used = vec![false; headers.len()];

    for patterns in FIELD_PATTERNS {
        let found = find_header(headers, &used, patterns.exact, exact_match)
            .map(|idx| (idx, CONFIDENCE_EXACT))
            .or_else(|| {
                find_header(headers, &used, patterns.substring, substring_match)
                    .map(|idx| (idx, CONFIDENCE_SUBSTRING))
            });

        if let Some((idx, confidence)) = found {
            used[idx] = true;
            mapping.set(patterns.field, &headers[idx], confidence);
        }
    }

    debug!(
        "Inferred column mapping for {} of {} fields; missing required: {:?}",
        mapping.fields.len(),
        CanonicalField::ALL.len(),
        mapping.missing_required()
    );
    mapping
}

fn find_header(
    headers: &[String],
    used: &[bool],
    patterns: &[&str],
    matches: fn(&str, &str) -> bool,
) -> Option<usize> {
    patterns.iter().find_map(|pattern| {
        headers
            .iter()
            .enumerate()
            .find(|(idx, header)| !used[*idx] && matches(header, pattern))
            .map(|(idx, _)| idx)
    })
}
