//! Portfolio import domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::brokers::Broker;
use super::import_constants::{
    CONFIDENCE_EXACT, CONFIDENCE_NONE, DEFAULT_MAX_IMPORT_BYTES, DEFAULT_MAX_IMPORT_ROWS,
};
use super::import_errors::ImportError;

// =============================================================================
// Canonical fields
// =============================================================================

/// A holding attribute the import pipeline understands.
///
/// Declaration order is the canonical order: the column mapper assigns
/// fields in this order and messages about missing fields follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Symbol,
    Shares,
    CostBasis,
    PurchaseDate,
    CurrentPrice,
    Sector,
    Notes,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::Symbol,
        CanonicalField::Shares,
        CanonicalField::CostBasis,
        CanonicalField::PurchaseDate,
        CanonicalField::CurrentPrice,
        CanonicalField::Sector,
        CanonicalField::Notes,
    ];

    pub const REQUIRED: [CanonicalField; 4] = [
        CanonicalField::Symbol,
        CanonicalField::Shares,
        CanonicalField::CostBasis,
        CanonicalField::PurchaseDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Symbol => "symbol",
            CanonicalField::Shares => "shares",
            CanonicalField::CostBasis => "costBasis",
            CanonicalField::PurchaseDate => "purchaseDate",
            CanonicalField::CurrentPrice => "currentPrice",
            CanonicalField::Sector => "sector",
            CanonicalField::Notes => "notes",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalField::ALL
            .iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown canonical field: {}", s))
    }
}

// =============================================================================
// Raw rows
// =============================================================================

/// One row of import input: column header to raw cell text, in column order.
///
/// Serialized as a JSON object whose key order follows the column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(header, value)` pairs. Later duplicates of a
    /// header replace the earlier value but keep its position.
    pub fn from_pairs<I, H, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (H, V)>,
        H: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (header, value) in pairs {
            row.insert(header, value);
        }
        row
    }

    /// Returns the raw value of a column, if the row has it.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns true if every cell is blank after trimming.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

impl Serialize for RawRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawRowVisitor;

        impl<'de> Visitor<'de> for RawRowVisitor {
            type Value = RawRow;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping column headers to cell text")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut row = RawRow::new();
                while let Some((header, value)) = access.next_entry::<String, String>()? {
                    row.insert(header, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RawRowVisitor)
    }
}

/// A structural problem the source reader found on one data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWarning {
    /// 0-based index into the data rows (header excluded).
    pub row_index: usize,
    pub message: String,
}

/// Output of the source reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRows {
    /// Column headers in input order.
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub warnings: Vec<RowWarning>,
}

impl SourceRows {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Reader output together with the broker the rows were read as, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    pub source: SourceRows,
    pub detected_broker: Option<Broker>,
}

// =============================================================================
// Column mapping
// =============================================================================

/// The source column chosen for one canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub header: String,
    /// 1.0 for exact or manual matches, 0.6 for substring matches.
    pub confidence: f64,
}

/// Resolved correspondence between canonical fields and source columns.
///
/// Each header supplies at most one field. Unmapped fields are simply
/// absent from `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    /// Headers available for assignment.
    pub headers: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<CanonicalField, FieldMapping>,
}

impl ColumnMapping {
    /// Creates an empty mapping over the given headers.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&FieldMapping> {
        self.fields.get(&field)
    }

    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(|m| m.header.as_str())
    }

    pub fn confidence(&self, field: CanonicalField) -> f64 {
        self.fields
            .get(&field)
            .map(|m| m.confidence)
            .unwrap_or(CONFIDENCE_NONE)
    }

    /// Returns the field currently supplied by `header`, if any.
    pub fn field_for_header(&self, header: &str) -> Option<CanonicalField> {
        self.fields
            .iter()
            .find(|(_, m)| m.header == header)
            .map(|(field, _)| *field)
    }

    /// Records a heuristic match. Used by the column mapper, which has
    /// already excluded headers taken by other fields.
    pub(crate) fn set(&mut self, field: CanonicalField, header: &str, confidence: f64) {
        self.fields.insert(
            field,
            FieldMapping {
                header: header.to_string(),
                confidence,
            },
        );
    }

    /// Manually assigns `header` to `field`, or unmaps the field with `None`.
    ///
    /// A header already used by another field is taken away from that field.
    pub fn assign(
        &mut self,
        field: CanonicalField,
        header: Option<&str>,
    ) -> Result<(), ImportError> {
        let Some(header) = header else {
            self.fields.remove(&field);
            return Ok(());
        };

        if !self.headers.iter().any(|h| h == header) {
            return Err(ImportError::UnknownColumn(header.to_string()));
        }

        if let Some(previous) = self.field_for_header(header) {
            self.fields.remove(&previous);
        }
        self.set(field, header, CONFIDENCE_EXACT);
        Ok(())
    }

    /// Required fields without a column, in canonical order.
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        CanonicalField::REQUIRED
            .iter()
            .filter(|field| !self.fields.contains_key(field))
            .copied()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }
}

// =============================================================================
// Records
// =============================================================================

/// Outcome of validating one row. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Valid,
    Warning,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Valid => "valid",
            RecordStatus::Warning => "warning",
            RecordStatus::Error => "error",
        }
    }

    /// Raises the status to `other` if it is more severe. Never lowers it.
    pub fn escalate(&mut self, other: RecordStatus) {
        if other > *self {
            *self = other;
        }
    }
}

/// A validated (or rejected) candidate holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// 0-based position of the source row within the session.
    pub row_index: usize,
    /// Trimmed, uppercased symbol text. Kept even when invalid so the
    /// preview can show what was read.
    pub symbol: String,
    pub shares: Option<Decimal>,
    pub cost_basis: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub current_price: Option<Decimal>,
    pub sector: Option<String>,
    pub notes: Option<String>,
    pub status: RecordStatus,
    pub messages: Vec<String>,
}

impl ImportRecord {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            symbol: String::new(),
            shares: None,
            cost_basis: None,
            purchase_date: None,
            current_price: None,
            sector: None,
            notes: None,
            status: RecordStatus::Valid,
            messages: Vec::new(),
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.status.escalate(RecordStatus::Error);
        self.messages.push(message.into());
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.status.escalate(RecordStatus::Warning);
        self.messages.push(message.into());
    }

    pub fn is_error(&self) -> bool {
        self.status == RecordStatus::Error
    }

    /// Converts to the canonical holding shape. Error records, and records
    /// missing a required value, have no holding form.
    pub fn to_holding(&self) -> Option<HoldingInput> {
        if self.is_error() {
            return None;
        }
        Some(HoldingInput {
            symbol: self.symbol.clone(),
            shares: self.shares?,
            cost_basis: self.cost_basis?,
            purchase_date: self.purchase_date?,
            current_price: self.current_price,
            sector: self.sector.clone(),
            notes: self.notes.clone(),
        })
    }
}

/// Canonical holding object handed to the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingInput {
    pub symbol: String,
    pub shares: Decimal,
    pub cost_basis: Decimal,
    /// Serialized as an ISO-8601 date (`YYYY-MM-DD`).
    pub purchase_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// Session
// =============================================================================

/// How the raw input reached the pipeline.
///
/// String form: `csv`, `paste`, `json`, `broker` (auto-detect) or
/// `broker:<name>` (explicit hint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImportMethod {
    Csv,
    Paste,
    Json,
    Broker(Option<Broker>),
}

impl fmt::Display for ImportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMethod::Csv => f.write_str("csv"),
            ImportMethod::Paste => f.write_str("paste"),
            ImportMethod::Json => f.write_str("json"),
            ImportMethod::Broker(None) => f.write_str("broker"),
            ImportMethod::Broker(Some(broker)) => write!(f, "broker:{}", broker.id()),
        }
    }
}

impl FromStr for ImportMethod {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "csv" => return Ok(ImportMethod::Csv),
            "paste" => return Ok(ImportMethod::Paste),
            "json" => return Ok(ImportMethod::Json),
            "broker" => return Ok(ImportMethod::Broker(None)),
            _ => {}
        }
        match s.split_once(':') {
            Some((prefix, name)) if prefix.eq_ignore_ascii_case("broker") => {
                Ok(ImportMethod::Broker(Some(name.parse()?)))
            }
            _ => Err(ImportError::UnexpectedShape(format!(
                "Unknown import method: {}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ImportMethod {
    type Error = ImportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImportMethod> for String {
    fn from(method: ImportMethod) -> Self {
        method.to_string()
    }
}

/// Summary counts for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub records_with_errors: usize,
    pub records_with_warnings: usize,
}

impl ImportSummary {
    pub fn from_records(records: &[ImportRecord]) -> Self {
        records.iter().fold(
            ImportSummary {
                total_records: records.len(),
                ..Default::default()
            },
            |mut acc, record| {
                match record.status {
                    RecordStatus::Valid => acc.valid_records += 1,
                    RecordStatus::Warning => acc.records_with_warnings += 1,
                    RecordStatus::Error => acc.records_with_errors += 1,
                }
                acc
            },
        )
    }
}

/// Preview filter over record statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Valid,
    Warning,
    Error,
}

impl StatusFilter {
    pub fn matches(&self, status: RecordStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Valid => status == RecordStatus::Valid,
            StatusFilter::Warning => status == RecordStatus::Warning,
            StatusFilter::Error => status == RecordStatus::Error,
        }
    }
}

/// Full state of one import attempt. Sessions are values: every edit
/// produces a new session through `ImportService`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSession {
    pub method: ImportMethod,
    pub raw_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_broker: Option<Broker>,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub read_warnings: Vec<RowWarning>,
    pub mapping: ColumnMapping,
    pub records: Vec<ImportRecord>,
    pub summary: ImportSummary,
    /// Date the future-date check was evaluated against.
    pub reference_date: NaiveDate,
}

impl ImportSession {
    pub fn records_with_status(&self, filter: StatusFilter) -> Vec<&ImportRecord> {
        self.records
            .iter()
            .filter(|record| filter.matches(record.status))
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.summary.records_with_errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.summary.records_with_warnings > 0
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// What to do with `warning` records when forwarding a session for commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Forward warning records alongside valid ones.
    #[default]
    Allow,
    /// Forward only valid records.
    Skip,
    /// Refuse to forward anything while a warning record remains.
    Block,
}

impl FromStr for WarningPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(WarningPolicy::Allow),
            "skip" => Ok(WarningPolicy::Skip),
            "block" => Ok(WarningPolicy::Block),
            other => Err(format!("Unknown warning policy: {}", other)),
        }
    }
}

/// Limits and policies for the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub max_rows: usize,
    pub max_bytes: usize,
    pub warning_policy: WarningPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_IMPORT_ROWS,
            max_bytes: DEFAULT_MAX_IMPORT_BYTES,
            warning_policy: WarningPolicy::default(),
        }
    }
}
