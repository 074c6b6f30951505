use chrono::NaiveDate;
use log::{debug, info};

use super::brokers::read_broker_export;
use super::column_mapper::infer_mapping;
use super::csv_parser::{read_csv, read_pasted};
use super::import_errors::ImportError;
use super::import_model::*;
use super::import_traits::ImportServiceTrait;
use super::json_reader::read_json;
use super::row_validator::{check_duplicate, validate_row, validate_rows};
use crate::Result;

/// Service running the portfolio import pipeline: read, map, validate.
#[derive(Debug, Clone, Default)]
pub struct ImportService {
    config: ImportConfig,
}

impl ImportService {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }
}

/// Validates `outcome` under `mapping` and assembles a session.
///
/// Records come out in row order, one per row, with the reader's row-shape
/// warnings attached to the rows they concern.
pub fn validate_session(
    method: ImportMethod,
    raw_input: String,
    outcome: ReadOutcome,
    mapping: ColumnMapping,
    today: NaiveDate,
) -> ImportSession {
    let ReadOutcome {
        source,
        detected_broker,
    } = outcome;
    let records = build_records(&source.rows, &source.warnings, &mapping, today);
    let summary = ImportSummary::from_records(&records);

    ImportSession {
        method,
        raw_input,
        detected_broker,
        headers: source.headers,
        rows: source.rows,
        read_warnings: source.warnings,
        mapping,
        records,
        summary,
        reference_date: today,
    }
}

fn build_records(
    rows: &[RawRow],
    read_warnings: &[RowWarning],
    mapping: &ColumnMapping,
    today: NaiveDate,
) -> Vec<ImportRecord> {
    let mut records = validate_rows(rows, mapping, today);
    for warning in read_warnings {
        if let Some(record) = records.get_mut(warning.row_index) {
            record.push_warning(warning.message.clone());
        }
    }
    records
}

/// Re-anchors a client-supplied mapping on the session headers.
///
/// Every assigned header must exist in `headers`. If two fields name the
/// same header the later field in canonical order keeps it.
fn resolve_mapping(
    headers: &[String],
    mapping: ColumnMapping,
) -> std::result::Result<ColumnMapping, ImportError> {
    let mut resolved = ColumnMapping::new(headers.to_vec());
    for (field, field_mapping) in mapping.fields {
        if !headers.iter().any(|h| *h == field_mapping.header) {
            return Err(ImportError::UnknownColumn(field_mapping.header));
        }
        if let Some(previous) = resolved.field_for_header(&field_mapping.header) {
            resolved.fields.remove(&previous);
        }
        resolved.set(field, &field_mapping.header, field_mapping.confidence);
    }
    Ok(resolved)
}

/// Selects the holdings to forward for commit under `policy`.
pub fn committable_holdings(
    session: &ImportSession,
    policy: WarningPolicy,
) -> std::result::Result<Vec<HoldingInput>, ImportError> {
    let warnings = session
        .records
        .iter()
        .filter(|r| r.status == RecordStatus::Warning)
        .count();
    if policy == WarningPolicy::Block && warnings > 0 {
        return Err(ImportError::UnacknowledgedWarnings(warnings));
    }

    Ok(session
        .records
        .iter()
        .filter(|r| match r.status {
            RecordStatus::Valid => true,
            RecordStatus::Warning => policy == WarningPolicy::Allow,
            RecordStatus::Error => false,
        })
        .filter_map(ImportRecord::to_holding)
        .collect())
}

impl ImportServiceTrait for ImportService {
    fn config(&self) -> &ImportConfig {
        &self.config
    }

    fn read_source(&self, method: ImportMethod, text: &str) -> Result<ReadOutcome> {
        if text.len() > self.config.max_bytes {
            return Err(ImportError::InputTooLarge {
                size: text.len(),
                limit: self.config.max_bytes,
            }
            .into());
        }

        let outcome = match method {
            ImportMethod::Csv => ReadOutcome {
                source: read_csv(text)?,
                detected_broker: None,
            },
            ImportMethod::Paste => ReadOutcome {
                source: read_pasted(text)?,
                detected_broker: None,
            },
            ImportMethod::Json => ReadOutcome {
                source: read_json(text)?,
                detected_broker: None,
            },
            ImportMethod::Broker(hint) => {
                let (source, detected_broker) = read_broker_export(text, hint)?;
                ReadOutcome {
                    source,
                    detected_broker,
                }
            }
        };

        if outcome.source.row_count() > self.config.max_rows {
            return Err(ImportError::TooManyRows {
                count: outcome.source.row_count(),
                limit: self.config.max_rows,
            }
            .into());
        }

        debug!(
            "Read {} rows ({} headers) via {}",
            outcome.source.row_count(),
            outcome.source.headers.len(),
            method
        );
        Ok(outcome)
    }

    fn infer_mapping(&self, headers: &[String]) -> ColumnMapping {
        infer_mapping(headers)
    }

    fn start_session(
        &self,
        method: ImportMethod,
        text: &str,
        today: NaiveDate,
    ) -> Result<ImportSession> {
        let outcome = self.read_source(method, text)?;
        let mapping = infer_mapping(&outcome.source.headers);
        let session = validate_session(method, text.to_string(), outcome, mapping, today);

        info!(
            "Import session via {}: {} records, {} valid, {} with warnings, {} with errors",
            method,
            session.summary.total_records,
            session.summary.valid_records,
            session.summary.records_with_warnings,
            session.summary.records_with_errors
        );
        Ok(session)
    }

    fn remap(
        &self,
        session: ImportSession,
        mapping: ColumnMapping,
        today: NaiveDate,
    ) -> Result<ImportSession> {
        let mapping = resolve_mapping(&session.headers, mapping)?;
        let records = build_records(&session.rows, &session.read_warnings, &mapping, today);
        let summary = ImportSummary::from_records(&records);
        debug!(
            "Remapped session: {} records, {} with errors",
            summary.total_records, summary.records_with_errors
        );

        Ok(ImportSession {
            mapping,
            records,
            summary,
            reference_date: today,
            ..session
        })
    }

    fn revise_row(
        &self,
        mut session: ImportSession,
        row_index: usize,
        row: RawRow,
    ) -> Result<ImportSession> {
        let len = session.rows.len().min(session.records.len());
        if row_index >= len {
            return Err(ImportError::RowOutOfRange {
                index: row_index,
                len,
            }
            .into());
        }

        let mut record = validate_row(&row, &session.mapping, row_index, session.reference_date);
        check_duplicate(
            &mut record,
            session.records[..row_index].iter().map(|r| r.symbol.as_str()),
        );
        debug!(
            "Revised row {}: {} -> {}",
            row_index,
            session.records[row_index].status.as_str(),
            record.status.as_str()
        );

        // The edited row replaces the reader's view of it, so its
        // row-shape warning no longer applies.
        session.read_warnings.retain(|w| w.row_index != row_index);
        session.rows[row_index] = row;
        session.records[row_index] = record;
        session.summary = ImportSummary::from_records(&session.records);
        Ok(session)
    }

    fn committable(
        &self,
        session: &ImportSession,
        policy: WarningPolicy,
    ) -> Result<Vec<HoldingInput>> {
        let holdings = committable_holdings(session, policy)?;
        debug!(
            "{} of {} records committable under {:?} policy",
            holdings.len(),
            session.records.len(),
            policy
        );
        Ok(holdings)
    }
}
