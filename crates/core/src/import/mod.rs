//! Import module - portfolio import pipeline: source readers, column mapper,
//! row validator and session operations.

mod brokers;
mod column_mapper;
mod csv_parser;
mod import_constants;
mod import_errors;
mod import_model;
mod import_service;
mod import_traits;
mod json_reader;
mod row_validator;

#[cfg(test)]
mod import_service_tests;


pub use brokers::{
    detect_broker, read_broker_export, read_broker_format, translate_headers, Broker,
};
pub use column_mapper::infer_mapping;
pub use csv_parser::{read_csv, read_pasted};
pub use import_constants::*;
pub use import_errors::ImportError;
pub use import_model::{
    CanonicalField, ColumnMapping, FieldMapping, HoldingInput, ImportConfig, ImportMethod,
    ImportRecord, ImportSession, ImportSummary, RawRow, ReadOutcome, RecordStatus, RowWarning,
    SourceRows, StatusFilter, WarningPolicy,
};
pub use import_service::{committable_holdings, validate_session, ImportService};
pub use import_traits::ImportServiceTrait;
pub use json_reader::read_json;
pub use row_validator::{
    is_valid_symbol, normalize_symbol, parse_amount, parse_date, parse_quantity, validate_row,
    validate_rows,
};
