use chrono::NaiveDate;

use super::import_model::*;
use crate::Result;

/// Trait defining the contract for the portfolio import pipeline.
///
/// Every operation is a pure transformation: sessions go in by value and
/// come back as new values, so an implementation holds no per-session state.
pub trait ImportServiceTrait: Send + Sync {
    fn config(&self) -> &ImportConfig;

    /// Turns raw text into rows using the reader for `method`.
    fn read_source(&self, method: ImportMethod, text: &str) -> Result<ReadOutcome>;

    fn infer_mapping(&self, headers: &[String]) -> ColumnMapping;

    /// Reads, maps and validates `text` in one step.
    fn start_session(
        &self,
        method: ImportMethod,
        text: &str,
        today: NaiveDate,
    ) -> Result<ImportSession>;

    /// Re-validates every row of `session` under a new mapping.
    fn remap(
        &self,
        session: ImportSession,
        mapping: ColumnMapping,
        today: NaiveDate,
    ) -> Result<ImportSession>;

    /// Replaces one row and re-validates only that row.
    fn revise_row(
        &self,
        session: ImportSession,
        row_index: usize,
        row: RawRow,
    ) -> Result<ImportSession>;

    /// Holdings to forward for commit. `error` records are never included;
    /// `policy` decides what happens to `warning` records.
    fn committable(
        &self,
        session: &ImportSession,
        policy: WarningPolicy,
    ) -> Result<Vec<HoldingInput>>;
}
