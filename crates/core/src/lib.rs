//! Income Clarity Core - portfolio import pipeline and domain types.
//!
//! This crate turns raw portfolio text (CSV uploads, pasted spreadsheet
//! cells, JSON and broker exports) into validated holdings. It performs no
//! I/O and holds no state; callers inject the reference date and the
//! warning policy.

pub mod constants;
pub mod errors;
pub mod import;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
