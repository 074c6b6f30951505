use thiserror::Error;

/// Errors that abort an import step as a whole.
///
/// Row-level problems are never reported through this type; they are
/// carried as statuses and messages on each `ImportRecord`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// No header row could be found in the input.
    #[error("Import input is empty or has no header row")]
    EmptyInput,

    /// The input was declared as JSON but could not be parsed.
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// The JSON parsed but is not an array of holdings or a `portfolio` object.
    #[error("Unexpected JSON shape: {0}")]
    UnexpectedShape(String),

    /// A broker hint did not name a supported broker.
    #[error("Unknown broker: {0}")]
    UnknownBroker(String),

    #[error("Input is {size} bytes, the limit is {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Input has {count} rows, the limit is {limit} rows")]
    TooManyRows { count: usize, limit: usize },

    /// A mapping override referenced a header that is not in the input.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Row {index} is out of range for a session with {len} rows")]
    RowOutOfRange { index: usize, len: usize },

    /// The commit policy refuses to forward records that still carry warnings.
    #[error("{0} record(s) have warnings that must be acknowledged before commit")]
    UnacknowledgedWarnings(usize),
}

impl ImportError {
    /// Returns true for errors caused by the shape of the raw input text.
    pub fn is_input_shape(&self) -> bool {
        matches!(
            self,
            ImportError::EmptyInput
                | ImportError::MalformedJson(_)
                | ImportError::UnexpectedShape(_)
        )
    }
}
