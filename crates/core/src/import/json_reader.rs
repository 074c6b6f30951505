//! JSON portfolio reading.
//!
//! Accepts either a top-level array of holding objects or an object with a
//! `portfolio` key holding such an array. Object keys become column headers
//! directly, in the order they appear.

use log::debug;
use serde_json::{Map, Value};

use super::import_errors::ImportError;
use super::import_model::{RawRow, SourceRows};

const PORTFOLIO_KEY: &str = "portfolio";

pub fn read_json(text: &str) -> Result<SourceRows, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ImportError::MalformedJson(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove(PORTFOLIO_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ImportError::UnexpectedShape(format!(
                    "\"{}\" must be an array, found {}",
                    PORTFOLIO_KEY,
                    kind_of(&other)
                )))
            }
            None => {
                return Err(ImportError::UnexpectedShape(format!(
                    "expected an array or an object with a \"{}\" array",
                    PORTFOLIO_KEY
                )))
            }
        },
        other => {
            return Err(ImportError::UnexpectedShape(format!(
                "expected an array or an object, found {}",
                kind_of(&other)
            )))
        }
    };

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(ImportError::UnexpectedShape(format!(
                "item {} is {}, expected an object",
                idx,
                kind_of(&item)
            )));
        };
        let row = row_from_object(object);
        for header in row.headers() {
            if !headers.iter().any(|h| h == header) {
                headers.push(header.to_string());
            }
        }
        rows.push(row);
    }

    debug!(
        "Read {} JSON holdings with {} distinct keys",
        rows.len(),
        headers.len()
    );

    Ok(SourceRows {
        headers,
        rows,
        warnings: Vec::new(),
    })
}

fn row_from_object(object: Map<String, Value>) -> RawRow {
    RawRow::from_pairs(
        object
            .into_iter()
            .map(|(key, value)| (key, cell_text(value))),
    )
}

/// Renders a JSON value as raw cell text.
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
