//! Record Codec
//!
//! Reader/writer for the comma-separated rows used by the active store
//! and resolved archive. Owns the quoting rules: fields containing a
//! comma or quote are double-quoted on write, embedded quotes are
//! doubled, and malformed rows come back as a typed parse error instead
//! of a crash.

use crate::{EngineError, Result};

/// Split one row into fields, honoring double-quoted fields.
pub fn split_record(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(EngineError::MalformedRecord(
                    "quote inside unquoted field".to_string(),
                ))
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(EngineError::MalformedRecord(
            "unterminated quoted field".to_string(),
        ));
    }
    fields.push(field);
    Ok(fields)
}

/// Join fields into one row, quoting where needed.
pub fn join_record(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| quote_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
