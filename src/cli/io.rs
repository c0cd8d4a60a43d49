//! JSON I/O handling for CLI
//!
//! - Input: at most one JSON document on stdin
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read a JSON request from stdin; fails on empty input.
pub fn read_request() -> CliResult<Value> {
    read_optional_request()?.ok_or_else(|| CliError::bad_request("Empty input"))
}

/// Read a JSON request from stdin; empty input is `None`.
pub fn read_optional_request() -> CliResult<Option<Value>> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_request(&input)
}

pub(crate) fn parse_request(input: &str) -> CliResult<Option<Value>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(input)?))
}

/// Builds a success envelope
pub fn ok_envelope(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

/// Builds an error envelope; `details` is omitted when `None`.
pub fn error_envelope(code: &str, message: &str, details: Option<Value>) -> Value {
    let mut response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    if let (Some(details), Some(obj)) = (details, response.as_object_mut()) {
        obj.insert("details".to_string(), details);
    }
    response
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&ok_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&error_envelope(code, message, None))
}

/// Write an error response carrying structured details
pub fn write_error_with_details(code: &str, message: &str, details: Value) -> CliResult<()> {
    write_line(&error_envelope(code, message, Some(details)))
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request() {
        assert_eq!(parse_request("  \n").unwrap(), None);
        assert_eq!(parse_request("{\"a\":1}").unwrap(), Some(json!({"a": 1})));
        assert!(parse_request("{").is_err());
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(
            ok_envelope(json!([1])),
            json!({"status": "ok", "data": [1]})
        );
        assert_eq!(
            error_envelope("X", "bad", None),
            json!({"status": "error", "code": "X", "message": "bad"})
        );
        assert_eq!(
            error_envelope("X", "bad", Some(json!({"f": 1})))["details"],
            json!({"f": 1})
        );
    }
}
