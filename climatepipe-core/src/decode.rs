//! Payload decoding: text-encoding fallback and CSV parsing.

use crate::error::PipelineError;
use crate::table::{Table, Value};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Encodings tried in order when decoding a payload.
///
/// Windows-1252 assigns every byte, so it is the terminal fallback; a payload
/// that still reports decode errors there is not text at all.
const ENCODINGS: [&Encoding; 2] = [UTF_8, WINDOWS_1252];

/// Decode raw bytes into text, trying each configured encoding in order.
pub fn decode_text(bytes: &[u8], name: &str) -> Result<String, PipelineError> {
    for encoding in ENCODINGS {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
    }
    Err(PipelineError::Decode {
        name: name.to_string(),
        reason: "no configured encoding decodes the payload".to_string(),
    })
}

/// Parse decoded text as comma-separated values with a header row.
///
/// Ragged data lines are tolerated (short rows are padded with Null); a
/// structurally unreadable payload is a decode failure.
pub fn parse_csv(text: &str, name: &str) -> Result<Table, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::Decode {
            name: name.to_string(),
            reason: format!("header row: {e}"),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        table.push_row(record.iter().map(Value::parse).collect());
    }

    Ok(table)
}
