//! Parsing of ripgrep's `--json` output, one record per line.
use super::SearchMatch;
use crate::error::{Result, RfscopeError};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MatchData {
    path: TextField,
    line_number: Option<usize>,
    lines: TextField,
    #[serde(default)]
    submatches: Vec<Submatch>,
}

/// ripgrep emits `{"text": ...}` for UTF-8 data and `{"bytes": ...}`
/// (base64) otherwise; only the text form is usable here.
#[derive(Debug, Deserialize)]
struct TextField {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Submatch {
    start: usize,
}

/// Parses one output line. `Ok(None)` for records that are not matches.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<SearchMatch>> {
    let malformed = |reason: String| RfscopeError::MalformedRecord {
        line: line_no,
        reason,
    };

    let record: RawRecord = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
    if record.kind != "match" {
        return Ok(None);
    }

    let data: MatchData =
        serde_json::from_value(record.data).map_err(|e| malformed(e.to_string()))?;
    let path = data
        .path
        .text
        .ok_or_else(|| malformed("path is not valid UTF-8".to_string()))?;
    let text = data
        .lines
        .text
        .ok_or_else(|| malformed("line is not valid UTF-8".to_string()))?;
    let line_number = data
        .line_number
        .ok_or_else(|| malformed("missing line_number".to_string()))?;
    let start = data.submatches.first().map(|s| s.start).unwrap_or(0);

    let text = text.trim_end_matches(['\n', '\r']).to_string();
    let column = char_column(&text, start);
    Ok(Some(SearchMatch::raw(
        PathBuf::from(path),
        line_number,
        column,
        text,
    )))
}

/// 1-based char column of a byte offset. Offsets past the end or inside a
/// multi-byte char are clamped to the preceding boundary.
pub fn char_column(line: &str, byte_offset: usize) -> usize {
    let mut offset = byte_offset.min(line.len());
    while !line.is_char_boundary(offset) {
        offset -= 1;
    }
    line[..offset].chars().count() + 1
}
