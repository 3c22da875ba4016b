//! Line-delimited JSON record reading.
//!
//! Transcripts are read leniently: blank lines, lines that fail to decode and
//! non-object values are skipped, so one corrupt line never hides the rest of
//! a session.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Iterator over the object records of a JSONL stream.
pub struct JsonlRecords<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> JsonlRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonlRecords<R> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Failed to read JSONL line {}: {}", self.line_no + 1, e);
                    return None;
                }
            }
            self.line_no += 1;

            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value @ Value::Object(_)) => return Some(value),
                Ok(_) => {
                    tracing::debug!("Skipping non-object JSONL line {}", self.line_no);
                }
                Err(e) => {
                    tracing::debug!("Skipping unparseable JSONL line {}: {}", self.line_no, e);
                }
            }
        }
    }
}

pub fn read_records<R: BufRead>(reader: R) -> JsonlRecords<R> {
    JsonlRecords::new(reader)
}

/// Open a transcript file for record iteration.
pub fn open_records(path: &Path) -> Result<JsonlRecords<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(JsonlRecords::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Cursor, Write};

    #[test]
    fn test_skips_blank_malformed_and_non_objects() {
        let input = "{\"a\":1}\n\n   \nnot json\n[1,2]\n\"str\"\n{\"b\":2}";
        let records: Vec<Value> = read_records(Cursor::new(input)).collect();
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_crlf_and_invalid_utf8() {
        let mut input = b"{\"a\":1}\r\n".to_vec();
        input.extend_from_slice(b"{\"t\":\"\xff\"}\n");
        let records: Vec<Value> = read_records(Cursor::new(input)).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["t"], json!("\u{FFFD}"));
    }

    #[test]
    fn test_open_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"type\":\"user\"}}").unwrap();
        writeln!(file, "{{broken").unwrap();
        let records: Vec<Value> = open_records(file.path()).unwrap().collect();
        assert_eq!(records, vec![json!({"type": "user"})]);
    }

    #[test]
    fn test_open_missing_file_names_path() {
        let err = open_records(Path::new("/nonexistent/session.jsonl"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/session.jsonl"));
    }
}
