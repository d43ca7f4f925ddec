//! Report encoding
//!
//! Assembles the final record list (store summary first) and serializes it as
//! the dashboard's JSON feed: a pretty-printed array with non-ASCII text kept
//! literal. Also encodes a raw sheet dump for inspecting source files.

use crate::error::ReportError;
use crate::types::{CellValue, SalesRecord, SalesReport, SalesTable};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Encoder for the dashboard feed
#[derive(Debug, Default)]
pub struct ReportEncoder;

impl ReportEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Put the store record in front of the sellers
    pub fn assemble(&self, store: SalesRecord, sellers: Vec<SalesRecord>) -> SalesReport {
        let mut records = Vec::with_capacity(sellers.len() + 1);
        records.push(store);
        records.extend(sellers);
        SalesReport { records }
    }

    /// Encode a report to pretty JSON
    pub fn encode_to_json(&self, report: &SalesReport) -> Result<String, ReportError> {
        serde_json::to_string_pretty(report).map_err(ReportError::Json)
    }

    /// Write encoded JSON to `path`, replacing any previous content.
    ///
    /// The JSON is staged in a temporary file next to `path` and renamed over
    /// it, so readers see either the old feed or the new one.
    pub fn write(&self, path: &Path, json: &str) -> Result<(), ReportError> {
        let write_error = |source: io::Error| ReportError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(json.as_bytes()).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        if let Ok(previous) = fs::metadata(path) {
            staged
                .as_file()
                .set_permissions(previous.permissions())
                .map_err(write_error)?;
        }
        staged.persist(path).map_err(|e| write_error(e.error))?;
        info!(path = %path.display(), bytes = json.len(), "report written");
        Ok(())
    }
}

/// Encode a table as an array of `{column: value}` objects
pub fn encode_raw_rows(table: &SalesTable) -> Value {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (i, header) in table.headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                object.insert(header.clone(), cell_to_json(row.cell(i)));
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Empty => Value::Null,
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Text(s) | CellValue::Other(s) => Value::String(s.clone()),
        CellValue::Bool(b) => Value::Bool(*b),
    }
}
