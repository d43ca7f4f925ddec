//! Core types for the salesboard pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw cells and tables from the loader, unit-tagged measurements from
//! the normalizer, and the records the encoder writes out.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single spreadsheet cell, detached from the workbook backend
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Dates, durations and anything else that is neither text nor a number
    Other(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell the way it would read in the sheet.
    ///
    /// Integral numbers are rendered without a fractional part, so an
    /// employee code stored as `123.0` reads as `"123"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Other(s) => Some(s.clone()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One sheet after header detection: named columns plus ordered data rows
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable {
    /// Sheet the table was read from
    pub sheet_name: String,
    /// Column names, one per physical column (blank names are kept as "")
    pub headers: Vec<String>,
    /// Data rows, each padded to `headers.len()`
    pub rows: Vec<TableRow>,
}

/// A data row with its physical (1-based) row number in the source sheet
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub source_row: usize,
    pub cells: Vec<CellValue>,
}

impl SalesTable {
    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Names of all non-blank columns, in sheet order
    pub fn column_names(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|h| !h.is_empty())
            .cloned()
            .collect()
    }

    /// Metric columns: every named column after the two identity columns
    pub fn metric_columns(&self) -> Vec<(usize, String)> {
        self.headers
            .iter()
            .enumerate()
            .skip(2)
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| (i, h.clone()))
            .collect()
    }
}

impl TableRow {
    pub fn cell(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&CellValue::Empty)
    }
}

/// Measurement category of a metric column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Percentage,
    Count,
    Currency,
    Unclassified,
}

/// Numeric payload of a measurement; counts serialize as JSON integers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Int(i) => *i as f64,
            MetricValue::Float(f) => *f,
        }
    }
}

/// A unit-tagged value for one metric of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub value: MetricValue,
    pub label: String,
    pub unit: String,
}

/// Metrics keyed by column name, kept in source column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap(Vec<(String, Measurement)>);

impl MetricMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the measurement for `column`
    pub fn insert(&mut self, column: String, measurement: Measurement) {
        match self.0.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = measurement,
            None => self.0.push((column, measurement)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Measurement> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, m)| m)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Measurement)> {
        self.0.iter().map(|(name, m)| (name.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for MetricMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, measurement) in &self.0 {
            map.serialize_entry(name, measurement)?;
        }
        map.end()
    }
}

/// One dashboard card: either a seller or the store summary (id 0)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub id: u32,
    pub name: String,
    pub position: String,
    pub initials: String,
    pub gradient: String,
    pub metrics: MetricMap,
}

/// The emitted document: store summary first, then sellers in sheet order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SalesReport {
    pub records: Vec<SalesRecord>,
}

impl SalesReport {
    pub fn store_total(&self) -> Option<&SalesRecord> {
        self.records.first()
    }

    pub fn sellers(&self) -> &[SalesRecord] {
        self.records.get(1..).unwrap_or(&[])
    }
}
