//! Row normalization
//!
//! Turns each data row of a `SalesTable` into a seller record:
//! - identity fields (name, position, initials) extracted and cleaned
//! - every metric cell parsed into a number, with unparsable cells counted as 0
//! - each number tagged with the unit and rounding of its column category

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::types::{
    CellValue, Measurement, MetricKind, MetricMap, MetricValue, SalesRecord, SalesTable, TableRow,
};
use tracing::{debug, warn};

/// Result of reading a cell as a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedNumber {
    /// Parsed value, 0.0 when the cell could not be read
    pub value: f64,
    /// False when a non-empty cell had to be replaced by 0.0
    pub ok: bool,
    /// The cell was text carrying an explicit "%" marker
    pub percent_marked: bool,
}

impl ParsedNumber {
    fn valid(value: f64) -> Self {
        Self {
            value,
            ok: true,
            percent_marked: false,
        }
    }

    fn failed() -> Self {
        Self {
            value: 0.0,
            ok: false,
            percent_marked: false,
        }
    }
}

/// Read any cell as a finite number. Never fails.
///
/// Empty cells are 0.0. Text has a trailing "%" stripped, spaces removed and a
/// decimal comma turned into a point before parsing.
pub fn normalize_number(cell: &CellValue) -> ParsedNumber {
    match cell {
        CellValue::Empty => ParsedNumber::valid(0.0),
        CellValue::Number(n) if n.is_finite() => ParsedNumber::valid(*n),
        CellValue::Number(_) => ParsedNumber::failed(),
        CellValue::Text(s) => parse_text_number(s),
        CellValue::Bool(_) | CellValue::Other(_) => ParsedNumber::failed(),
    }
}

fn parse_text_number(raw: &str) -> ParsedNumber {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedNumber::valid(0.0);
    }

    let (body, percent_marked) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => ParsedNumber {
            value,
            ok: true,
            percent_marked,
        },
        _ => ParsedNumber::failed(),
    }
}

/// Round half away from zero to two decimal places.
///
/// Values too large to scale are already whole and come back unchanged.
/// Negative zero comes back as 0.0.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    let rounded = if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        value
    };
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Two uppercase letters from the first two words of a name, or the first
/// letter of a single-word name
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let letters: Vec<char> = if words.len() >= 2 {
        words.iter().take(2).filter_map(|w| w.chars().next()).collect()
    } else {
        name.trim().chars().take(1).collect()
    };
    letters.iter().flat_map(|c| c.to_uppercase()).collect()
}

/// Build the measurement for one metric value of the given category
pub fn to_measurement(
    config: &ReportConfig,
    column: &str,
    kind: MetricKind,
    parsed: ParsedNumber,
) -> Measurement {
    let value = match kind {
        MetricKind::Percentage => {
            // bare values in [-1, 1] are fractions of one
            let pct = if parsed.percent_marked || parsed.value.abs() > 1.0 {
                parsed.value
            } else {
                parsed.value * 100.0
            };
            MetricValue::Float(round2(pct))
        }
        MetricKind::Count => MetricValue::Int(parsed.value.trunc() as i64),
        MetricKind::Currency | MetricKind::Unclassified => MetricValue::Float(round2(parsed.value)),
    };

    Measurement {
        value,
        label: column.to_string(),
        unit: config.classification.unit_for(kind).to_string(),
    }
}

/// A metric cell that had to be replaced by 0.0
#[derive(Debug, Clone, PartialEq)]
pub struct CellParseFailure {
    /// 1-based physical row in the sheet
    pub row: usize,
    pub column: String,
    pub raw: String,
}

/// Output of the normalization stage
#[derive(Debug, Clone, Default)]
pub struct NormalizedRows {
    /// Seller records in sheet order, ids starting at 1
    pub records: Vec<SalesRecord>,
    /// Metric columns in sheet order
    pub metric_columns: Vec<String>,
    /// Physical rows dropped for a blank or sentinel name
    pub skipped_rows: Vec<usize>,
    pub cell_failures: Vec<CellParseFailure>,
}

/// Normalizer converting table rows into seller records
pub struct RowNormalizer<'a> {
    config: &'a ReportConfig,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// Normalize every data row of the table
    pub fn normalize(&self, table: &SalesTable) -> Result<NormalizedRows, ReportError> {
        let (name_idx, position_idx) = match (
            table.column_index(&self.config.name_column),
            table.column_index(&self.config.position_column),
        ) {
            (Some(n), Some(p)) => (n, p),
            (n, p) => {
                let mut missing = Vec::new();
                if n.is_none() {
                    missing.push(self.config.name_column.clone());
                }
                if p.is_none() {
                    missing.push(self.config.position_column.clone());
                }
                return Err(ReportError::SchemaMismatch {
                    missing,
                    discovered: table.column_names(),
                });
            }
        };

        let metric_columns = table.metric_columns();
        let mut out = NormalizedRows {
            metric_columns: metric_columns.iter().map(|(_, c)| c.clone()).collect(),
            ..Default::default()
        };

        for row in &table.rows {
            let name = row
                .cell(name_idx)
                .as_text()
                .map(|t| t.trim().to_string())
                .unwrap_or_default();

            if self.config.is_missing_name(&name) {
                debug!(row = row.source_row, "skipping row without seller name");
                out.skipped_rows.push(row.source_row);
                continue;
            }

            let id = out.records.len() as u32 + 1;
            let position = self.position(row.cell(position_idx));
            let metrics = self.metrics(row, &metric_columns, &mut out.cell_failures);

            out.records.push(SalesRecord {
                id,
                initials: initials(&name),
                name,
                position,
                gradient: self.gradient(id),
                metrics,
            });
        }

        Ok(out)
    }

    fn position(&self, cell: &CellValue) -> String {
        cell.as_text()
            .map(|t| t.trim().to_string())
            .filter(|t| !self.config.is_missing_name(t))
            .unwrap_or_else(|| self.config.fallback_position.clone())
    }

    fn metrics(
        &self,
        row: &TableRow,
        columns: &[(usize, String)],
        failures: &mut Vec<CellParseFailure>,
    ) -> MetricMap {
        let mut metrics = MetricMap::new();

        for (idx, column) in columns {
            let cell = row.cell(*idx);
            let parsed = normalize_number(cell);
            if !parsed.ok {
                let raw = cell.as_text().unwrap_or_default();
                warn!(row = row.source_row, column = %column, raw = %raw, "unreadable number, using 0");
                failures.push(CellParseFailure {
                    row: row.source_row,
                    column: column.clone(),
                    raw,
                });
            }

            let kind = self.config.classification.kind_of(column);
            metrics.insert(
                column.clone(),
                to_measurement(self.config, column, kind, parsed),
            );
        }

        metrics
    }

    /// Palette entry for a seller id (ids start at 1)
    fn gradient(&self, id: u32) -> String {
        let palette = &self.config.palette;
        if palette.is_empty() {
            return String::new();
        }
        palette[(id as usize - 1) % palette.len()].clone()
    }
}
