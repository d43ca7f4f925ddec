//! Spreadsheet loading
//!
//! Reads a workbook through calamine and turns one sheet into a `SalesTable`.
//! Rows above the configured header row are title/metadata, the header row
//! holds column names, and everything below it is data.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::types::{CellValue, SalesTable, TableRow};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Which sheet of the workbook to convert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SheetSelection {
    #[default]
    First,
    Named(String),
    Index(usize),
}

impl SheetSelection {
    pub fn from_name(name: Option<String>) -> Self {
        name.map(SheetSelection::Named).unwrap_or_default()
    }

    fn resolve(&self, names: &[String]) -> Result<String, ReportError> {
        let found = match self {
            SheetSelection::First => names.first().cloned(),
            SheetSelection::Named(name) => names.iter().find(|n| *n == name).cloned(),
            SheetSelection::Index(i) => names.get(*i).cloned(),
        };
        found.ok_or_else(|| ReportError::SheetNotFound {
            requested: self.describe(),
            available: names.to_vec(),
        })
    }

    fn describe(&self) -> String {
        match self {
            SheetSelection::First => "<first sheet>".to_string(),
            SheetSelection::Named(name) => name.clone(),
            SheetSelection::Index(i) => format!("#{i}"),
        }
    }
}

/// Every sheet of a workbook, read in multi-sheet mode
#[derive(Debug, Clone)]
pub struct Workbook {
    pub sheets: Vec<SalesTable>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.sheet_name.clone()).collect()
    }

    /// Pick the sheet to convert
    pub fn select(&self, selection: &SheetSelection) -> Result<&SalesTable, ReportError> {
        let name = selection.resolve(&self.sheet_names())?;
        self.sheets
            .iter()
            .find(|s| s.sheet_name == name)
            .ok_or_else(|| ReportError::SheetNotFound {
                requested: name,
                available: self.sheet_names(),
            })
    }
}

/// Loader for sales sheets with a fixed header-row convention
pub struct Loader {
    header_row: usize,
    required: Vec<String>,
}

impl Loader {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            header_row: config.header_row,
            required: config
                .required_columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// Load and validate a single sheet
    pub fn load(&self, path: &Path, selection: &SheetSelection) -> Result<SalesTable, ReportError> {
        ensure_exists(path)?;
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names();
        let sheet_name = selection.resolve(&names)?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let table = self.table_from_rows(&sheet_name, range_to_rows(&range))?;
        info!(
            sheet = %table.sheet_name,
            columns = table.headers.len(),
            rows = table.rows.len(),
            "loaded sheet"
        );
        Ok(table)
    }

    /// Read every sheet of the workbook; sheets without a header row are skipped
    pub fn load_all(&self, path: &Path) -> Result<Workbook, ReportError> {
        ensure_exists(path)?;
        let mut workbook = open_workbook_auto(path)?;
        let mut sheets = Vec::new();

        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            match build_table(&name, range_to_rows(&range), self.header_row) {
                Ok(table) => sheets.push(table),
                Err(ReportError::EmptySheet(_)) => {
                    debug!(sheet = %name, "skipping sheet without header row");
                }
                Err(e) => return Err(e),
            }
        }

        info!(sheets = sheets.len(), "loaded workbook");
        Ok(Workbook { sheets })
    }

    /// Build a table from raw rows and check the identity columns
    pub fn table_from_rows(
        &self,
        sheet_name: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<SalesTable, ReportError> {
        let table = build_table(sheet_name, rows, self.header_row)?;
        self.validate(&table)?;
        Ok(table)
    }

    /// Fail with the discovered column names when an identity column is absent
    pub fn validate(&self, table: &SalesTable) -> Result<(), ReportError> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|c| table.column_index(c).is_none())
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReportError::SchemaMismatch {
                missing,
                discovered: table.column_names(),
            })
        }
    }
}

/// List the sheets of a workbook
pub fn sheet_names(path: &Path) -> Result<Vec<String>, ReportError> {
    ensure_exists(path)?;
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names())
}

fn ensure_exists(path: &Path) -> Result<(), ReportError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReportError::SourceNotFound(path.to_path_buf()))
    }
}

/// Split raw rows into metadata, header and data rows
pub fn build_table(
    sheet_name: &str,
    mut rows: Vec<Vec<CellValue>>,
    header_row: usize,
) -> Result<SalesTable, ReportError> {
    if rows.len() <= header_row {
        return Err(ReportError::EmptySheet(sheet_name.to_string()));
    }

    for (i, meta) in rows.iter().take(header_row).enumerate() {
        let text: Vec<String> = meta.iter().filter_map(CellValue::as_text).collect();
        debug!(sheet = %sheet_name, row = i + 1, meta = %text.join(" | "), "metadata row");
    }

    let data = rows.split_off(header_row + 1);
    let header_cells = rows.pop().unwrap_or_default();
    let headers = dedupe_headers(
        header_cells
            .iter()
            .map(|c| c.as_text().map(|t| t.trim().to_string()).unwrap_or_default())
            .collect(),
    );

    let width = headers.len();
    let rows = data
        .into_iter()
        .enumerate()
        .filter(|(_, cells)| !cells.iter().all(CellValue::is_empty))
        .map(|(i, mut cells)| {
            cells.resize(width.max(cells.len()), CellValue::Empty);
            TableRow {
                source_row: header_row + 2 + i,
                cells,
            }
        })
        .collect();

    Ok(SalesTable {
        sheet_name: sheet_name.to_string(),
        headers,
        rows,
    })
}

/// Make repeated header names unique as `name.1`, `name.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|h| {
            if h.is_empty() {
                return h;
            }
            let count = seen.entry(h.clone()).or_insert(0);
            let name = if *count == 0 {
                h.clone()
            } else {
                format!("{h}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

/// Expand a calamine range to physical rows starting at A1
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }
    rows
}

/// Convert a calamine cell into a backend-independent value
pub fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Other(format!("{dt}")),
        Data::DateTimeIso(s) => CellValue::Other(s.clone()),
        Data::DurationIso(s) => CellValue::Other(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}
