//! Pipeline orchestration
//!
//! This module provides the public API for salesboard.
//! It runs the full pipeline from a spreadsheet file to the dashboard JSON.

use crate::aggregator::StoreAggregator;
use crate::config::ReportConfig;
use crate::encoder::ReportEncoder;
use crate::error::ReportError;
use crate::loader::{Loader, SheetSelection};
use crate::normalizer::{CellParseFailure, RowNormalizer};
use crate::types::{SalesReport, SalesTable};
use std::path::Path;
use tracing::info;

/// Convert a spreadsheet to dashboard JSON with the default configuration.
///
/// # Arguments
/// * `source` - Path to the sales workbook (first sheet is used)
///
/// # Returns
/// Pretty-printed JSON array, store summary first
///
/// # Example
/// ```ignore
/// let json = spreadsheet_to_json(Path::new("sales.xlsx"))?;
/// ```
pub fn spreadsheet_to_json(source: &Path) -> Result<String, ReportError> {
    let processor = ReportProcessor::default();
    let outcome = processor.process_file(source, &SheetSelection::First)?;
    processor.encoder.encode_to_json(&outcome.report)
}

/// Report plus what was dropped or defaulted along the way
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub sheet_name: String,
    pub report: SalesReport,
    pub skipped_rows: Vec<usize>,
    pub cell_failures: Vec<CellParseFailure>,
}

/// Processor holding the configuration for repeated conversions
pub struct ReportProcessor {
    config: ReportConfig,
    encoder: ReportEncoder,
}

impl Default for ReportProcessor {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

impl ReportProcessor {
    /// Create a processor with the given configuration
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            encoder: ReportEncoder::new(),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn loader(&self) -> Loader {
        Loader::new(&self.config)
    }

    /// Load one sheet and build the report
    pub fn process_file(
        &self,
        source: &Path,
        selection: &SheetSelection,
    ) -> Result<ReportOutcome, ReportError> {
        let table = self.loader().load(source, selection)?;
        self.process_table(&table)
    }

    /// Read every sheet, then build the report from the selected one
    pub fn process_workbook(
        &self,
        source: &Path,
        selection: &SheetSelection,
    ) -> Result<ReportOutcome, ReportError> {
        let loader = self.loader();
        let workbook = loader.load_all(source)?;
        info!(sheets = ?workbook.sheet_names(), "multi-sheet mode");
        let table = workbook.select(selection)?;
        loader.validate(table)?;
        self.process_table(table)
    }

    /// Run normalization, aggregation and assembly over a loaded table
    pub fn process_table(&self, table: &SalesTable) -> Result<ReportOutcome, ReportError> {
        // Stage 2: Normalize rows into seller records
        let rows = RowNormalizer::new(&self.config).normalize(table)?;

        // Stage 3: Aggregate the store summary
        let store = StoreAggregator::new(&self.config).aggregate(&rows.records, &rows.metric_columns);

        // Stage 4: Assemble, store summary first
        let report = self.encoder.assemble(store, rows.records);

        info!(
            sheet = %table.sheet_name,
            sellers = report.sellers().len(),
            skipped = rows.skipped_rows.len(),
            unreadable_cells = rows.cell_failures.len(),
            "report built"
        );

        Ok(ReportOutcome {
            sheet_name: table.sheet_name.clone(),
            report,
            skipped_rows: rows.skipped_rows,
            cell_failures: rows.cell_failures,
        })
    }

    /// Encode a report to JSON text
    pub fn encode(&self, report: &SalesReport) -> Result<String, ReportError> {
        self.encoder.encode_to_json(report)
    }

    /// Convert `source` and overwrite `output`.
    ///
    /// Nothing is written unless loading and encoding both succeed.
    pub fn convert(
        &self,
        source: &Path,
        output: &Path,
        selection: &SheetSelection,
        all_sheets: bool,
    ) -> Result<ReportOutcome, ReportError> {
        let outcome = if all_sheets {
            self.process_workbook(source, selection)?
        } else {
            self.process_file(source, selection)?
        };
        let json = self.encode(&outcome.report)?;
        self.encoder.write(output, &json)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, MetricValue};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample_rows() -> Vec<Vec<CellValue>> {
        vec![
            vec![text("Продажі магазину")],
            vec![text("Жовтень")],
            vec![text("ПК"), text("Посада"), text("ТО"), text("Шт."), text("% Доля ACC"), text("ACC")],
            vec![
                text("Іван Петров"),
                text("продавець"),
                CellValue::Number(1500.5),
                CellValue::Number(3.0),
                CellValue::Number(0.42),
                CellValue::Number(630.21),
            ],
            vec![
                CellValue::Empty,
                text("продавець"),
                CellValue::Number(10.0),
            ],
            vec![
                text("Олена Коваль"),
                CellValue::Empty,
                text("2 499,50"),
                CellValue::Number(5.0),
                text("20%"),
                CellValue::Number(369.79),
            ],
        ]
    }

    fn sample_table(processor: &ReportProcessor) -> SalesTable {
        processor
            .loader()
            .table_from_rows("Sheet1", sample_rows())
            .unwrap()
    }

    #[test]
    fn test_process_table() {
        let processor = ReportProcessor::default();
        let outcome = processor.process_table(&sample_table(&processor)).unwrap();
        let report = &outcome.report;

        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[0].id, 0);
        assert_eq!(report.records[1].name, "Іван Петров");
        assert_eq!(report.records[2].name, "Олена Коваль");
        assert_eq!(outcome.skipped_rows, vec![5]);

        let store = report.store_total().unwrap();
        assert_eq!(store.metrics.get("Шт.").unwrap().value, MetricValue::Int(8));
        assert_eq!(store.metrics.get("ТО").unwrap().value, MetricValue::Float(4000.0));
        // 1000 ACC over 4000 turnover
        assert_eq!(store.metrics.get("% Доля ACC").unwrap().value, MetricValue::Float(25.0));

        let olena = &report.records[2];
        assert_eq!(olena.metrics.get("% Доля ACC").unwrap().value, MetricValue::Float(20.0));
        assert_eq!(olena.position, processor.config().fallback_position);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let processor = ReportProcessor::default();
        let table = sample_table(&processor);

        let first = processor
            .encode(&processor.process_table(&table).unwrap().report)
            .unwrap();
        let second = processor
            .encode(&processor.process_table(&table).unwrap().report)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_row_order_does_not_move_store_record() {
        let processor = ReportProcessor::default();
        let mut rows = sample_rows();
        rows.swap(3, 5);
        let table = processor.loader().table_from_rows("Sheet1", rows).unwrap();

        let outcome = processor.process_table(&table).unwrap();
        assert_eq!(outcome.report.records[0].id, 0);
        assert_eq!(outcome.report.records[1].name, "Олена Коваль");
    }

    #[test]
    fn test_missing_source() {
        let result = spreadsheet_to_json(Path::new("/no/such/sales.xlsx"));
        assert!(matches!(result, Err(ReportError::SourceNotFound(_))));
    }
}
