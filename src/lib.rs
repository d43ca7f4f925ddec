//! Salesboard - spreadsheet to dashboard feed converter
//!
//! Salesboard turns a store's periodic sales-tracking workbook into the JSON
//! feed of a static dashboard through a deterministic pipeline: sheet loading →
//! row normalization → store aggregation → JSON encoding.
//!
//! ## Modules
//!
//! - **Conversion**: `loader`, `normalizer`, `aggregator`, `encoder`, driven by `pipeline`
//! - **Publishing**: `publish` commits and pushes the generated feed

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod publish;
pub mod types;

pub use config::ReportConfig;
pub use error::ReportError;
pub use loader::SheetSelection;
pub use pipeline::{spreadsheet_to_json, ReportOutcome, ReportProcessor};
pub use types::{Measurement, MetricValue, SalesRecord, SalesReport};

/// Salesboard version
pub const SALESBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default source workbook name
pub const DEFAULT_SOURCE: &str = "sales.xlsx";

/// Default feed file name
pub const DEFAULT_OUTPUT: &str = "sales-data.json";

/// Dashboard page published next to the feed
pub const DEFAULT_PAGE: &str = "index.html";
