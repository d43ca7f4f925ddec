//! Error types for salesboard

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a conversion or publish run
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Source spreadsheet not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error(
        "Required columns missing: {}. Columns found in sheet: {}",
        .missing.join(", "),
        .discovered.join(", ")
    )]
    SchemaMismatch {
        missing: Vec<String>,
        discovered: Vec<String>,
    },

    #[error("Sheet not found: {requested} (available: {})", .available.join(", "))]
    SheetNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("Sheet '{0}' has no header row")]
    EmptySheet(String),

    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Publish step '{step}' failed: {message}")]
    Publish { step: String, message: String },
}

impl From<calamine::Error> for ReportError {
    fn from(e: calamine::Error) -> Self {
        ReportError::Workbook(e.to_string())
    }
}
