use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataInsightError {
    #[error("Column '{0}' does not exist in the table")]
    ColumnNotFound(String),

    #[error("Metric is undefined: {0}")]
    UndefinedMetric(String),

    #[error("Non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumericValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Permission denied while reading {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<calamine::Error> for DataInsightError {
    fn from(err: calamine::Error) -> Self {
        DataInsightError::Spreadsheet(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for DataInsightError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        DataInsightError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataInsightError>;
