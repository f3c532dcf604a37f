use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for consolidation operations.
pub type ConsolidateResult<T> = Result<T, ConsolidateError>;

/// Error type returned by analysis, ingestion, consolidation, and output functions.
///
/// This is a single error enum shared across delimited-text and workbook sources as well as
/// all output formats.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook reading error.
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// Delimited-text reading/writing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook output error.
    #[error("xlsx output error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Columnar-binary output error.
    #[error("parquet output error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// A source item could not be interpreted (unsupported extension, missing sheet, etc.).
    #[error("unsupported source '{path}': {message}", path = path.display())]
    UnsupportedSource { path: PathBuf, message: String },

    /// The supplied configuration is unusable (bad delimiter, empty source list, etc.).
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Every configured item was skipped or empty; there is nothing to consolidate.
    #[error("no data: {message}")]
    NoData { message: String },
}
