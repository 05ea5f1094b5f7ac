use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to read workbook {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write workbook {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workbook {path} has no worksheet")]
    MissingSheet { path: PathBuf },

    #[error("no date column in header row of {path}")]
    MissingDateColumn { path: PathBuf },

    #[error("workbook {path} is still unreadable after recreating it: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("report exceeds the worksheet row limit")]
    RowLimit,
}
