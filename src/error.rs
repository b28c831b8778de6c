//! Application error types

use std::path::PathBuf;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more expected business-day files are absent from the input directory
    #[error("missing required files: {}", .0.join(", "))]
    MissingFiles(Vec<String>),

    #[error("invalid date in file name {file}: {source}")]
    FilenameDate {
        file: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid header: {0}")]
    Header(String),

    #[error("line {line}: {message}")]
    Row { line: u64, message: String },

    /// A sibling worker failed or the caller gave up
    #[error("ingestion cancelled")]
    Cancelled,

    /// Per-file failure, carrying the path of the file being processed
    #[error("file {}: {source}", .file.display())]
    File {
        file: PathBuf,
        #[source]
        source: Box<AppError>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap an error with the path of the file it occurred in
    pub fn in_file(self, file: impl Into<PathBuf>) -> Self {
        AppError::File {
            file: file.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through file context
    pub fn root(&self) -> &AppError {
        match self {
            AppError::File { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), AppError::Cancelled)
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self.root() {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Pool(_) => "POOL_ERROR",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::MissingFiles(_) => "MISSING_FILES",
            AppError::FilenameDate { .. } => "FILENAME_DATE_ERROR",
            AppError::Header(_) => "HEADER_ERROR",
            AppError::Row { .. } => "ROW_ERROR",
            AppError::Cancelled => "CANCELLED",
            AppError::File { .. } => "FILE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_lists_every_name() {
        let err = AppError::MissingFiles(vec![
            "02-01-2024_NEGOCIOSAVISTA.txt".to_string(),
            "03-01-2024_NEGOCIOSAVISTA.txt".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "missing required files: 02-01-2024_NEGOCIOSAVISTA.txt, 03-01-2024_NEGOCIOSAVISTA.txt"
        );
    }

    #[test]
    fn test_file_context_keeps_root() {
        let err = AppError::Row {
            line: 5,
            message: "invalid TradePrice \"abc\"".to_string(),
        }
        .in_file("/in/05-01-2024_NEGOCIOSAVISTA.txt");

        assert_eq!(
            err.to_string(),
            "file /in/05-01-2024_NEGOCIOSAVISTA.txt: line 5: invalid TradePrice \"abc\""
        );
        assert!(matches!(err.root(), AppError::Row { line: 5, .. }));
        assert_eq!(err.code(), "ROW_ERROR");
    }

    #[test]
    fn test_codes_look_through_context() {
        let cases = [
            (AppError::MissingFiles(vec![]), "MISSING_FILES"),
            (AppError::Header("x".into()), "HEADER_ERROR"),
            (AppError::Cancelled, "CANCELLED"),
            (AppError::Validation("x".into()), "VALIDATION_ERROR"),
            (AppError::Config("x".into()), "CONFIG_ERROR"),
            (AppError::Internal("x".into()), "INTERNAL_ERROR"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.in_file("x.txt").code(), code);
        }
    }

    #[test]
    fn test_cancelled_seen_through_context() {
        let err = AppError::Cancelled.in_file("x.txt");
        assert!(err.is_cancelled());
        assert!(!AppError::Header("x".into()).is_cancelled());
    }
}
