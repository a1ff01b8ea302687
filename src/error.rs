use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DataError – everything a data source can fail with
// ---------------------------------------------------------------------------

/// Failures raised while loading, summarising or exporting columns.
///
/// Every variant carries the path of the file involved so the message alone
/// is enough to locate the problem.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Source file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Shape mismatch in {}: expected {expected}, found {found}", path.display())]
    Shape {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Column '{column}' missing from {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("No columns loaded from {} (call load() first)", path.display())]
    NotLoaded { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Weighted mean of {} is undefined: sum of 'y' is zero", path.display())]
    DivisionByZero { path: PathBuf },

    #[error("Delimiter {delimiter:?} is not a usable single ASCII character")]
    InvalidDelimiter { delimiter: char },

    #[error("Unsupported file extension for {}", path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl DataError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DataError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(
        path: impl Into<PathBuf>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        DataError::Shape {
            path: path.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Map an I/O error raised while reading `path`, singling out a missing file.
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            DataError::NotFound { path }
        } else {
            DataError::Read { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
