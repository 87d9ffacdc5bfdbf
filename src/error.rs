use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The line matched the purchase grammar but a numeric group did not parse.
    #[error("{}:{line}: malformed {field} value '{value}'", path.display())]
    MalformedNumeric {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: expected 'key=value', found '{text}'", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("configuration is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("configuration key '{key}' has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to build workbook for {}: {source}", path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("failed to write CSV rows for {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to publish {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}
