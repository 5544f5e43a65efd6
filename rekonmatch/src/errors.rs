/// Error types for rekonmatch.
///
/// Only two conditions are reported by the matching engine itself:
/// an invalid query (nothing to search for) and missing target data.
/// Both are recoverable; the caller is expected to prompt and retry.
/// Everything else here comes from the surrounding plumbing (decoding,
/// persistence, configuration).
///
/// A link lookup that does not apply (a marker row, no key columns) is
/// not an error and is reported as `None` by the link resolver instead.
///
/// ```rust,ignore
/// match engine::run_query(&spec, Some(&dataset), &options) {
///     Ok(output) => // Render output,
///     Err(QueryError::InvalidQuery(reason)) => // Ask for search terms,
///     Err(QueryError::NoTargetData(side)) => // Ask for a dataset,
///     Err(e) => // Everything else
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while loading data or running a query
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Target data not found: {0}")]
    NoTargetData(String),
    #[error("Query cancelled")]
    Cancelled,
    #[error("Dataset is empty or has no header row: {0}")]
    EmptyDataset(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Workspace file is corrupt: {path}: {source}")]
    CorruptWorkspace {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),
}

impl QueryError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery(reason.into())
    }

    pub fn no_target_data(what: impl Into<String>) -> Self {
        Self::NoTargetData(what.into())
    }

    pub fn empty_dataset(source: impl Into<String>) -> Self {
        Self::EmptyDataset(source.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn corrupt_workspace(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::CorruptWorkspace {
            path: path.into(),
            source,
        }
    }

    /// True for the conditions a caller can fix by changing its input
    /// (entering terms, loading a dataset).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery(_) | Self::NoTargetData(_) | Self::Cancelled
        )
    }
}

impl From<config::ConfigError> for QueryError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
