use std::path::PathBuf;

/// Errors produced while building, loading, or querying the category store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A category name was used that the store was never configured with.
    /// This is a configuration error, not a runtime condition.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("failed to read source list {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write compiled table {path}: {source}")]
    WriteTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open compiled table {path}: {source}")]
    OpenTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid expression at {path}:{line}: {source}")]
    Expression {
        path: PathBuf,
        line: usize,
        #[source]
        source: regex::Error,
    },
}
