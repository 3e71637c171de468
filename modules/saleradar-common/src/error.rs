use thiserror::Error;

/// Workspace-wide error kind. Component-level functions mostly propagate
/// `anyhow::Result` with `.context(...)`; this enum exists for the few
/// boundaries where a caller needs to match on kind (adapter failure
/// codes, CLI exit paths).
#[derive(Error, Debug)]
pub enum SaleradarError {
    #[error("database error: {0}")]
    Database(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("policy denied fetch: {0}")]
    PolicyDenied(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("run already in progress for this run_type and window")]
    RunLockConflict,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SaleradarError {
    /// Wrap a database driver error without requiring this crate to depend
    /// on the driver crate.
    pub fn database(e: impl std::fmt::Display) -> Self {
        SaleradarError::Database(e.to_string())
    }
}
